pub mod blob_storage;
pub mod file_store;

pub use blob_storage::*;
pub use file_store::*;
