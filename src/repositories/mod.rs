pub mod entry_repository;

pub use entry_repository::*;
