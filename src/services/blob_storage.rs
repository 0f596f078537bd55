use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Flat directory of uploaded file contents, one file per `File` entry.
#[derive(Debug, Clone)]
pub struct BlobStorage {
    root: PathBuf,
}

impl BlobStorage {
    /// Opens the blob directory, creating it if needed.
    pub fn new<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Key under which the blob of entry `id` uploaded as `original_name` is stored.
    pub fn blob_key(id: Uuid, original_name: &str) -> String {
        format!("{}-{}", id, sanitize_file_name(original_name))
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Writes and syncs the whole blob. A partially written blob is removed
    /// before the error is returned.
    pub async fn write(&self, key: &str, data: &[u8]) -> io::Result<()> {
        let path = self.path_for(key);
        debug!("Writing {} bytes to {}", data.len(), path.display());

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let result = async {
            file.write_all(data).await?;
            file.sync_all().await
        }
        .await;

        if result.is_err() {
            drop(file);
            if let Err(e) = fs::remove_file(&path).await {
                warn!("Failed to remove partially written blob {}: {}", path.display(), e);
            }
        }
        result
    }

    pub async fn read(&self, key: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path_for(key)).await
    }

    /// Removes a blob. A blob that is already gone counts as removed.
    pub async fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Blob {} was already missing", key);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Makes an uploaded name safe to use as a single path component.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.trim() {
        "" | "." | ".." => "file".to_string(),
        trimmed => trimmed.to_string(),
    }
}
