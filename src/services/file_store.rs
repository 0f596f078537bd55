use crate::errors::{StoreError, StoreResult};
use crate::models::{DeleteOutcome, Entry, EntryUpdate, ListMode, StorageUsage, RECENT_LIMIT};
use crate::repositories::{Deletion, EntryRepository};
use crate::services::blob_storage::BlobStorage;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const MAX_NAME_LENGTH: usize = 255;

/// Upper bound on breadcrumb chain length; a longer chain means a corrupted tree.
pub const MAX_BREADCRUMB_DEPTH: usize = 256;

/// Owns the file/folder tree: creation, listing modes, the trash state
/// machine, breadcrumbs and usage accounting. Blob contents are written
/// through [`BlobStorage`] before the row that references them.
#[derive(Clone)]
pub struct FileStore {
    entries: EntryRepository,
    blobs: BlobStorage,
    capacity_bytes: u64,
}

impl FileStore {
    pub fn new(pool: SqlitePool, blobs: BlobStorage, capacity_bytes: u64) -> Self {
        Self {
            entries: EntryRepository::new(pool),
            blobs,
            capacity_bytes,
        }
    }

    pub fn blobs(&self) -> &BlobStorage {
        &self.blobs
    }

    pub async fn create_folder(&self, name: &str, parent_id: Option<Uuid>) -> StoreResult<Entry> {
        let name = normalize_name(name)?;
        self.check_parent(parent_id).await?;

        let folder = self.entries.create_entry(&Entry::new_folder(name, parent_id)).await?;
        info!("Created folder {} ({})", folder.name, folder.id);
        Ok(folder)
    }

    /// Records a file whose blob the caller has already stored under `blob_ref`.
    pub async fn create_file(
        &self,
        name: &str,
        mime_type: &str,
        size_bytes: i64,
        blob_ref: &str,
        parent_id: Option<Uuid>,
    ) -> StoreResult<Entry> {
        let name = normalize_name(name)?;
        if size_bytes < 0 {
            return Err(StoreError::Validation("File size cannot be negative".to_string()));
        }
        self.check_parent(parent_id).await?;

        let entry = Entry::new_file(
            Uuid::new_v4(),
            name,
            mime_type.to_string(),
            size_bytes,
            blob_ref.to_string(),
            parent_id,
        );
        let file = self.entries.create_entry(&entry).await?;
        info!("Recorded file {} ({}, {} bytes)", file.name, file.id, size_bytes);
        Ok(file)
    }

    /// Stores the blob, then inserts the row. If the insert fails the blob is
    /// removed again, so no reader ever sees a row without its content and no
    /// blob outlives a failed upload.
    pub async fn upload_file(
        &self,
        original_name: &str,
        mime_type: Option<&str>,
        data: &[u8],
        parent_id: Option<Uuid>,
    ) -> StoreResult<Entry> {
        let name = normalize_name(original_name)?;
        self.check_parent(parent_id).await?;

        let id = Uuid::new_v4();
        let blob_ref = BlobStorage::blob_key(id, &name);
        let mime_type = resolve_mime_type(&name, mime_type);

        self.blobs.write(&blob_ref, data).await?;

        let entry = Entry::new_file(id, name, mime_type, data.len() as i64, blob_ref.clone(), parent_id);
        match self.entries.create_entry(&entry).await {
            Ok(file) => {
                info!("Uploaded file {} ({}, {} bytes)", file.name, file.id, data.len());
                Ok(file)
            }
            Err(e) => {
                warn!("Insert failed for upload {}, removing blob: {}", id, e);
                if let Err(remove_err) = self.blobs.remove(&blob_ref).await {
                    warn!("Failed to remove orphaned blob {}: {}", blob_ref, remove_err);
                }
                Err(e.into())
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> StoreResult<Entry> {
        self.entries.get_entry(id).await?.ok_or(StoreError::NotFound(id))
    }

    pub async fn list(&self, mode: ListMode) -> StoreResult<Vec<Entry>> {
        debug!("Listing entries in mode {:?}", mode);
        let entries = match mode {
            ListMode::Search(term) => self.entries.search(&term).await?,
            ListMode::Starred => self.entries.list_starred().await?,
            ListMode::Trash => self.entries.list_trashed().await?,
            ListMode::Recent => self.entries.list_recent(RECENT_LIMIT).await?,
            ListMode::Browse(parent_id) => self.entries.list_children(parent_id).await?,
        };
        Ok(entries)
    }

    /// Applies the fields present in `update`. An empty update changes
    /// nothing and returns the entry as it is.
    pub async fn update(&self, id: Uuid, mut update: EntryUpdate) -> StoreResult<Entry> {
        if update.is_empty() {
            return self.get(id).await;
        }
        if let Some(name) = update.name.take() {
            update.name = Some(normalize_name(&name)?);
        }

        let entry = self
            .entries
            .update_entry(id, &update)
            .await?
            .ok_or(StoreError::NotFound(id))?;
        info!("Updated entry {}: {:?}", id, update);
        Ok(entry)
    }

    /// First call moves an active entry to the trash; a second call removes
    /// it for good, together with everything beneath it and their blobs.
    pub async fn delete(&self, id: Uuid) -> StoreResult<DeleteOutcome> {
        match self.entries.trash_or_delete(id).await? {
            None => Err(StoreError::NotFound(id)),
            Some(Deletion::Trashed(entry)) => {
                info!("Moved {} ({}) to trash", entry.name, entry.id);
                Ok(DeleteOutcome::Trashed)
            }
            Some(Deletion::Deleted(removed)) => {
                info!("Permanently deleted {} ({} entries)", id, removed.len());
                for blob_ref in removed.iter().filter_map(|entry| entry.blob_ref.as_deref()) {
                    if let Err(e) = self.blobs.remove(blob_ref).await {
                        warn!("Failed to remove blob {}: {}", blob_ref, e);
                    }
                }
                Ok(DeleteOutcome::Deleted)
            }
        }
    }

    /// Ancestor chain from the root down to `id` inclusive. A dangling parent
    /// reference ends the chain early; an unknown `id` yields an empty chain.
    pub async fn breadcrumbs(&self, id: Uuid) -> StoreResult<Vec<Entry>> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(id);

        while let Some(current_id) = current {
            if !visited.insert(current_id) || chain.len() >= MAX_BREADCRUMB_DEPTH {
                warn!("Breadcrumb walk from {} stopped at {}: cycle or excessive depth", id, current_id);
                break;
            }
            match self.entries.get_entry(current_id).await? {
                Some(entry) => {
                    current = entry.parent_id;
                    chain.push(entry);
                }
                None => {
                    if current_id != id {
                        warn!("Breadcrumb walk from {} hit missing parent {}", id, current_id);
                    }
                    break;
                }
            }
        }

        chain.reverse();
        Ok(chain)
    }

    /// Trashed files count; only permanent deletion frees space.
    pub async fn storage_usage(&self) -> StoreResult<StorageUsage> {
        let used = self.entries.total_file_size().await?;
        Ok(StorageUsage {
            used_bytes: used.max(0) as u64,
            total_capacity_bytes: self.capacity_bytes,
        })
    }

    async fn check_parent(&self, parent_id: Option<Uuid>) -> StoreResult<()> {
        let Some(parent_id) = parent_id else {
            return Ok(());
        };

        let parent = self
            .entries
            .get_entry(parent_id)
            .await?
            .ok_or(StoreError::NotFound(parent_id))?;

        if !parent.is_folder() {
            return Err(StoreError::Validation(format!(
                "Parent {} is not a folder",
                parent_id
            )));
        }
        Ok(())
    }
}

fn normalize_name(name: &str) -> StoreResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Validation("Name is required".to_string()));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(StoreError::Validation(format!(
            "Name exceeds {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}

fn resolve_mime_type(name: &str, declared: Option<&str>) -> String {
    match declared.map(str::trim) {
        Some(mime) if !mime.is_empty() => mime.to_string(),
        _ => mime_guess::from_path(name).first_or_octet_stream().to_string(),
    }
}
