use crate::models::{Entry, EntryUpdate};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

const ENTRY_COLUMNS: &str =
    "id, name, kind, parent_id, mime_type, size_bytes, created_at, blob_ref, is_starred, is_trashed";

// Folders first, then by name. created_at and id only break ties.
const LISTING_ORDER: &str =
    "ORDER BY CASE kind WHEN 'folder' THEN 0 ELSE 1 END, name ASC, created_at ASC, id ASC";

/// Result of one `Delete` step on an existing entry.
#[derive(Debug, Clone)]
pub enum Deletion {
    Trashed(Entry),
    /// The entry and every descendant that was removed with it.
    Deleted(Vec<Entry>),
}

#[derive(Clone)]
pub struct EntryRepository {
    pool: SqlitePool,
}

impl EntryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_entry(&self, entry: &Entry) -> sqlx::Result<Entry> {
        let sql = format!(
            "INSERT INTO files ({ENTRY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) RETURNING {ENTRY_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Entry>(&sql)
            .bind(entry.id)
            .bind(&entry.name)
            .bind(entry.kind)
            .bind(entry.parent_id)
            .bind(&entry.mime_type)
            .bind(entry.size_bytes)
            .bind(entry.created_at)
            .bind(&entry.blob_ref)
            .bind(entry.is_starred)
            .bind(entry.is_trashed)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    pub async fn get_entry(&self, id: Uuid) -> sqlx::Result<Option<Entry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM files WHERE id = ?1");
        sqlx::query_as::<_, Entry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list_children(&self, parent_id: Option<Uuid>) -> sqlx::Result<Vec<Entry>> {
        debug!("Listing children of {:?}", parent_id);
        let entries = match parent_id {
            Some(parent_id) => {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS} FROM files WHERE parent_id = ?1 AND is_trashed = 0 {LISTING_ORDER}"
                );
                sqlx::query_as::<_, Entry>(&sql)
                    .bind(parent_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS} FROM files WHERE parent_id IS NULL AND is_trashed = 0 {LISTING_ORDER}"
                );
                sqlx::query_as::<_, Entry>(&sql).fetch_all(&self.pool).await?
            }
        };

        Ok(entries)
    }

    /// Case-insensitive substring match over the whole tree, trash excluded.
    pub async fn search(&self, term: &str) -> sqlx::Result<Vec<Entry>> {
        debug!("Searching entries for {:?}", term);
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM files WHERE name LIKE ?1 ESCAPE '\\' AND is_trashed = 0 {LISTING_ORDER}"
        );
        sqlx::query_as::<_, Entry>(&sql)
            .bind(like_pattern(term))
            .fetch_all(&self.pool)
            .await
    }

    pub async fn list_starred(&self) -> sqlx::Result<Vec<Entry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM files WHERE is_starred = 1 AND is_trashed = 0 {LISTING_ORDER}"
        );
        sqlx::query_as::<_, Entry>(&sql).fetch_all(&self.pool).await
    }

    pub async fn list_trashed(&self) -> sqlx::Result<Vec<Entry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM files WHERE is_trashed = 1 {LISTING_ORDER}");
        sqlx::query_as::<_, Entry>(&sql).fetch_all(&self.pool).await
    }

    /// Newest first; no folder-first ordering.
    pub async fn list_recent(&self, limit: i64) -> sqlx::Result<Vec<Entry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM files WHERE is_trashed = 0 ORDER BY created_at DESC, id ASC LIMIT ?1"
        );
        sqlx::query_as::<_, Entry>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    /// Applies the present fields in a single statement. Returns `None` when
    /// the id does not exist.
    pub async fn update_entry(&self, id: Uuid, update: &EntryUpdate) -> sqlx::Result<Option<Entry>> {
        let sql = format!(
            "UPDATE files SET name = COALESCE(?2, name), is_starred = COALESCE(?3, is_starred), is_trashed = COALESCE(?4, is_trashed) \
             WHERE id = ?1 RETURNING {ENTRY_COLUMNS}"
        );
        sqlx::query_as::<_, Entry>(&sql)
            .bind(id)
            .bind(&update.name)
            .bind(update.is_starred)
            .bind(update.is_trashed)
            .fetch_optional(&self.pool)
            .await
    }

    /// Active entries move to the trash; trashed entries are removed together
    /// with all their descendants. `None` when the id does not exist.
    pub async fn trash_or_delete(&self, id: Uuid) -> sqlx::Result<Option<Deletion>> {
        let mut tx = self.pool.begin().await?;

        // Write first so the transaction holds the write lock from its first statement
        let trash_sql = format!(
            "UPDATE files SET is_trashed = 1 WHERE id = ?1 AND is_trashed = 0 RETURNING {ENTRY_COLUMNS}"
        );
        let trashed = sqlx::query_as::<_, Entry>(&trash_sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(entry) = trashed {
            tx.commit().await?;
            return Ok(Some(Deletion::Trashed(entry)));
        }

        let delete_sql = format!(
            "WITH RECURSIVE subtree(id) AS ( \
                 SELECT id FROM files WHERE id = ?1 AND is_trashed = 1 \
                 UNION \
                 SELECT f.id FROM files f JOIN subtree s ON f.parent_id = s.id \
             ) \
             DELETE FROM files WHERE id IN (SELECT id FROM subtree) RETURNING {ENTRY_COLUMNS}"
        );
        let removed = sqlx::query_as::<_, Entry>(&delete_sql)
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

        if removed.is_empty() {
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(Deletion::Deleted(removed)))
    }

    pub async fn total_file_size(&self) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COALESCE(SUM(size_bytes), 0) FROM files WHERE kind = 'file'")
            .fetch_one(&self.pool)
            .await
    }
}

fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
