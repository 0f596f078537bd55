use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Recent mode returns at most this many entries.
pub const RECENT_LIMIT: i64 = 50;

/// One row of the `files` table: a file or a folder.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, FromRow)]
pub struct Entry {
    pub id: Uuid,
    pub name: String,
    pub kind: EntryKind,
    pub parent_id: Option<Uuid>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub blob_ref: Option<String>,
    pub is_starred: bool,
    pub is_trashed: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

impl Entry {
    pub fn new_folder(name: String, parent_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            kind: EntryKind::Folder,
            parent_id,
            mime_type: None,
            size_bytes: None,
            created_at: Utc::now(),
            blob_ref: None,
            is_starred: false,
            is_trashed: false,
        }
    }

    /// A file entry whose blob key is derived from its own id, so the caller
    /// can write the blob before the row exists.
    pub fn new_file(
        id: Uuid,
        name: String,
        mime_type: String,
        size_bytes: i64,
        blob_ref: String,
        parent_id: Option<Uuid>,
    ) -> Self {
        Self {
            id,
            name,
            kind: EntryKind::File,
            parent_id,
            mime_type: Some(mime_type),
            size_bytes: Some(size_bytes),
            created_at: Utc::now(),
            blob_ref: Some(blob_ref),
            is_starred: false,
            is_trashed: false,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListFilter {
    Starred,
    Trash,
    Recent,
}

impl FromStr for ListFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "starred" => Ok(ListFilter::Starred),
            "trash" => Ok(ListFilter::Trash),
            "recent" => Ok(ListFilter::Recent),
            other => Err(format!("Unknown filter: {}", other)),
        }
    }
}

/// The single listing mode a `List` call resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListMode {
    Search(String),
    Starred,
    Trash,
    Recent,
    Browse(Option<Uuid>),
}

impl ListMode {
    /// A non-empty search term wins over everything, then the filter, then
    /// browsing by parent.
    pub fn resolve(parent_id: Option<Uuid>, filter: Option<ListFilter>, search: Option<&str>) -> Self {
        match (search.filter(|term| !term.is_empty()), filter) {
            (Some(term), _) => ListMode::Search(term.to_string()),
            (None, Some(ListFilter::Starred)) => ListMode::Starred,
            (None, Some(ListFilter::Trash)) => ListMode::Trash,
            (None, Some(ListFilter::Recent)) => ListMode::Recent,
            (None, None) => ListMode::Browse(parent_id),
        }
    }
}

/// Partial update: `None` leaves the column untouched.
#[derive(Debug, Serialize, Deserialize, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntryUpdate {
    pub name: Option<String>,
    pub is_starred: Option<bool>,
    pub is_trashed: Option<bool>,
}

impl EntryUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.is_starred.is_none() && self.is_trashed.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeleteOutcome {
    Trashed,
    Deleted,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct StorageUsage {
    pub used_bytes: u64,
    pub total_capacity_bytes: u64,
}
