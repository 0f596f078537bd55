use anyhow::Result;
use chrono::Utc;
use drive_rs::models::{DeleteOutcome, EntryKind, EntryUpdate, ListFilter, ListMode};
use drive_rs::services::{BlobStorage, FileStore};
use drive_rs::test_utils::{create_test_database, create_test_store};
use drive_rs::StoreError;
use std::collections::HashSet;
use tempfile::TempDir;
use uuid::Uuid;

async fn setup() -> Result<(FileStore, TempDir)> {
    let temp_dir = TempDir::new()?;
    let store = create_test_store(&temp_dir.path().join("uploads")).await?;
    Ok((store, temp_dir))
}

fn names(entries: &[drive_rs::models::Entry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

#[tokio::test]
async fn test_ids_are_unique() -> Result<()> {
    let (store, _temp_dir) = setup().await?;

    let mut ids = HashSet::new();
    for i in 0..20 {
        let folder = store.create_folder(&format!("folder{}", i), None).await?;
        assert!(ids.insert(folder.id));
    }
    let file = store.upload_file("a.txt", None, b"abc", None).await?;
    assert!(ids.insert(file.id));

    Ok(())
}

#[tokio::test]
async fn test_root_listing_is_folders_first_then_by_name() -> Result<()> {
    let (store, _temp_dir) = setup().await?;

    store.upload_file("beta.txt", None, b"b", None).await?;
    store.create_folder("Zeta", None).await?;
    store.upload_file("alpha.txt", None, b"a", None).await?;
    let docs = store.create_folder("Docs", None).await?;
    store.create_folder("Nested", Some(docs.id)).await?;
    let trashed = store.create_folder("Old", None).await?;
    store.delete(trashed.id).await?;

    let root = store.list(ListMode::Browse(None)).await?;
    assert_eq!(names(&root), vec!["Docs", "Zeta", "alpha.txt", "beta.txt"]);
    assert!(root.iter().all(|e| e.parent_id.is_none() && !e.is_trashed));

    let children = store.list(ListMode::Browse(Some(docs.id))).await?;
    assert_eq!(names(&children), vec!["Nested"]);

    Ok(())
}

#[tokio::test]
async fn test_trashed_entries_only_show_in_trash() -> Result<()> {
    let (store, _temp_dir) = setup().await?;

    let file = store.upload_file("report.pdf", None, b"%PDF", None).await?;
    store
        .update(
            file.id,
            EntryUpdate {
                is_starred: Some(true),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(store.list(ListMode::Starred).await?.len(), 1);

    store
        .update(
            file.id,
            EntryUpdate {
                is_trashed: Some(true),
                ..Default::default()
            },
        )
        .await?;

    assert!(store.list(ListMode::Browse(None)).await?.is_empty());
    assert!(store.list(ListMode::Starred).await?.is_empty());
    assert!(store.list(ListMode::Recent).await?.is_empty());
    assert!(store.list(ListMode::Search("report".to_string())).await?.is_empty());

    let trash = store.list(ListMode::Trash).await?;
    assert_eq!(trash.len(), 1);
    assert_eq!(trash[0].id, file.id);

    Ok(())
}

#[tokio::test]
async fn test_star_toggle_round_trip() -> Result<()> {
    let (store, _temp_dir) = setup().await?;

    let folder = store.create_folder("Projects", None).await?;
    let original = store.get(folder.id).await?;

    let starred = store
        .update(
            folder.id,
            EntryUpdate {
                is_starred: Some(true),
                ..Default::default()
            },
        )
        .await?;
    assert!(starred.is_starred);
    assert_eq!(names(&store.list(ListMode::Starred).await?), vec!["Projects"]);

    let unstarred = store
        .update(
            folder.id,
            EntryUpdate {
                is_starred: Some(false),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(unstarred, original);
    assert!(store.list(ListMode::Starred).await?.is_empty());
    assert_eq!(store.list(ListMode::Browse(None)).await?, vec![original]);

    Ok(())
}

#[tokio::test]
async fn test_partial_update_and_rename() -> Result<()> {
    let (store, _temp_dir) = setup().await?;

    let folder = store.create_folder("Draft", None).await?;
    store
        .update(
            folder.id,
            EntryUpdate {
                is_starred: Some(true),
                ..Default::default()
            },
        )
        .await?;

    let renamed = store
        .update(
            folder.id,
            EntryUpdate {
                name: Some("  Final  ".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(renamed.name, "Final");
    assert!(renamed.is_starred, "untouched fields must be preserved");
    assert_eq!(renamed.kind, EntryKind::Folder);
    assert_eq!(renamed.created_at, folder.created_at);

    // Empty update is a successful no-op
    let unchanged = store.update(folder.id, EntryUpdate::default()).await?;
    assert_eq!(unchanged, renamed);

    let blank = store
        .update(
            folder.id,
            EntryUpdate {
                name: Some(" ".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(blank, Err(StoreError::Validation(_))));
    assert_eq!(store.get(folder.id).await?.name, "Final");

    let missing = Uuid::new_v4();
    let result = store
        .update(
            missing,
            EntryUpdate {
                is_starred: Some(true),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(StoreError::NotFound(id)) if id == missing));

    Ok(())
}

#[tokio::test]
async fn test_delete_state_machine() -> Result<()> {
    let (store, _temp_dir) = setup().await?;

    let file = store.upload_file("notes.txt", Some("text/plain"), b"hello", None).await?;
    let blob_path = store.blobs().path_for(file.blob_ref.as_deref().unwrap());
    assert!(blob_path.exists());

    assert_eq!(store.delete(file.id).await?, DeleteOutcome::Trashed);
    let trashed = store.get(file.id).await?;
    assert!(trashed.is_trashed);
    assert!(blob_path.exists(), "trashing keeps the content");

    assert_eq!(store.delete(file.id).await?, DeleteOutcome::Deleted);
    assert!(matches!(store.get(file.id).await, Err(StoreError::NotFound(_))));
    assert!(!blob_path.exists(), "permanent delete removes the blob");

    assert!(matches!(store.delete(file.id).await, Err(StoreError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_restore_from_trash() -> Result<()> {
    let (store, _temp_dir) = setup().await?;

    let folder = store.create_folder("Keep", None).await?;
    store.delete(folder.id).await?;
    assert!(store.list(ListMode::Browse(None)).await?.is_empty());

    let restored = store
        .update(
            folder.id,
            EntryUpdate {
                is_trashed: Some(false),
                ..Default::default()
            },
        )
        .await?;
    assert!(!restored.is_trashed);
    assert_eq!(names(&store.list(ListMode::Browse(None)).await?), vec!["Keep"]);

    // Back to Active, so the next delete trashes again
    assert_eq!(store.delete(folder.id).await?, DeleteOutcome::Trashed);

    Ok(())
}

#[tokio::test]
async fn test_permanent_delete_cascades_to_descendants() -> Result<()> {
    let (store, _temp_dir) = setup().await?;

    let top = store.create_folder("Top", None).await?;
    let inner = store.create_folder("Inner", Some(top.id)).await?;
    let leaf = store.upload_file("leaf.bin", None, &[0u8; 64], Some(inner.id)).await?;
    let sibling = store.create_folder("Sibling", None).await?;
    let leaf_blob = store.blobs().path_for(leaf.blob_ref.as_deref().unwrap());

    store.delete(top.id).await?;
    // Children are untouched by trashing
    assert!(!store.get(inner.id).await?.is_trashed);

    store.delete(top.id).await?;
    for id in [top.id, inner.id, leaf.id] {
        assert!(matches!(store.get(id).await, Err(StoreError::NotFound(_))));
    }
    assert!(!leaf_blob.exists());
    assert!(store.get(sibling.id).await.is_ok());
    assert_eq!(store.storage_usage().await?.used_bytes, 0);

    Ok(())
}

#[tokio::test]
async fn test_breadcrumbs() -> Result<()> {
    let (store, _temp_dir) = setup().await?;

    let root_file = store.upload_file("top.txt", None, b"x", None).await?;
    let chain = store.breadcrumbs(root_file.id).await?;
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].id, root_file.id);

    let a = store.create_folder("A", None).await?;
    let b = store.create_folder("B", Some(a.id)).await?;
    let c = store.create_folder("C", Some(b.id)).await?;
    let chain = store.breadcrumbs(c.id).await?;
    assert_eq!(names(&chain), vec!["A", "B", "C"]);

    assert!(store.breadcrumbs(Uuid::new_v4()).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_breadcrumbs_survive_broken_and_cyclic_links() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let pool = create_test_database().await?;
    let store = FileStore::new(pool.clone(), BlobStorage::new(temp_dir.path())?, 1024);

    // Simulate a corrupted table
    sqlx::query("PRAGMA foreign_keys = OFF").execute(&pool).await?;

    let orphan = Uuid::new_v4();
    let x = Uuid::new_v4();
    let y = Uuid::new_v4();
    for (id, name, parent) in [(orphan, "orphan", Uuid::new_v4()), (x, "x", y), (y, "y", x)] {
        sqlx::query("INSERT INTO files (id, name, kind, parent_id, created_at) VALUES (?1, ?2, 'folder', ?3, ?4)")
            .bind(id)
            .bind(name)
            .bind(parent)
            .bind(Utc::now())
            .execute(&pool)
            .await?;
    }

    let chain = store.breadcrumbs(orphan).await?;
    assert_eq!(names(&chain), vec!["orphan"]);

    let chain = store.breadcrumbs(x).await?;
    assert_eq!(names(&chain), vec!["y", "x"]);

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    Ok(())
}

#[tokio::test]
async fn test_storage_usage_counts_trashed_files_only() -> Result<()> {
    let (store, _temp_dir) = setup().await?;

    store.create_folder("Empty", None).await?;
    let kept = store.upload_file("kept.bin", None, &[1u8; 100], None).await?;
    let trashed = store.upload_file("trashed.bin", None, &[2u8; 50], None).await?;
    store.delete(trashed.id).await?;

    let usage = store.storage_usage().await?;
    assert_eq!(usage.used_bytes, 150);
    assert_eq!(usage.total_capacity_bytes, 15 * 1024 * 1024 * 1024);

    store.delete(trashed.id).await?;
    assert_eq!(store.storage_usage().await?.used_bytes, 100);

    store.delete(kept.id).await?;
    assert_eq!(store.storage_usage().await?.used_bytes, 100);

    Ok(())
}

#[tokio::test]
async fn test_nested_example_tree() -> Result<()> {
    let (store, _temp_dir) = setup().await?;

    let a = store.create_folder("A", None).await?;
    let b = store.create_folder("B", Some(a.id)).await?;
    let doc = store
        .create_file("doc.txt", "text/plain", 1024, "external-doc.txt", Some(b.id))
        .await?;

    assert_eq!(names(&store.breadcrumbs(doc.id).await?), vec!["A", "B", "doc.txt"]);
    assert_eq!(store.storage_usage().await?.used_bytes, 1024);
    assert_eq!(names(&store.list(ListMode::Browse(Some(a.id))).await?), vec!["B"]);
    assert_eq!(names(&store.list(ListMode::Browse(Some(b.id))).await?), vec!["doc.txt"]);

    Ok(())
}

#[tokio::test]
async fn test_search_is_global_and_literal() -> Result<()> {
    let (store, _temp_dir) = setup().await?;

    let folder = store.create_folder("Reports", None).await?;
    store.upload_file("Q1 report.pdf", None, b"1", Some(folder.id)).await?;
    store.upload_file("50%_done.txt", None, b"2", None).await?;
    store.upload_file("500 done.txt", None, b"3", None).await?;

    let mode = ListMode::resolve(Some(Uuid::new_v4()), Some(ListFilter::Trash), Some("REPORT"));
    let found = store.list(mode).await?;
    assert_eq!(names(&found), vec!["Reports", "Q1 report.pdf"]);

    let found = store.list(ListMode::Search("0%_".to_string())).await?;
    assert_eq!(names(&found), vec!["50%_done.txt"]);

    Ok(())
}

#[tokio::test]
async fn test_recent_is_capped_and_newest_first() -> Result<()> {
    let (store, _temp_dir) = setup().await?;

    for i in 0..55 {
        store.create_folder(&format!("f{:02}", i), None).await?;
    }

    let recent = store.list(ListMode::Recent).await?;
    assert_eq!(recent.len(), 50);
    assert!(recent.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    Ok(())
}

#[tokio::test]
async fn test_parent_must_be_an_existing_folder() -> Result<()> {
    let (store, _temp_dir) = setup().await?;

    let missing = Uuid::new_v4();
    let result = store.create_folder("Child", Some(missing)).await;
    assert!(matches!(result, Err(StoreError::NotFound(id)) if id == missing));

    let file = store.upload_file("plain.txt", None, b"x", None).await?;
    let result = store.create_folder("Child", Some(file.id)).await;
    assert!(matches!(result, Err(StoreError::Validation(_))));

    let result = store.upload_file("inner.txt", None, b"x", Some(file.id)).await;
    assert!(matches!(result, Err(StoreError::Validation(_))));

    let result = store.create_folder("   ", None).await;
    assert!(matches!(result, Err(StoreError::Validation(_))));

    // Nothing was created by the rejected calls
    assert_eq!(store.list(ListMode::Recent).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_upload_stores_blob_before_row() -> Result<()> {
    let (store, _temp_dir) = setup().await?;

    let file = store.upload_file("photo.png", None, b"\x89PNG", None).await?;
    assert_eq!(file.kind, EntryKind::File);
    assert_eq!(file.mime_type.as_deref(), Some("image/png"));
    assert_eq!(file.size_bytes, Some(4));

    let key = file.blob_ref.as_deref().unwrap();
    assert_eq!(key, format!("{}-photo.png", file.id));
    assert_eq!(store.blobs().read(key).await?, b"\x89PNG");

    Ok(())
}

#[tokio::test]
async fn test_upload_with_unwritable_blob_store_records_nothing() -> Result<()> {
    let (store, _temp_dir) = setup().await?;

    std::fs::remove_dir_all(store.blobs().root())?;

    let result = store.upload_file("a.txt", None, b"abc", None).await;
    assert!(matches!(result, Err(StoreError::StorageIo(_))));
    assert!(store.list(ListMode::Recent).await?.is_empty());
    assert!(store.list(ListMode::Browse(None)).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_failed_insert_removes_stored_blob() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let uploads_dir = temp_dir.path().join("uploads");
    let pool = create_test_database().await?;
    let store = FileStore::new(pool.clone(), BlobStorage::new(&uploads_dir)?, 1024);

    pool.close().await;

    let result = store.upload_file("a.txt", None, b"abc", None).await;
    assert!(matches!(result, Err(StoreError::Database(_))));
    assert_eq!(std::fs::read_dir(&uploads_dir)?.count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_updates_on_same_entry() -> Result<()> {
    let (store, _temp_dir) = setup().await?;
    let id = store.create_folder("Shared", None).await?.id;

    let rename = {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .update(
                    id,
                    EntryUpdate {
                        name: Some("Renamed".to_string()),
                        ..Default::default()
                    },
                )
                .await
        })
    };
    let trash = {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .update(
                    id,
                    EntryUpdate {
                        is_trashed: Some(true),
                        ..Default::default()
                    },
                )
                .await
        })
    };

    rename.await??;
    trash.await??;

    let entry = store.get(id).await?;
    assert_eq!(entry.name, "Renamed");
    assert!(entry.is_trashed);

    Ok(())
}
