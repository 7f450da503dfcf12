use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, warn};

use super::{PasteStore, Tables};
use crate::models::{ConsumedPaste, NewPaste};

/// Store keeping the whole dataset in one JSON document on disk.
///
/// Every mutation rewrites the full document. Mutations within the process are
/// serialized; several processes sharing one file are not coordinated.
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    initialized: OnceCell<()>,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore {
            inner: Arc::new(Inner {
                path: path.into(),
                initialized: OnceCell::new(),
                write_lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Create the document if it does not exist yet. Runs once; a failed
    /// attempt is retried by the next caller.
    async fn initialize(&self) -> crate::StoreResult<()> {
        self.inner
            .initialized
            .get_or_try_init(|| create_if_missing(&self.inner.path))
            .await?;
        Ok(())
    }

    async fn read_tables(&self) -> crate::StoreResult<Tables> {
        let data = fs::read(&self.inner.path).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    async fn write_tables(&self, tables: &Tables) -> crate::StoreResult<()> {
        write_document(&self.inner.path, tables).await
    }
}

impl PasteStore for FileStore {
    async fn create(&self, paste: NewPaste, now: i64) -> crate::StoreResult<String> {
        self.initialize().await?;
        let _guard = self.inner.write_lock.lock().await;

        let size = paste.content.len();
        let mut tables = self.read_tables().await?;
        let record = tables.insert(paste, now);
        self.write_tables(&tables).await?;

        info!("new paste: id='{id}', size={size}", id = record.id);

        Ok(record.id)
    }

    async fn read_and_consume(
        &self,
        id: &str,
        now: i64,
    ) -> crate::StoreResult<Option<ConsumedPaste>> {
        self.initialize().await?;
        let _guard = self.inner.write_lock.lock().await;

        let mut tables = self.read_tables().await?;
        let Some(consumed) = tables.consume(id, now) else {
            return Ok(None);
        };
        self.write_tables(&tables).await?;

        Ok(Some(consumed))
    }

    async fn is_ready(&self) -> bool {
        match self.initialize().await {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    "file store at '{}' is not ready: {error:?}",
                    self.path().display()
                );
                false
            }
        }
    }
}

async fn create_if_missing(path: &Path) -> crate::StoreResult<()> {
    match fs::metadata(path).await {
        Ok(_) => return Ok(()),
        Err(error) if error.kind() == ErrorKind::NotFound => {}
        Err(error) => return Err(error.into()),
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    info!("creating paste file at '{}'", path.display());
    write_document(path, &Tables::default()).await
}

/// Write to a sibling file and rename over the target, so readers never see a
/// partially written document.
async fn write_document(path: &Path, tables: &Tables) -> crate::StoreResult<()> {
    let data = serde_json::to_vec_pretty(tables)?;

    let mut tmp_name = OsString::from(path.as_os_str());
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, data).await?;
    fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::error::StoreError;
    use crate::storage::contract;

    fn store_in(dir: &TempDir) -> FileStore {
        FileStore::new(dir.path().join("pastes.json"))
    }

    #[tokio::test]
    async fn test_contract() {
        let dir = TempDir::new().unwrap();
        contract::run_all(&store_in(&dir)).await;
    }

    #[tokio::test]
    async fn test_ready_creates_empty_document() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("pastes.json"));

        assert!(store.is_ready().await);

        let data = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&data).unwrap();
        assert_eq!(value, serde_json::json!({ "pastes": {}, "views": {} }));
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let id = store_in(&dir)
            .create(contract::paste("durable", None, Some(2)), 0)
            .await
            .unwrap();

        let first = store_in(&dir).read_and_consume(&id, 0).await.unwrap();
        assert_eq!(first.unwrap().views, 1);

        let reopened = store_in(&dir);
        let second = reopened.read_and_consume(&id, 0).await.unwrap().unwrap();
        assert_eq!(second.record.content, "durable");
        assert_eq!(second.views, 2);
        assert!(reopened.read_and_consume(&id, 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_document_layout() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let id = store
            .create(contract::paste("hello", Some(60), None), 1000)
            .await
            .unwrap();

        let data = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&data).unwrap();
        assert_eq!(
            value["pastes"][&id],
            serde_json::json!({
                "id": id.clone(),
                "content": "hello",
                "created_at": 1000,
                "expires_at": 61000,
                "max_views": null,
            })
        );
        assert_eq!(value["views"][&id], 0);
    }

    #[tokio::test]
    async fn test_existing_document_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pastes.json");
        std::fs::write(
            &path,
            r#"{
                "pastes": {
                    "abc": { "id": "abc", "content": "old", "created_at": 0, "expires_at": null, "max_views": null }
                },
                "views": { "abc": 7 }
            }"#,
        )
        .unwrap();

        let store = FileStore::new(&path);
        let consumed = store.read_and_consume("abc", 0).await.unwrap().unwrap();
        assert_eq!(consumed.record.content, "old");
        assert_eq!(consumed.views, 8);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pastes.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        let result = store.create(contract::paste("a", None, None), 0).await;
        assert!(matches!(result, Err(StoreError::Malformed { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not json");
    }

    #[tokio::test]
    async fn test_unwritable_location_is_not_ready() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();

        let store = FileStore::new(blocker.join("pastes.json"));
        assert!(!store.is_ready().await);

        let result = store.read_and_consume("abc", 0).await;
        assert!(matches!(result, Err(StoreError::IO { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_reads_across_threads() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let id = store
            .create(contract::paste("shared", None, Some(2)), 0)
            .await
            .unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                let id = id.clone();
                tokio::spawn(async move { store.read_and_consume(&id, 0).await.unwrap() })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                successes += 1;
            }
        }
        assert_eq!(successes, 2);
    }
}
