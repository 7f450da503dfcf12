use std::collections::HashMap;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::config::{self, StorageKind};
use crate::ids::generate_id;
use crate::models::{ConsumedPaste, NewPaste, PasteRecord};

pub mod file;
pub mod memory;
pub mod remote;

pub trait PasteStore {
    /// Store a new paste with a zeroed view counter and return its identifier.
    async fn create(&self, paste: NewPaste, now: i64) -> crate::StoreResult<String>;

    /// Count a view of a paste, or return `None` if it is missing, expired or out of views.
    async fn read_and_consume(&self, id: &str, now: i64)
        -> crate::StoreResult<Option<ConsumedPaste>>;

    /// Whether the backing medium can currently serve requests.
    async fn is_ready(&self) -> bool;
}

#[derive(Clone)]
pub enum AnyStore {
    Memory(memory::MemoryStore),
    File(file::FileStore),
    Remote(remote::RemoteStore),
}

impl AnyStore {
    /// Build the store selected by configuration.
    pub fn from_config(config: &config::Storage) -> anyhow::Result<Self> {
        let store: AnyStore = match config.kind {
            StorageKind::Memory => memory::MemoryStore::new().into(),
            StorageKind::File => file::FileStore::new(config.file.path()?).into(),
            StorageKind::Remote => {
                let remote = config
                    .remote
                    .as_ref()
                    .ok_or_else(|| anyhow!("storage.remote must be set for remote storage"))?;
                let client = remote::RestKv::new(&remote.url, &remote.token)?;
                remote::RemoteStore::new(client).into()
            }
        };
        Ok(store)
    }

    pub fn kind(&self) -> StorageKind {
        match self {
            AnyStore::Memory(_) => StorageKind::Memory,
            AnyStore::File(_) => StorageKind::File,
            AnyStore::Remote(_) => StorageKind::Remote,
        }
    }
}

impl PasteStore for AnyStore {
    async fn create(&self, paste: NewPaste, now: i64) -> crate::StoreResult<String> {
        match self {
            AnyStore::Memory(memory) => memory.create(paste, now).await,
            AnyStore::File(file) => file.create(paste, now).await,
            AnyStore::Remote(remote) => remote.create(paste, now).await,
        }
    }

    async fn read_and_consume(
        &self,
        id: &str,
        now: i64,
    ) -> crate::StoreResult<Option<ConsumedPaste>> {
        match self {
            AnyStore::Memory(memory) => memory.read_and_consume(id, now).await,
            AnyStore::File(file) => file.read_and_consume(id, now).await,
            AnyStore::Remote(remote) => remote.read_and_consume(id, now).await,
        }
    }

    async fn is_ready(&self) -> bool {
        match self {
            AnyStore::Memory(memory) => memory.is_ready().await,
            AnyStore::File(file) => file.is_ready().await,
            AnyStore::Remote(remote) => remote.is_ready().await,
        }
    }
}

impl From<memory::MemoryStore> for AnyStore {
    fn from(value: memory::MemoryStore) -> Self {
        AnyStore::Memory(value)
    }
}

impl From<file::FileStore> for AnyStore {
    fn from(value: file::FileStore) -> Self {
        AnyStore::File(value)
    }
}

impl From<remote::RemoteStore> for AnyStore {
    fn from(value: remote::RemoteStore) -> Self {
        AnyStore::Remote(value)
    }
}

/// Pastes and their view counters, keyed by identifier.
///
/// This is the whole dataset for the memory store and the on-disk document
/// for the file store.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Tables {
    pub pastes: HashMap<String, PasteRecord>,
    pub views: HashMap<String, u64>,
}

impl Tables {
    /// Insert a new paste under a fresh identifier, with its counter at zero.
    pub fn insert(&mut self, paste: NewPaste, now: i64) -> PasteRecord {
        let mut id = generate_id();
        while self.pastes.contains_key(&id) {
            id = generate_id();
        }

        let record = PasteRecord::new(id.clone(), paste, now);
        self.pastes.insert(id.clone(), record.clone());
        self.views.insert(id, 0);
        record
    }

    /// Check availability and count a view. The counter is only touched when
    /// the read succeeds.
    pub fn consume(&mut self, id: &str, now: i64) -> Option<ConsumedPaste> {
        let record = self.pastes.get(id)?;
        if record.is_expired(now) {
            return None;
        }

        let views = self.views.entry(id.to_owned()).or_insert(0);
        if !record.has_views_left(*views) {
            return None;
        }
        *views += 1;

        Some(ConsumedPaste {
            record: record.clone(),
            views: *views,
        })
    }
}

/// Behavior every store must share, run against each backend from its own tests.
#[cfg(test)]
pub(crate) mod contract {
    use futures_util::future::join_all;

    use super::PasteStore;
    use crate::models::NewPaste;

    pub fn paste(content: &str, ttl_seconds: Option<u64>, max_views: Option<u64>) -> NewPaste {
        NewPaste {
            content: content.to_owned(),
            ttl_seconds,
            max_views,
        }
    }

    pub async fn missing_id_is_unavailable<S: PasteStore>(store: &S) {
        assert!(store.read_and_consume("nope", 0).await.unwrap().is_none());
    }

    pub async fn unlimited_paste_reads_forever<S: PasteStore>(store: &S) {
        let id = store.create(paste("forever", None, None), 0).await.unwrap();
        for i in 1..=25 {
            let consumed = store
                .read_and_consume(&id, i64::MAX)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(consumed.views, i);
            assert_eq!(consumed.remaining_views(), None);
        }
    }

    pub async fn ttl_boundary<S: PasteStore>(store: &S) {
        let id = store.create(paste("hello", Some(60), None), 1000).await.unwrap();

        let consumed = store.read_and_consume(&id, 60_999).await.unwrap().unwrap();
        assert_eq!(consumed.record.created_at, 1000);
        assert_eq!(consumed.record.expires_at, Some(61_000));

        assert!(store.read_and_consume(&id, 61_000).await.unwrap().is_some());
        assert!(store.read_and_consume(&id, 61_001).await.unwrap().is_none());
        assert!(store.read_and_consume(&id, 62_000).await.unwrap().is_none());
    }

    pub async fn first_read_after_expiry_fails<S: PasteStore>(store: &S) {
        let id = store.create(paste("late", Some(1), Some(5)), 0).await.unwrap();
        assert!(store.read_and_consume(&id, 1001).await.unwrap().is_none());
    }

    pub async fn view_budget<S: PasteStore>(store: &S) {
        let id = store.create(paste("x", None, Some(2)), 0).await.unwrap();

        let first = store.read_and_consume(&id, 0).await.unwrap().unwrap();
        assert_eq!(first.remaining_views(), Some(1));

        let second = store.read_and_consume(&id, 0).await.unwrap().unwrap();
        assert_eq!(second.remaining_views(), Some(0));

        for _ in 0..3 {
            assert!(store.read_and_consume(&id, 0).await.unwrap().is_none());
        }
    }

    pub async fn concurrent_reads_respect_budget<S: PasteStore>(store: &S) {
        for max_views in [1, 3] {
            let id = store
                .create(paste("race", None, Some(max_views)), 0)
                .await
                .unwrap();

            let results = join_all((0..8).map(|_| store.read_and_consume(&id, 0))).await;
            let successes = results
                .into_iter()
                .map(|result| result.unwrap())
                .filter(Option::is_some)
                .count();
            assert_eq!(successes as u64, max_views);
        }
    }

    pub async fn content_round_trips<S: PasteStore>(store: &S) {
        let content = "line one\n\tline two ✓ \"quoted\" {\"json\": true}\r\n";
        let id = store.create(paste(content, None, None), 0).await.unwrap();
        let consumed = store.read_and_consume(&id, 0).await.unwrap().unwrap();
        assert_eq!(consumed.record.content, content);
        assert_eq!(consumed.record.id, id);
    }

    pub async fn ids_are_unique<S: PasteStore>(store: &S) {
        let a = store.create(paste("same", None, None), 0).await.unwrap();
        let b = store.create(paste("same", None, None), 0).await.unwrap();
        assert_ne!(a, b);
    }

    pub async fn fresh_store_is_ready<S: PasteStore>(store: &S) {
        assert!(store.is_ready().await);
    }

    pub async fn run_all<S: PasteStore>(store: &S) {
        fresh_store_is_ready(store).await;
        missing_id_is_unavailable(store).await;
        unlimited_paste_reads_forever(store).await;
        ttl_boundary(store).await;
        first_read_after_expiry_fails(store).await;
        view_budget(store).await;
        concurrent_reads_respect_budget(store).await;
        content_round_trips(store).await;
        ids_are_unique(store).await;
    }
}
