use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;

use super::{PasteStore, Tables};
use crate::error::StoreError;
use crate::models::{ConsumedPaste, NewPaste};

/// Process-local store. Everything is lost when the process exits.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> crate::StoreResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl PasteStore for MemoryStore {
    async fn create(&self, paste: NewPaste, now: i64) -> crate::StoreResult<String> {
        let size = paste.content.len();
        let record = self.lock()?.insert(paste, now);

        info!("new paste: id='{id}', size={size}", id = record.id);

        Ok(record.id)
    }

    async fn read_and_consume(
        &self,
        id: &str,
        now: i64,
    ) -> crate::StoreResult<Option<ConsumedPaste>> {
        Ok(self.lock()?.consume(id, now))
    }

    async fn is_ready(&self) -> bool {
        self.lock().is_ok()
    }
}
