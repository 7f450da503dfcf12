use serde::{Deserialize, Serialize};

/// A stored paste. Immutable once created; the view counter lives beside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasteRecord {
    pub id: String,
    pub content: String,
    /// Milliseconds since the epoch.
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub max_views: Option<u64>,
}

/// Parameters for a new paste, already validated by the caller.
#[derive(Debug, Clone)]
pub struct NewPaste {
    pub content: String,
    pub ttl_seconds: Option<u64>,
    pub max_views: Option<u64>,
}

/// The result of a successful read: the record and the view count including this read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedPaste {
    pub record: PasteRecord,
    pub views: u64,
}

impl PasteRecord {
    pub fn new(id: String, paste: NewPaste, now: i64) -> Self {
        let expires_at = paste.ttl_seconds.map(|ttl| {
            i64::try_from(ttl)
                .ok()
                .and_then(|ttl| ttl.checked_mul(1000))
                .and_then(|ttl_ms| now.checked_add(ttl_ms))
                .unwrap_or(i64::MAX)
        });

        PasteRecord {
            id,
            content: paste.content,
            created_at: now,
            expires_at,
            max_views: paste.max_views,
        }
    }

    /// Whether `now` lies strictly past the expiry time.
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(expires_at) if now > expires_at)
    }

    /// Check against a counter value read before incrementing.
    pub fn has_views_left(&self, views: u64) -> bool {
        self.max_views.map_or(true, |max| views < max)
    }

    /// Check against a counter value read after incrementing.
    pub fn allows_view(&self, views: u64) -> bool {
        self.max_views.map_or(true, |max| views <= max)
    }
}

impl ConsumedPaste {
    pub fn remaining_views(&self) -> Option<u64> {
        self.record
            .max_views
            .map(|max| max.saturating_sub(self.views))
    }
}
