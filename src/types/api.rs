use serde::{Deserialize, Serialize};

use crate::config::StorageKind;

#[derive(Debug, Deserialize)]
pub struct CreatePaste {
    pub content: String,
    pub ttl_seconds: Option<i64>,
    pub max_views: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreatedPaste {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct PasteView {
    pub content: String,
    pub remaining_views: Option<u64>,
    /// ISO 8601, UTC.
    pub expires_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct Status {
    pub status: &'static str,
    pub persistence: StorageKind,
    pub test_mode: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
