use chrono::{SecondsFormat, TimeZone, Utc};
use tracing::debug;

use crate::error::ApiError;
use crate::models::NewPaste;
use crate::storage::PasteStore;
use crate::types::api::{CreatePaste, CreatedPaste, PasteView};
use crate::App;

/// Header carrying an override for the current time in test mode.
pub const TEST_NOW_HEADER: &str = "x-test-now-ms";

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Pick the time a read is evaluated at: the test override when enabled and
/// present, otherwise the clock.
pub fn resolve_now(test_mode: bool, override_ms: Option<&str>) -> crate::ApiResult<i64> {
    match override_ms {
        Some(value) if test_mode => value
            .trim()
            .parse::<i64>()
            .map_err(|_| ApiError::InvalidTestTime),
        _ => Ok(now_millis()),
    }
}

pub fn validate(request: CreatePaste) -> crate::ApiResult<NewPaste> {
    if request.content.is_empty() {
        return Err(ApiError::InvalidInput("content cannot be empty".to_owned()));
    }

    Ok(NewPaste {
        content: request.content,
        ttl_seconds: positive("ttl_seconds", request.ttl_seconds)?,
        max_views: positive("max_views", request.max_views)?,
    })
}

fn positive(field: &str, value: Option<i64>) -> crate::ApiResult<Option<u64>> {
    match value {
        None => Ok(None),
        Some(value) if value >= 1 => Ok(Some(value as u64)),
        Some(_) => Err(ApiError::InvalidInput(format!(
            "{field} must be a positive integer"
        ))),
    }
}

pub async fn create(app: &App, request: CreatePaste, now: i64) -> crate::ApiResult<CreatedPaste> {
    let paste = validate(request)?;
    let id = app.store.create(paste, now).await?;

    let url = format!("{base_url}/p/{id}", base_url = app.config.base_url);

    Ok(CreatedPaste { id, url })
}

pub async fn view(app: &App, id: &str, now: i64) -> crate::ApiResult<PasteView> {
    let Some(consumed) = app.store.read_and_consume(id, now).await? else {
        debug!("paste unavailable: id='{id}', now={now}");
        return Err(ApiError::NotFound);
    };

    let remaining_views = consumed.remaining_views();
    let expires_at = consumed.record.expires_at.and_then(format_timestamp);

    Ok(PasteView {
        content: consumed.record.content,
        remaining_views,
        expires_at,
    })
}

fn format_timestamp(millis: i64) -> Option<String> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|time| time.to_rfc3339_opts(SecondsFormat::Millis, true))
}
