use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::PasteStore;
use crate::error::StoreError;
use crate::ids::generate_id;
use crate::models::{ConsumedPaste, NewPaste, PasteRecord};

/// Advisory key retention for pastes with a TTL. Never shorter than the TTL itself.
const MIN_RETENTION_SECS: u64 = 30 * 24 * 60 * 60;

/// Key written by the readiness probe.
const PROBE_KEY: &str = "test-connection";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The primitives required from the external key-value service.
pub trait KvClient {
    /// Get a value by key.
    async fn get(&self, key: &str) -> crate::StoreResult<Option<String>>;

    /// Set a single key.
    async fn set(&self, key: &str, value: &str) -> crate::StoreResult<()>;

    /// Set several keys in one atomic write.
    async fn set_many(&self, entries: &[(&str, &str)]) -> crate::StoreResult<()>;

    /// Atomically increment an integer key and return the new value.
    async fn incr(&self, key: &str) -> crate::StoreResult<u64>;

    /// Ask the service to drop a key after `secs` seconds.
    async fn expire(&self, key: &str, secs: u64) -> crate::StoreResult<()>;
}

/// Client for a Redis-compatible REST endpoint (Upstash / Vercel KV).
#[derive(Clone)]
pub struct RestKv {
    client: reqwest::Client,
    url: String,
    token: String,
}

#[derive(Deserialize)]
struct Reply {
    #[serde(default)]
    result: Value,
    error: Option<String>,
}

impl RestKv {
    pub fn new(url: &str, token: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(RestKv {
            client,
            url: url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
        })
    }

    async fn command(&self, args: &[&str]) -> crate::StoreResult<Value> {
        let reply: Reply = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(args)
            .send()
            .await?
            .json()
            .await?;

        match reply.error {
            Some(error) => Err(StoreError::RemoteCommand(error)),
            None => Ok(reply.result),
        }
    }
}

impl KvClient for RestKv {
    async fn get(&self, key: &str) -> crate::StoreResult<Option<String>> {
        match self.command(&["GET", key]).await? {
            Value::Null => Ok(None),
            Value::String(value) => Ok(Some(value)),
            _ => Err(StoreError::UnexpectedReply),
        }
    }

    async fn set(&self, key: &str, value: &str) -> crate::StoreResult<()> {
        self.command(&["SET", key, value]).await?;
        Ok(())
    }

    async fn set_many(&self, entries: &[(&str, &str)]) -> crate::StoreResult<()> {
        let mut args = Vec::with_capacity(1 + entries.len() * 2);
        args.push("MSET");
        for (key, value) in entries {
            args.push(*key);
            args.push(*value);
        }
        self.command(&args).await?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> crate::StoreResult<u64> {
        self.command(&["INCR", key])
            .await?
            .as_u64()
            .ok_or(StoreError::UnexpectedReply)
    }

    async fn expire(&self, key: &str, secs: u64) -> crate::StoreResult<()> {
        self.command(&["EXPIRE", key, &secs.to_string()]).await?;
        Ok(())
    }
}

/// Store backed by an external key-value service, safe to share between
/// instances. View counting relies on the service's atomic increment.
#[derive(Clone)]
pub struct RemoteStore<C = RestKv> {
    client: C,
}

impl<C: KvClient> RemoteStore<C> {
    pub fn new(client: C) -> Self {
        RemoteStore { client }
    }

    async fn expire_later(&self, id: &str, ttl_seconds: u64) {
        let retention = ttl_seconds.max(MIN_RETENTION_SECS);
        for key in [record_key(id), views_key(id)] {
            if let Err(error) = self.client.expire(&key, retention).await {
                warn!("failed to set expiry on '{key}': {error:?}");
            }
        }
    }
}

fn record_key(id: &str) -> String {
    format!("paste:{id}")
}

fn views_key(id: &str) -> String {
    format!("paste:{id}:views")
}

impl<C: KvClient> PasteStore for RemoteStore<C> {
    async fn create(&self, paste: NewPaste, now: i64) -> crate::StoreResult<String> {
        let ttl_seconds = paste.ttl_seconds;
        let size = paste.content.len();
        let record = PasteRecord::new(generate_id(), paste, now);
        let data = serde_json::to_string(&record)?;

        let record_key = record_key(&record.id);
        let views_key = views_key(&record.id);
        self.client
            .set_many(&[(record_key.as_str(), data.as_str()), (views_key.as_str(), "0")])
            .await?;

        if let Some(ttl_seconds) = ttl_seconds {
            self.expire_later(&record.id, ttl_seconds).await;
        }

        info!("new paste: id='{id}', size={size}", id = record.id);

        Ok(record.id)
    }

    async fn read_and_consume(
        &self,
        id: &str,
        now: i64,
    ) -> crate::StoreResult<Option<ConsumedPaste>> {
        let Some(data) = self.client.get(&record_key(id)).await? else {
            return Ok(None);
        };
        let record: PasteRecord = serde_json::from_str(&data)?;

        if record.is_expired(now) {
            return Ok(None);
        }

        // count first; the service's increment is the only synchronization point
        let views = self.client.incr(&views_key(id)).await?;
        if !record.allows_view(views) {
            return Ok(None);
        }

        Ok(Some(ConsumedPaste { record, views }))
    }

    async fn is_ready(&self) -> bool {
        match self.client.set(PROBE_KEY, "ok").await {
            Ok(()) => true,
            Err(error) => {
                warn!("remote store is not ready: {error:?}");
                false
            }
        }
    }
}
