//! Draft storage: the editor's local key-value persistence.
//!
//! Drafts are JSON envelopes stored under one fixed key per editor session.
//! The backing store is injected as a `Storage` so the bridge can run against
//! Redis in the service and an in-memory map in tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::document::Document;

const DRAFT_KEY_PREFIX: &str = "vitae:draft";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Draft serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Keyed string storage.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Redis-backed storage. Opens a multiplexed connection per call; the client
/// itself holds no connection.
#[derive(Clone)]
pub struct RedisStorage {
    client: redis::Client,
}

impl RedisStorage {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Storage for RedisStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.get::<_, Option<String>>(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }
}

/// The envelope written to draft storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalDraft {
    pub current_state: Document,
    pub saved_at: DateTime<Utc>,
    pub resume_id: Option<Uuid>,
}

pub fn draft_key(session_id: Uuid) -> String {
    format!("{DRAFT_KEY_PREFIX}:{session_id}")
}

/// Reads and writes `LocalDraft` envelopes through an injected `Storage`.
#[derive(Clone)]
pub struct DraftStore {
    storage: Arc<dyn Storage>,
}

impl DraftStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Returns the stored draft, or `None` when there is none. Unreadable
    /// drafts and storage failures are logged and treated as absent.
    pub async fn load(&self, session_id: Uuid) -> Option<LocalDraft> {
        let key = draft_key(session_id);
        let raw = match self.storage.get(&key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read draft {key}: {e}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(draft) => Some(draft),
            Err(e) => {
                warn!("Discarding unreadable draft {key}: {e}");
                None
            }
        }
    }

    pub async fn save(
        &self,
        session_id: Uuid,
        document: &Document,
        resume_id: Option<Uuid>,
    ) -> Result<LocalDraft, StorageError> {
        let draft = LocalDraft {
            current_state: document.clone(),
            saved_at: Utc::now(),
            resume_id,
        };
        let json = serde_json::to_string(&draft)?;
        self.storage.set(&draft_key(session_id), &json).await?;
        info!("Saved draft for session {session_id}");
        Ok(draft)
    }

    pub async fn clear(&self, session_id: Uuid) -> Result<(), StorageError> {
        self.storage.remove(&draft_key(session_id)).await
    }
}
