//! Session identity store.
//!
//! A session serializes to nothing but the identity id; the live identity is
//! re-read from the record store on every request, so profile and plan
//! changes take effect immediately at the cost of one lookup per request.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use redis::{aio::ConnectionManager, Client};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{Identity, SessionRecord};
use crate::services::tokens::generate_token;
use crate::services::{IdentityStore, ServiceError};

/// Serialize an authenticated identity to its durable session reference.
pub fn serialize_identity(identity: &Identity) -> SessionRecord {
    SessionRecord::for_identity(identity.identity_id)
}

/// Resolve a session record back to a live identity via the record store.
pub async fn deserialize_identity(
    store: &dyn IdentityStore,
    record: &SessionRecord,
) -> Result<Option<Identity>, ServiceError> {
    match record.identity_id {
        Some(identity_id) => store.find_identity_by_id(identity_id).await,
        None => Ok(None),
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session and return its opaque id.
    async fn create(
        &self,
        record: &SessionRecord,
        ttl_seconds: i64,
    ) -> Result<String, ServiceError>;
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, ServiceError>;
    /// Replace a session's record, keeping its remaining lifetime.
    async fn put(&self, session_id: &str, record: &SessionRecord) -> Result<(), ServiceError>;
    async fn destroy(&self, session_id: &str) -> Result<(), ServiceError>;
    /// Destroy every session referencing the identity (account deletion,
    /// password reset).
    async fn destroy_all_for_identity(&self, identity_id: Uuid) -> Result<(), ServiceError>;
    async fn health_check(&self) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct RedisSessionStore {
    _client: Client,
    manager: ConnectionManager,
}

impl RedisSessionStore {
    pub async fn new(config: &crate::config::RedisConfig) -> Result<Self, anyhow::Error> {
        tracing::info!(url = %config.url, "Connecting to Redis");
        let client = Client::open(config.url.clone())?;

        // ConnectionManager reconnects on its own
        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self {
            _client: client,
            manager,
        })
    }

    fn session_key(session_id: &str) -> String {
        format!("session:{}", session_id)
    }

    fn index_key(identity_id: Uuid) -> String {
        format!("sessions:identity:{}", identity_id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(
        &self,
        record: &SessionRecord,
        ttl_seconds: i64,
    ) -> Result<String, ServiceError> {
        let session_id = generate_token();
        let mut conn = self.manager.clone();
        let payload = serde_json::to_string(record)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!(e)))?;

        redis::cmd("SET")
            .arg(Self::session_key(&session_id))
            .arg(payload)
            .arg("EX")
            .arg(ttl_seconds)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to store session: {}", e)))?;

        // Per-identity index so deletion can invalidate every session at once
        if let Some(identity_id) = record.identity_id {
            let index = Self::index_key(identity_id);
            redis::cmd("SADD")
                .arg(&index)
                .arg(&session_id)
                .query_async::<_, ()>(&mut conn)
                .await
                .map_err(|e| {
                    ServiceError::Internal(anyhow::anyhow!("Failed to index session: {}", e))
                })?;
            redis::cmd("EXPIRE")
                .arg(&index)
                .arg(ttl_seconds)
                .query_async::<_, ()>(&mut conn)
                .await
                .map_err(|e| {
                    ServiceError::Internal(anyhow::anyhow!("Failed to expire index: {}", e))
                })?;
        }

        Ok(session_id)
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, ServiceError> {
        let mut conn = self.manager.clone();
        let payload: Option<String> = redis::cmd("GET")
            .arg(Self::session_key(session_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to load session: {}", e)))?;

        match payload {
            Some(payload) => {
                let record = serde_json::from_str(&payload)
                    .map_err(|e| ServiceError::Internal(anyhow::anyhow!(e)))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, session_id: &str, record: &SessionRecord) -> Result<(), ServiceError> {
        let mut conn = self.manager.clone();
        let payload = serde_json::to_string(record)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!(e)))?;

        redis::cmd("SET")
            .arg(Self::session_key(session_id))
            .arg(payload)
            .arg("KEEPTTL")
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| {
                ServiceError::Internal(anyhow::anyhow!("Failed to update session: {}", e))
            })?;
        Ok(())
    }

    async fn destroy(&self, session_id: &str) -> Result<(), ServiceError> {
        let mut conn = self.manager.clone();

        // Drop the index entry first so a crash leaves no dangling member
        if let Some(record) = self.get(session_id).await? {
            if let Some(identity_id) = record.identity_id {
                redis::cmd("SREM")
                    .arg(Self::index_key(identity_id))
                    .arg(session_id)
                    .query_async::<_, ()>(&mut conn)
                    .await
                    .map_err(|e| {
                        ServiceError::Internal(anyhow::anyhow!("Failed to unindex session: {}", e))
                    })?;
            }
        }

        redis::cmd("DEL")
            .arg(Self::session_key(session_id))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| {
                ServiceError::Internal(anyhow::anyhow!("Failed to destroy session: {}", e))
            })?;
        Ok(())
    }

    async fn destroy_all_for_identity(&self, identity_id: Uuid) -> Result<(), ServiceError> {
        let mut conn = self.manager.clone();
        let index = Self::index_key(identity_id);

        let session_ids: Vec<String> = redis::cmd("SMEMBERS")
            .arg(&index)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                ServiceError::Internal(anyhow::anyhow!("Failed to list sessions: {}", e))
            })?;

        for session_id in session_ids {
            redis::cmd("DEL")
                .arg(Self::session_key(&session_id))
                .query_async::<_, ()>(&mut conn)
                .await
                .map_err(|e| {
                    ServiceError::Internal(anyhow::anyhow!("Failed to destroy session: {}", e))
                })?;
        }

        redis::cmd("DEL")
            .arg(&index)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| {
                ServiceError::Internal(anyhow::anyhow!("Failed to drop session index: {}", e))
            })?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Redis health check failed: {}", e)))
    }
}

/// In-memory session store used by tests.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, (SessionRecord, DateTime<Utc>)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, (SessionRecord, DateTime<Utc>)>> {
        self.sessions.lock().expect("session store mutex poisoned")
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(
        &self,
        record: &SessionRecord,
        ttl_seconds: i64,
    ) -> Result<String, ServiceError> {
        let session_id = generate_token();
        let expires_at = Utc::now() + Duration::seconds(ttl_seconds);
        self.lock()
            .insert(session_id.clone(), (record.clone(), expires_at));
        Ok(session_id)
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, ServiceError> {
        Ok(self
            .lock()
            .get(session_id)
            .filter(|(_, expires_at)| Utc::now() < *expires_at)
            .map(|(record, _)| record.clone()))
    }

    async fn put(&self, session_id: &str, record: &SessionRecord) -> Result<(), ServiceError> {
        let mut sessions = self.lock();
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.0 = record.clone();
        }
        Ok(())
    }

    async fn destroy(&self, session_id: &str) -> Result<(), ServiceError> {
        self.lock().remove(session_id);
        Ok(())
    }

    async fn destroy_all_for_identity(&self, identity_id: Uuid) -> Result<(), ServiceError> {
        self.lock()
            .retain(|_, (record, _)| record.identity_id != Some(identity_id));
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_roundtrip() {
        let store = MemorySessionStore::new();
        let identity_id = Uuid::new_v4();
        let sid = store
            .create(&SessionRecord::for_identity(identity_id), 60)
            .await
            .unwrap();

        let record = store.get(&sid).await.unwrap().unwrap();
        assert_eq!(record.identity_id, Some(identity_id));

        store.destroy(&sid).await.unwrap();
        assert!(store.get(&sid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_gone() {
        let store = MemorySessionStore::new();
        let sid = store
            .create(&SessionRecord::for_identity(Uuid::new_v4()), -1)
            .await
            .unwrap();

        assert!(store.get(&sid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_destroy_all_for_identity() {
        let store = MemorySessionStore::new();
        let identity_id = Uuid::new_v4();
        let other = Uuid::new_v4();
        let a = store
            .create(&SessionRecord::for_identity(identity_id), 60)
            .await
            .unwrap();
        let b = store
            .create(&SessionRecord::for_identity(identity_id), 60)
            .await
            .unwrap();
        let c = store
            .create(&SessionRecord::for_identity(other), 60)
            .await
            .unwrap();

        store.destroy_all_for_identity(identity_id).await.unwrap();

        assert!(store.get(&a).await.unwrap().is_none());
        assert!(store.get(&b).await.unwrap().is_none());
        assert!(store.get(&c).await.unwrap().is_some());
    }
}
