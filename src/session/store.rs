use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{navigation::Route, storage::KeyValueStore};

use super::{SessionHandoff, SessionRecord};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_warn};

const SESSION_KEY: &str = "user";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionSource {
    Handoff,
    Stored,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub user_name: String,
    pub login_time: DateTime<Utc>,
    pub source: SessionSource,
}

/// Outcome of loading a protected view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAccess {
    Granted(ActiveSession),
    Redirect(Route),
}

/// Single-session store over a durable key-value backend.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Writes the record, replacing whatever was there.
    pub async fn create(&self, user_name: &str, login_time: DateTime<Utc>) -> Result<SessionRecord> {
        let record = SessionRecord::new(user_name, login_time);
        let serialized = serde_json::to_string(&record)?;
        self.backend
            .put(SESSION_KEY, serialized)
            .await
            .context("failed to persist session record")?;
        log_debug!("Session record written for {}", record.user_name);
        Ok(record)
    }

    /// Current record, or `None` when absent, malformed or unreadable.
    pub async fn read(&self) -> Option<SessionRecord> {
        let raw = match self.backend.get(SESSION_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                log_error!("Failed to read session record: {err:#}");
                return None;
            }
        };

        let record = SessionRecord::parse(&raw);
        if record.is_none() {
            log_warn!("Ignoring malformed session record");
        }
        record
    }

    pub async fn clear(&self) -> Result<()> {
        self.backend
            .remove(SESSION_KEY)
            .await
            .context("failed to clear session record")
    }

    /// Prefers an explicit hand-off over the durable record; with neither,
    /// the view is sent back to the login screen.
    pub async fn resolve(&self, handoff: Option<&SessionHandoff>) -> SessionAccess {
        if let Some(handoff) = handoff {
            return SessionAccess::Granted(ActiveSession {
                user_name: handoff.user_name.clone(),
                login_time: handoff.login_time,
                source: SessionSource::Handoff,
            });
        }

        match self.read().await {
            Some(record) => SessionAccess::Granted(ActiveSession {
                user_name: record.user_name,
                login_time: record.login_time,
                source: SessionSource::Stored,
            }),
            None => SessionAccess::Redirect(Route::Login),
        }
    }

    /// Logout: drop the record and return to the login screen.
    pub async fn logout(&self) -> Result<Route> {
        self.clear().await?;
        Ok(Route::Login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::TimeZone;

    fn store() -> (SessionStore, Arc<MemoryStore>) {
        let backend = Arc::new(MemoryStore::new());
        (SessionStore::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn create_then_read_round_trips() {
        let (sessions, _) = store();
        let t = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();

        sessions.create("alice", t).await.unwrap();
        let record = sessions.read().await.unwrap();

        assert_eq!(record, SessionRecord {
            user_name: "alice".into(),
            login_time: t,
            authenticated: true,
        });
    }

    #[tokio::test]
    async fn create_overwrites_previous_session() {
        let (sessions, _) = store();
        sessions.create("alice", Utc::now()).await.unwrap();
        sessions.create("bob", Utc::now()).await.unwrap();
        assert_eq!(sessions.read().await.unwrap().user_name, "bob");
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let (sessions, _) = store();
        sessions.create("alice", Utc::now()).await.unwrap();
        sessions.clear().await.unwrap();
        assert!(sessions.read().await.is_none());
        sessions.clear().await.unwrap();
        assert!(sessions.read().await.is_none());
    }

    #[tokio::test]
    async fn malformed_records_read_as_absent() {
        let (sessions, backend) = store();
        backend.put(SESSION_KEY, "{\"name\":\"al".into()).await.unwrap();
        assert!(sessions.read().await.is_none());
        assert_eq!(sessions.resolve(None).await, SessionAccess::Redirect(Route::Login));
    }

    #[tokio::test]
    async fn handoff_wins_over_stored_record() {
        let (sessions, _) = store();
        sessions.create("stored", Utc::now()).await.unwrap();
        let handoff = SessionHandoff {
            user_name: "fresh".into(),
            login_time: Utc::now(),
            destination: Route::Welcome,
        };

        match sessions.resolve(Some(&handoff)).await {
            SessionAccess::Granted(active) => {
                assert_eq!(active.user_name, "fresh");
                assert_eq!(active.source, SessionSource::Handoff);
            }
            other => panic!("expected granted session, got {other:?}"),
        }

        match sessions.resolve(None).await {
            SessionAccess::Granted(active) => {
                assert_eq!(active.user_name, "stored");
                assert_eq!(active.source, SessionSource::Stored);
            }
            other => panic!("expected stored session, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn logout_clears_and_redirects() {
        let (sessions, _) = store();
        sessions.create("alice", Utc::now()).await.unwrap();
        assert_eq!(sessions.logout().await.unwrap(), Route::Login);
        assert_eq!(sessions.resolve(None).await, SessionAccess::Redirect(Route::Login));
    }

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(anyhow!("disk unavailable"))
        }
        async fn put(&self, _key: &str, _value: String) -> Result<()> {
            Err(anyhow!("disk unavailable"))
        }
        async fn remove(&self, _key: &str) -> Result<()> {
            Err(anyhow!("disk unavailable"))
        }
    }

    #[tokio::test]
    async fn storage_failures_never_reach_readers() {
        let sessions = SessionStore::new(Arc::new(BrokenStore));
        assert!(sessions.read().await.is_none());
        assert!(sessions.create("alice", Utc::now()).await.is_err());
    }
}
