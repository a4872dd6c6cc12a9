use chrono::Utc;

use crate::{
    error::AuthError,
    navigation::Route,
    session::{SessionHandoff, SessionStore},
    settings::AdminCredentials,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Admin entry point: a fixed credential pair from settings.
pub struct AdminGate {
    credentials: AdminCredentials,
    sessions: SessionStore,
}

impl AdminGate {
    pub fn new(credentials: AdminCredentials, sessions: SessionStore) -> Self {
        Self {
            credentials,
            sessions,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.credentials.is_configured()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<SessionHandoff, AuthError> {
        if !self.is_enabled() {
            return Err(AuthError::AdminDisabled);
        }
        if username != self.credentials.username || password != self.credentials.password {
            log_warn!("rejected admin login for {username:?}");
            return Err(AuthError::AdminRejected);
        }

        let login_time = Utc::now();
        if let Err(err) = self.sessions.create(username, login_time).await {
            log_error!("Failed to persist admin session: {err:#}");
        }
        log_info!("admin {username} logged in");

        Ok(SessionHandoff {
            user_name: username.to_string(),
            login_time,
            destination: Route::Dashboard,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn gate(username: &str, password: &str) -> (AdminGate, SessionStore) {
        let sessions = SessionStore::new(Arc::new(MemoryStore::new()));
        let credentials = AdminCredentials {
            username: username.into(),
            password: password.into(),
        };
        (AdminGate::new(credentials, sessions.clone()), sessions)
    }

    #[tokio::test]
    async fn matching_credentials_open_the_dashboard() {
        let (gate, sessions) = gate("admin", "s3cret");
        let handoff = gate.login("admin", "s3cret").await.unwrap();

        assert_eq!(handoff.destination, Route::Dashboard);
        let record = sessions.read().await.unwrap();
        assert_eq!(record.user_name, "admin");
        assert_eq!(record.login_time, handoff.login_time);
    }

    #[tokio::test]
    async fn wrong_credentials_are_rejected_without_a_session() {
        let (gate, sessions) = gate("admin", "s3cret");
        assert_eq!(gate.login("admin", "guess").await, Err(AuthError::AdminRejected));
        assert_eq!(gate.login("Admin", "s3cret").await, Err(AuthError::AdminRejected));
        assert!(sessions.read().await.is_none());
    }

    #[tokio::test]
    async fn unconfigured_gate_is_disabled() {
        let (gate, _) = gate("", "");
        assert!(!gate.is_enabled());
        assert_eq!(gate.login("", "").await, Err(AuthError::AdminDisabled));
    }
}
