//! Back-office authentication
//!
//! There is a single admin password (from configuration). A successful login
//! creates a random session token that expires after the configured number of
//! hours. Expired sessions are dropped on lookup and by the periodic cleanup.

use crate::config::AdminConfig;
use crate::db::repositories::SessionRepository;
use crate::models::AdminSession;
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Error types for admin authentication
#[derive(Debug, thiserror::Error)]
pub enum AdminAuthError {
    /// Password was missing
    #[error("Password is required")]
    PasswordRequired,

    /// Password did not match
    #[error("Invalid password")]
    InvalidPassword,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Admin authentication service
pub struct AdminAuthService {
    session_repo: Arc<dyn SessionRepository>,
    password_hash: String,
    session_hours: i64,
}

impl AdminAuthService {
    /// Create the service, hashing the configured password
    pub fn new(
        session_repo: Arc<dyn SessionRepository>,
        config: &AdminConfig,
    ) -> anyhow::Result<Self> {
        let password_hash =
            hash_password(&config.password).context("Failed to hash admin password")?;
        Ok(Self {
            session_repo,
            password_hash,
            session_hours: config.session_hours,
        })
    }

    /// Check a password against the configured one
    pub fn verify_password(&self, password: &str) -> Result<bool, AdminAuthError> {
        Ok(verify_password(password, &self.password_hash)?)
    }

    /// Verify the password and open a new session
    pub async fn login(&self, password: Option<&str>) -> Result<AdminSession, AdminAuthError> {
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or(AdminAuthError::PasswordRequired)?;

        if !self.verify_password(password)? {
            tracing::warn!("Admin login failed: invalid password");
            return Err(AdminAuthError::InvalidPassword);
        }

        let session = self.create_session().await?;
        tracing::info!("Admin logged in, session expires at {}", session.expires_at);
        Ok(session)
    }

    /// Create a new session
    pub async fn create_session(&self) -> Result<AdminSession, AdminAuthError> {
        let now = Utc::now();
        let session = AdminSession {
            id: format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
            expires_at: now + Duration::hours(self.session_hours),
            created_at: now,
        };

        Ok(self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?)
    }

    /// Look up a live session. Expired sessions are deleted and reported absent.
    pub async fn get_session(&self, token: &str) -> Result<Option<AdminSession>, AdminAuthError> {
        let Some(session) = self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        else {
            return Ok(None);
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {:#}", e);
            }
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// End a session. Returns whether it existed.
    pub async fn logout(&self, token: &str) -> Result<bool, AdminAuthError> {
        Ok(self
            .session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?)
    }

    /// Delete all expired sessions
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, AdminAuthError> {
        Ok(self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::MemorySessionRepository;

    fn service(session_hours: i64) -> (AdminAuthService, Arc<dyn SessionRepository>) {
        let repo = MemorySessionRepository::boxed();
        let config = AdminConfig {
            password: "geheim".to_string(),
            session_hours,
        };
        (AdminAuthService::new(repo.clone(), &config).unwrap(), repo)
    }

    #[tokio::test]
    async fn test_login() {
        let (service, _) = service(24);

        assert!(matches!(
            service.login(None).await,
            Err(AdminAuthError::PasswordRequired)
        ));
        assert!(matches!(
            service.login(Some("")).await,
            Err(AdminAuthError::PasswordRequired)
        ));
        assert!(matches!(
            service.login(Some("fout")).await,
            Err(AdminAuthError::InvalidPassword)
        ));

        let session = service.login(Some("geheim")).await.unwrap();
        assert_eq!(session.id.len(), 64);
        let hours = (session.expires_at - session.created_at).num_hours();
        assert_eq!(hours, 24);

        let found = service.get_session(&session.id).await.unwrap();
        assert_eq!(found, Some(session.clone()));

        assert!(service.logout(&session.id).await.unwrap());
        assert!(service.get_session(&session.id).await.unwrap().is_none());
        assert!(!service.logout(&session.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_session_is_removed_on_lookup() {
        let (service, repo) = service(24);
        let now = Utc::now();
        let expired = AdminSession {
            id: "old".to_string(),
            expires_at: now - Duration::minutes(1),
            created_at: now - Duration::hours(25),
        };
        repo.create(&expired).await.unwrap();

        assert!(service.get_session("old").await.unwrap().is_none());
        assert!(repo.get_by_id("old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup() {
        let (service, repo) = service(24);
        let live = service.create_session().await.unwrap();
        let now = Utc::now();
        for id in ["a", "b"] {
            repo.create(&AdminSession {
                id: id.to_string(),
                expires_at: now - Duration::seconds(1),
                created_at: now - Duration::hours(24),
            })
            .await
            .unwrap();
        }

        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 2);
        assert!(service.get_session(&live.id).await.unwrap().is_some());
    }
}
