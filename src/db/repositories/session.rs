//! Session repository
//!
//! Storage for back-office sessions.
//!
//! This module provides:
//! - `SessionRepository` trait defining the interface for session data access
//! - `SqlxSessionRepository` implementing the trait for SQLite and MySQL
//! - `MemorySessionRepository` keeping sessions in process memory

use crate::db::{Backend, DynDatabasePool};
use crate::models::AdminSession;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session
    async fn create(&self, session: &AdminSession) -> Result<AdminSession>;

    /// Get session by ID (token)
    async fn get_by_id(&self, id: &str) -> Result<Option<AdminSession>>;

    /// Delete a session. Returns whether it existed.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Delete expired sessions, returning how many were removed
    async fn delete_expired(&self) -> Result<u64>;
}

/// SQLx-based session repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_SQL: &str =
    "INSERT INTO admin_sessions (id, expires_at, created_at) VALUES (?, ?, ?)";
const SELECT_SQL: &str = "SELECT id, expires_at, created_at FROM admin_sessions WHERE id = ?";
const DELETE_SQL: &str = "DELETE FROM admin_sessions WHERE id = ?";
const DELETE_EXPIRED_SQL: &str = "DELETE FROM admin_sessions WHERE expires_at < ?";

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &AdminSession) -> Result<AdminSession> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                sqlx::query(INSERT_SQL)
                    .bind(&session.id)
                    .bind(session.expires_at)
                    .bind(session.created_at)
                    .execute(pool)
                    .await
                    .context("Failed to create session")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(INSERT_SQL)
                    .bind(&session.id)
                    .bind(session.expires_at)
                    .bind(session.created_at)
                    .execute(pool)
                    .await
                    .context("Failed to create session")?;
            }
        }
        Ok(session.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<AdminSession>> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(SELECT_SQL)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get session by ID")?;
                match row {
                    Some(row) => Ok(Some(AdminSession {
                        id: row.try_get("id")?,
                        expires_at: row.try_get("expires_at")?,
                        created_at: row.try_get("created_at")?,
                    })),
                    None => Ok(None),
                }
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(SELECT_SQL)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get session by ID")?;
                match row {
                    Some(row) => Ok(Some(AdminSession {
                        id: row.try_get("id")?,
                        expires_at: row.try_get("expires_at")?,
                        created_at: row.try_get("created_at")?,
                    })),
                    None => Ok(None),
                }
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let affected = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(DELETE_SQL)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete session")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(DELETE_SQL)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete session")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn delete_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let affected = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(DELETE_EXPIRED_SQL)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to delete expired sessions")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(DELETE_EXPIRED_SQL)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to delete expired sessions")?
                .rows_affected(),
        };
        Ok(affected)
    }
}

/// In-process session store used when no database is configured
#[derive(Default)]
pub struct MemorySessionRepository {
    sessions: RwLock<HashMap<String, AdminSession>>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxed() -> Arc<dyn SessionRepository> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create(&self, session: &AdminSession) -> Result<AdminSession> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(session.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<AdminSession>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }

    async fn delete_expired(&self) -> Result<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        Ok((before - sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;
    use uuid::Uuid;

    fn session_expiring_in(minutes: i64) -> AdminSession {
        let now = Utc::now();
        AdminSession {
            id: Uuid::new_v4().to_string(),
            expires_at: now + Duration::minutes(minutes),
            created_at: now,
        }
    }

    async fn exercise(repo: &dyn SessionRepository) {
        let live = session_expiring_in(60);
        let dead = session_expiring_in(-1);
        repo.create(&live).await.expect("Failed to create session");
        repo.create(&dead).await.expect("Failed to create session");

        let found = repo
            .get_by_id(&live.id)
            .await
            .expect("Failed to get session")
            .expect("Session not found");
        assert_eq!(found.id, live.id);
        assert_eq!(found.expires_at, live.expires_at);

        assert!(repo.get_by_id("nonexistent").await.unwrap().is_none());

        assert_eq!(repo.delete_expired().await.unwrap(), 1);
        assert!(repo.get_by_id(&dead.id).await.unwrap().is_none());

        assert!(repo.delete(&live.id).await.unwrap());
        assert!(!repo.delete(&live.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_sqlx_session_repository() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        exercise(&SqlxSessionRepository::new(pool)).await;
    }

    #[tokio::test]
    async fn test_memory_session_repository() {
        exercise(&MemorySessionRepository::new()).await;
    }
}
