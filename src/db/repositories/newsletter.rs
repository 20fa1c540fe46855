//! Newsletter subscription repository

use crate::db::{Backend, DynDatabasePool, JsonCollection};
use crate::models::{NewsletterSubscription, SubscriptionStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::path::Path;
use std::sync::Arc;

/// Newsletter repository trait
#[async_trait]
pub trait NewsletterRepository: Send + Sync {
    /// Get subscription by email address
    async fn get_by_email(&self, email: &str) -> Result<Option<NewsletterSubscription>>;

    /// Get subscription by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<NewsletterSubscription>>;

    /// Insert a new active subscription
    async fn create(&self, email: &str, name: Option<&str>) -> Result<NewsletterSubscription>;

    /// Mark an existing subscription active again with a fresh `subscribed_at`.
    ///
    /// A `None` name keeps the stored one. Returns `None` if the email is unknown.
    async fn reactivate(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<Option<NewsletterSubscription>>;

    /// Unsubscribe an active subscription. Returns whether anything changed.
    async fn unsubscribe(&self, email: &str) -> Result<bool>;

    /// All subscriptions, most recently subscribed first
    async fn list_all(&self) -> Result<Vec<NewsletterSubscription>>;

    /// Active subscriptions, most recently subscribed first
    async fn list_active(&self) -> Result<Vec<NewsletterSubscription>>;
}

/// SQLx-based newsletter repository implementation
pub struct SqlxNewsletterRepository {
    pool: DynDatabasePool,
}

impl SqlxNewsletterRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NewsletterRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, email, name, status, subscribed_at, unsubscribed_at
    FROM newsletter_subscriptions
"#;

const INSERT_SQL: &str = r#"
    INSERT INTO newsletter_subscriptions (email, name, status, subscribed_at)
    VALUES (?, ?, 'active', ?)
"#;

const REACTIVATE_SQL: &str = r#"
    UPDATE newsletter_subscriptions
    SET status = 'active', name = COALESCE(?, name), subscribed_at = ?, unsubscribed_at = NULL
    WHERE email = ?
"#;

const UNSUBSCRIBE_SQL: &str = r#"
    UPDATE newsletter_subscriptions
    SET status = 'unsubscribed', unsubscribed_at = ?
    WHERE email = ? AND status = 'active'
"#;

#[async_trait]
impl NewsletterRepository for SqlxNewsletterRepository {
    async fn get_by_email(&self, email: &str) -> Result<Option<NewsletterSubscription>> {
        let sql = format!("{SELECT_COLUMNS} WHERE email = ?");
        match self.pool.backend()? {
            Backend::Sqlite(pool) => fetch_one_sqlite(pool, &sql, Key::Email(email)).await,
            Backend::Mysql(pool) => fetch_one_mysql(pool, &sql, Key::Email(email)).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<NewsletterSubscription>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
        match self.pool.backend()? {
            Backend::Sqlite(pool) => fetch_one_sqlite(pool, &sql, Key::Id(id)).await,
            Backend::Mysql(pool) => fetch_one_mysql(pool, &sql, Key::Id(id)).await,
        }
    }

    async fn create(&self, email: &str, name: Option<&str>) -> Result<NewsletterSubscription> {
        let now = Utc::now();
        let id = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(INSERT_SQL)
                .bind(email)
                .bind(name)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create newsletter subscription")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(INSERT_SQL)
                .bind(email)
                .bind(name)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create newsletter subscription")?
                .last_insert_id() as i64,
        };

        self.get_by_id(id)
            .await?
            .context("Newsletter subscription not found after insert")
    }

    async fn reactivate(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<Option<NewsletterSubscription>> {
        let now = Utc::now();
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                sqlx::query(REACTIVATE_SQL)
                    .bind(name)
                    .bind(now)
                    .bind(email)
                    .execute(pool)
                    .await
                    .context("Failed to reactivate newsletter subscription")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(REACTIVATE_SQL)
                    .bind(name)
                    .bind(now)
                    .bind(email)
                    .execute(pool)
                    .await
                    .context("Failed to reactivate newsletter subscription")?;
            }
        }
        self.get_by_email(email).await
    }

    async fn unsubscribe(&self, email: &str) -> Result<bool> {
        let now = Utc::now();
        let affected = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(UNSUBSCRIBE_SQL)
                .bind(now)
                .bind(email)
                .execute(pool)
                .await
                .context("Failed to unsubscribe")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(UNSUBSCRIBE_SQL)
                .bind(now)
                .bind(email)
                .execute(pool)
                .await
                .context("Failed to unsubscribe")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list_all(&self) -> Result<Vec<NewsletterSubscription>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY subscribed_at DESC");
        match self.pool.backend()? {
            Backend::Sqlite(pool) => fetch_all_sqlite(pool, &sql).await,
            Backend::Mysql(pool) => fetch_all_mysql(pool, &sql).await,
        }
    }

    async fn list_active(&self) -> Result<Vec<NewsletterSubscription>> {
        let sql = format!("{SELECT_COLUMNS} WHERE status = 'active' ORDER BY subscribed_at DESC");
        match self.pool.backend()? {
            Backend::Sqlite(pool) => fetch_all_sqlite(pool, &sql).await,
            Backend::Mysql(pool) => fetch_all_mysql(pool, &sql).await,
        }
    }
}

/// Lookup key for single-row queries
#[derive(Clone, Copy)]
enum Key<'a> {
    Id(i64),
    Email(&'a str),
}

fn parse_status(raw: String) -> Result<SubscriptionStatus> {
    raw.parse().map_err(anyhow::Error::msg)
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn fetch_one_sqlite(
    pool: &SqlitePool,
    sql: &str,
    key: Key<'_>,
) -> Result<Option<NewsletterSubscription>> {
    let query = sqlx::query(sql);
    let query = match key {
        Key::Id(id) => query.bind(id),
        Key::Email(email) => query.bind(email),
    };
    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get newsletter subscription")?;

    row.as_ref().map(row_to_subscription_sqlite).transpose()
}

async fn fetch_all_sqlite(pool: &SqlitePool, sql: &str) -> Result<Vec<NewsletterSubscription>> {
    let rows = sqlx::query(sql)
        .fetch_all(pool)
        .await
        .context("Failed to list newsletter subscriptions")?;

    rows.iter().map(row_to_subscription_sqlite).collect()
}

fn row_to_subscription_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<NewsletterSubscription> {
    Ok(NewsletterSubscription {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        status: parse_status(row.try_get("status")?)?,
        subscribed_at: row.try_get("subscribed_at")?,
        unsubscribed_at: row.try_get("unsubscribed_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn fetch_one_mysql(
    pool: &MySqlPool,
    sql: &str,
    key: Key<'_>,
) -> Result<Option<NewsletterSubscription>> {
    let query = sqlx::query(sql);
    let query = match key {
        Key::Id(id) => query.bind(id),
        Key::Email(email) => query.bind(email),
    };
    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get newsletter subscription")?;

    row.as_ref().map(row_to_subscription_mysql).transpose()
}

async fn fetch_all_mysql(pool: &MySqlPool, sql: &str) -> Result<Vec<NewsletterSubscription>> {
    let rows = sqlx::query(sql)
        .fetch_all(pool)
        .await
        .context("Failed to list newsletter subscriptions")?;

    rows.iter().map(row_to_subscription_mysql).collect()
}

fn row_to_subscription_mysql(row: &sqlx::mysql::MySqlRow) -> Result<NewsletterSubscription> {
    Ok(NewsletterSubscription {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        status: parse_status(row.try_get("status")?)?,
        subscribed_at: row.try_get("subscribed_at")?,
        unsubscribed_at: row.try_get("unsubscribed_at")?,
    })
}

// ============================================================================
// JSON file implementation
// ============================================================================

/// Newsletter repository over `newsletter.json`
pub struct JsonNewsletterRepository {
    collection: JsonCollection<NewsletterSubscription>,
}

impl JsonNewsletterRepository {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            collection: JsonCollection::new(data_dir, "newsletter.json"),
        }
    }

    pub fn boxed(data_dir: impl AsRef<Path>) -> Arc<dyn NewsletterRepository> {
        Arc::new(Self::new(data_dir))
    }

    async fn sorted(&self, active_only: bool) -> Result<Vec<NewsletterSubscription>> {
        let mut subscriptions: Vec<_> = self
            .collection
            .read_all()
            .await?
            .into_iter()
            .filter(|s| !active_only || s.is_active())
            .collect();
        subscriptions.sort_by(|a, b| b.subscribed_at.cmp(&a.subscribed_at));
        Ok(subscriptions)
    }
}

#[async_trait]
impl NewsletterRepository for JsonNewsletterRepository {
    async fn get_by_email(&self, email: &str) -> Result<Option<NewsletterSubscription>> {
        let subscriptions = self.collection.read_all().await?;
        Ok(subscriptions.into_iter().find(|s| s.email == email))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<NewsletterSubscription>> {
        let subscriptions = self.collection.read_all().await?;
        Ok(subscriptions.into_iter().find(|s| s.id == id))
    }

    async fn create(&self, email: &str, name: Option<&str>) -> Result<NewsletterSubscription> {
        let created = self
            .collection
            .modify(|subscriptions| {
                if subscriptions.iter().any(|s| s.email == email) {
                    return None;
                }
                let subscription = NewsletterSubscription {
                    id: subscriptions.iter().map(|s| s.id).max().unwrap_or(0) + 1,
                    email: email.to_string(),
                    name: name.map(str::to_string),
                    status: SubscriptionStatus::Active,
                    subscribed_at: Utc::now(),
                    unsubscribed_at: None,
                };
                subscriptions.push(subscription.clone());
                Some(subscription)
            })
            .await?;

        created.with_context(|| format!("Email already subscribed: {}", email))
    }

    async fn reactivate(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<Option<NewsletterSubscription>> {
        self.collection
            .modify(|subscriptions| {
                let subscription = subscriptions.iter_mut().find(|s| s.email == email)?;
                subscription.status = SubscriptionStatus::Active;
                if let Some(name) = name {
                    subscription.name = Some(name.to_string());
                }
                subscription.subscribed_at = Utc::now();
                subscription.unsubscribed_at = None;
                Some(subscription.clone())
            })
            .await
    }

    async fn unsubscribe(&self, email: &str) -> Result<bool> {
        let changed = self
            .collection
            .modify(|subscriptions| {
                let subscription = subscriptions
                    .iter_mut()
                    .find(|s| s.email == email && s.is_active())?;
                subscription.status = SubscriptionStatus::Unsubscribed;
                subscription.unsubscribed_at = Some(Utc::now());
                Some(())
            })
            .await?;
        Ok(changed.is_some())
    }

    async fn list_all(&self) -> Result<Vec<NewsletterSubscription>> {
        self.sorted(false).await
    }

    async fn list_active(&self) -> Result<Vec<NewsletterSubscription>> {
        self.sorted(true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use tempfile::TempDir;

    async fn exercise(repo: &dyn NewsletterRepository) {
        let anna = repo.create("anna@example.nl", Some("Anna")).await.unwrap();
        assert!(anna.is_active());
        assert_eq!(anna.name.as_deref(), Some("Anna"));

        let bob = repo.create("bob@example.nl", None).await.unwrap();
        assert_ne!(anna.id, bob.id);
        assert!(repo.create("bob@example.nl", None).await.is_err());

        assert!(repo.unsubscribe("anna@example.nl").await.unwrap());
        assert!(!repo.unsubscribe("anna@example.nl").await.unwrap());

        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].email, "bob@example.nl");

        let stored = repo.get_by_email("anna@example.nl").await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Unsubscribed);
        assert!(stored.unsubscribed_at.is_some());

        let back = repo.reactivate("anna@example.nl", None).await.unwrap().unwrap();
        assert!(back.is_active());
        assert_eq!(back.name.as_deref(), Some("Anna"));
        assert!(back.unsubscribed_at.is_none());

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].email, "anna@example.nl");

        assert!(repo.reactivate("nobody@example.nl", None).await.unwrap().is_none());
        assert_eq!(repo.get_by_id(bob.id).await.unwrap().unwrap().email, "bob@example.nl");
    }

    #[tokio::test]
    async fn test_sqlx_newsletter_repository() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        exercise(&SqlxNewsletterRepository::new(pool)).await;
    }

    #[tokio::test]
    async fn test_json_newsletter_repository() {
        let dir = TempDir::new().unwrap();
        exercise(&JsonNewsletterRepository::new(dir.path())).await;
    }
}
