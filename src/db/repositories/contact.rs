//! Contact submission repository

use crate::db::{Backend, DynDatabasePool, JsonCollection};
use crate::models::{ContactStatus, ContactSubmission};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::path::Path;
use std::sync::Arc;

/// Fields of a new contact submission
#[derive(Debug, Clone)]
pub struct NewContactSubmission<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub subject: Option<&'a str>,
    pub message: &'a str,
}

/// Contact repository trait
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Store a submission with status `new`
    async fn create(&self, input: &NewContactSubmission<'_>) -> Result<ContactSubmission>;

    /// Get submission by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<ContactSubmission>>;

    /// All submissions, newest first
    async fn list(&self) -> Result<Vec<ContactSubmission>>;

    /// Set the status. `read_at` is only stored when none is recorded yet.
    ///
    /// Returns the updated submission or `None` if the ID is unknown.
    async fn update_status(
        &self,
        id: i64,
        status: ContactStatus,
        read_at: Option<DateTime<Utc>>,
    ) -> Result<Option<ContactSubmission>>;
}

/// SQLx-based contact repository implementation
pub struct SqlxContactRepository {
    pool: DynDatabasePool,
}

impl SqlxContactRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContactRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, name, email, subject, message, status, read_at, created_at
    FROM contact_submissions
"#;

const INSERT_SQL: &str = r#"
    INSERT INTO contact_submissions (name, email, subject, message, status, created_at)
    VALUES (?, ?, ?, ?, 'new', ?)
"#;

const UPDATE_STATUS_SQL: &str = r#"
    UPDATE contact_submissions
    SET status = ?, read_at = COALESCE(read_at, ?)
    WHERE id = ?
"#;

#[async_trait]
impl ContactRepository for SqlxContactRepository {
    async fn create(&self, input: &NewContactSubmission<'_>) -> Result<ContactSubmission> {
        let now = Utc::now();
        let id = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(INSERT_SQL)
                .bind(input.name)
                .bind(input.email)
                .bind(input.subject)
                .bind(input.message)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create contact submission")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(INSERT_SQL)
                .bind(input.name)
                .bind(input.email)
                .bind(input.subject)
                .bind(input.message)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create contact submission")?
                .last_insert_id() as i64,
        };

        self.get_by_id(id)
            .await?
            .context("Contact submission not found after insert")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ContactSubmission>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get contact submission")?;
                row.as_ref().map(row_to_submission_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get contact submission")?;
                row.as_ref().map(row_to_submission_mysql).transpose()
            }
        }
    }

    async fn list(&self) -> Result<Vec<ContactSubmission>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY created_at DESC");
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list contact submissions")?;
                rows.iter().map(row_to_submission_sqlite).collect()
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list contact submissions")?;
                rows.iter().map(row_to_submission_mysql).collect()
            }
        }
    }

    async fn update_status(
        &self,
        id: i64,
        status: ContactStatus,
        read_at: Option<DateTime<Utc>>,
    ) -> Result<Option<ContactSubmission>> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                sqlx::query(UPDATE_STATUS_SQL)
                    .bind(status.as_str())
                    .bind(read_at)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update contact submission status")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(UPDATE_STATUS_SQL)
                    .bind(status.as_str())
                    .bind(read_at)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update contact submission status")?;
            }
        }
        self.get_by_id(id).await
    }
}

fn parse_status(raw: String) -> Result<ContactStatus> {
    raw.parse().map_err(anyhow::Error::msg)
}

fn row_to_submission_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<ContactSubmission> {
    Ok(ContactSubmission {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        subject: row.try_get("subject")?,
        message: row.try_get("message")?,
        status: parse_status(row.try_get("status")?)?,
        read_at: row.try_get("read_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_submission_mysql(row: &sqlx::mysql::MySqlRow) -> Result<ContactSubmission> {
    Ok(ContactSubmission {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        subject: row.try_get("subject")?,
        message: row.try_get("message")?,
        status: parse_status(row.try_get("status")?)?,
        read_at: row.try_get("read_at")?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// JSON file implementation
// ============================================================================

/// Contact repository over `contact.json`
pub struct JsonContactRepository {
    collection: JsonCollection<ContactSubmission>,
}

impl JsonContactRepository {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            collection: JsonCollection::new(data_dir, "contact.json"),
        }
    }

    pub fn boxed(data_dir: impl AsRef<Path>) -> Arc<dyn ContactRepository> {
        Arc::new(Self::new(data_dir))
    }
}

#[async_trait]
impl ContactRepository for JsonContactRepository {
    async fn create(&self, input: &NewContactSubmission<'_>) -> Result<ContactSubmission> {
        let created = self
            .collection
            .modify(|submissions| {
                let submission = ContactSubmission {
                    id: submissions.iter().map(|s| s.id).max().unwrap_or(0) + 1,
                    name: input.name.to_string(),
                    email: input.email.to_string(),
                    subject: input.subject.map(str::to_string),
                    message: input.message.to_string(),
                    status: ContactStatus::New,
                    read_at: None,
                    created_at: Utc::now(),
                };
                submissions.push(submission.clone());
                Some(submission)
            })
            .await?;

        created.context("Contact submission was not stored")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ContactSubmission>> {
        let submissions = self.collection.read_all().await?;
        Ok(submissions.into_iter().find(|s| s.id == id))
    }

    async fn list(&self) -> Result<Vec<ContactSubmission>> {
        let mut submissions = self.collection.read_all().await?;
        submissions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(submissions)
    }

    async fn update_status(
        &self,
        id: i64,
        status: ContactStatus,
        read_at: Option<DateTime<Utc>>,
    ) -> Result<Option<ContactSubmission>> {
        self.collection
            .modify(|submissions| {
                let submission = submissions.iter_mut().find(|s| s.id == id)?;
                submission.status = status;
                if submission.read_at.is_none() {
                    submission.read_at = read_at;
                }
                Some(submission.clone())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;
    use tempfile::TempDir;

    async fn exercise(repo: &dyn ContactRepository) {
        let first = repo
            .create(&NewContactSubmission {
                name: "Piet",
                email: "piet@example.nl",
                subject: Some("Workshop"),
                message: "Wanneer is de volgende workshop?",
            })
            .await
            .unwrap();
        assert_eq!(first.status, ContactStatus::New);
        assert!(first.read_at.is_none());

        let second = repo
            .create(&NewContactSubmission {
                name: "Sara",
                email: "sara@example.nl",
                subject: None,
                message: "Mooi werk!",
            })
            .await
            .unwrap();
        assert_ne!(first.id, second.id);

        let read_at = Utc::now() - Duration::minutes(5);
        let updated = repo
            .update_status(first.id, ContactStatus::Read, Some(read_at))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, ContactStatus::Read);
        assert_eq!(updated.read_at, Some(read_at));

        let replied = repo
            .update_status(first.id, ContactStatus::Replied, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(replied.status, ContactStatus::Replied);
        assert_eq!(replied.read_at, Some(read_at));

        let reread = repo
            .update_status(first.id, ContactStatus::Read, Some(Utc::now()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reread.read_at, Some(read_at));

        assert!(repo
            .update_status(9999, ContactStatus::Archived, None)
            .await
            .unwrap()
            .is_none());

        let listed = repo.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(repo.get_by_id(second.id).await.unwrap().unwrap().subject, None);
    }

    #[tokio::test]
    async fn test_sqlx_contact_repository() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        exercise(&SqlxContactRepository::new(pool)).await;
    }

    #[tokio::test]
    async fn test_json_contact_repository() {
        let dir = TempDir::new().unwrap();
        exercise(&JsonContactRepository::new(dir.path())).await;
    }
}
