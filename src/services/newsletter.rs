//! Newsletter subscription service

use crate::db::repositories::NewsletterRepository;
use crate::models::NewsletterSubscription;
use crate::services::validation::{is_valid_email, trimmed};
use anyhow::Context;
use std::sync::Arc;

/// Error types for newsletter operations
#[derive(Debug, thiserror::Error)]
pub enum NewsletterServiceError {
    /// Validation error
    #[error("{0}")]
    ValidationError(String),

    /// Storage is reachable but its schema is missing
    #[error("Database configuration error. Please contact the administrator.")]
    StorageConfiguration(#[source] anyhow::Error),

    /// Storage could not be reached
    #[error("Database connection error. Please contact the administrator.")]
    StorageConnection(#[source] anyhow::Error),

    /// Internal error
    #[error("{0}")]
    InternalError(#[from] anyhow::Error),
}

impl NewsletterServiceError {
    /// Sort a storage failure into a configuration, connection or generic error
    pub fn classify(error: anyhow::Error) -> Self {
        let text = format!("{:#}", error).to_lowercase();
        if text.contains("table") && (text.contains("doesn't exist") || text.contains("no such table")) {
            Self::StorageConfiguration(error)
        } else if text.contains("connection") || text.contains("access denied") {
            Self::StorageConnection(error)
        } else {
            Self::InternalError(error)
        }
    }
}

/// Newsletter service
pub struct NewsletterService {
    repo: Arc<dyn NewsletterRepository>,
}

impl NewsletterService {
    pub fn new(repo: Arc<dyn NewsletterRepository>) -> Self {
        Self { repo }
    }

    /// Subscribe an address.
    ///
    /// An active subscription is returned unchanged. An unsubscribed address is
    /// reactivated, keeping its old name when no new one is given.
    pub async fn subscribe(
        &self,
        email: Option<&str>,
        name: Option<&str>,
    ) -> Result<NewsletterSubscription, NewsletterServiceError> {
        let email = email.filter(|e| !e.is_empty()).ok_or_else(|| {
            NewsletterServiceError::ValidationError(
                "Email is required and must be a string".to_string(),
            )
        })?;
        if !is_valid_email(email) {
            return Err(NewsletterServiceError::ValidationError(
                "Invalid email format".to_string(),
            ));
        }
        let name = trimmed(name);

        self.subscribe_valid(email, name.as_deref())
            .await
            .map_err(NewsletterServiceError::classify)
    }

    async fn subscribe_valid(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> anyhow::Result<NewsletterSubscription> {
        if let Some(existing) = self
            .repo
            .get_by_email(email)
            .await
            .context("Failed to look up subscription")?
        {
            if existing.is_active() {
                return Ok(existing);
            }
            tracing::info!("Reactivating newsletter subscription {}", existing.id);
            return self
                .repo
                .reactivate(email, name)
                .await
                .context("Failed to reactivate subscription")?
                .context("Failed to reactivate subscription");
        }

        let created = self
            .repo
            .create(email, name)
            .await
            .context("Failed to create subscription")?;
        tracing::info!("New newsletter subscription {}", created.id);
        Ok(created)
    }

    /// Unsubscribe an active address. Returns whether anything changed.
    pub async fn unsubscribe(&self, email: Option<&str>) -> Result<bool, NewsletterServiceError> {
        let email = email.filter(|e| !e.is_empty()).ok_or_else(|| {
            NewsletterServiceError::ValidationError(
                "Email is required and must be a string".to_string(),
            )
        })?;
        self.repo
            .unsubscribe(email)
            .await
            .context("Failed to unsubscribe")
            .map_err(NewsletterServiceError::classify)
    }

    /// Every subscription, newest first
    pub async fn list_all(&self) -> Result<Vec<NewsletterSubscription>, NewsletterServiceError> {
        Ok(self
            .repo
            .list_all()
            .await
            .context("Failed to list subscriptions")?)
    }

    /// Active subscriptions, newest first
    pub async fn list_active(&self) -> Result<Vec<NewsletterSubscription>, NewsletterServiceError> {
        Ok(self
            .repo
            .list_active()
            .await
            .context("Failed to list active subscriptions")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{JsonNewsletterRepository, SqlxNewsletterRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::SubscriptionStatus;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> NewsletterService {
        NewsletterService::new(JsonNewsletterRepository::boxed(dir.path()))
    }

    #[tokio::test]
    async fn test_subscribe_validation() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let err = service.subscribe(None, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Email is required and must be a string");
        let err = service.subscribe(Some("nope"), None).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email format");

        // Surrounding whitespace is not stripped
        let err = service
            .subscribe(Some(" els@example.nl "), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid email format");
        assert!(service.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent_and_reactivates() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let first = service
            .subscribe(Some("els@example.nl"), Some("Els"))
            .await
            .unwrap();
        let again = service
            .subscribe(Some("els@example.nl"), Some("Andere naam"))
            .await
            .unwrap();
        assert_eq!(first, again);
        assert_eq!(service.list_all().await.unwrap().len(), 1);

        assert!(service.unsubscribe(Some("els@example.nl")).await.unwrap());
        assert!(!service.unsubscribe(Some("els@example.nl")).await.unwrap());
        assert!(service.list_active().await.unwrap().is_empty());

        let back = service
            .subscribe(Some("els@example.nl"), None)
            .await
            .unwrap();
        assert_eq!(back.id, first.id);
        assert_eq!(back.status, SubscriptionStatus::Active);
        assert_eq!(back.name.as_deref(), Some("Els"));
        assert!(back.unsubscribed_at.is_none());
        assert_eq!(service.list_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_table_is_configuration_error() {
        // Unmigrated database without a fallback store
        let pool = create_test_pool().await.unwrap();
        let service = NewsletterService::new(SqlxNewsletterRepository::boxed(pool));

        let err = service
            .subscribe(Some("els@example.nl"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, NewsletterServiceError::StorageConfiguration(_)));
        assert_eq!(
            err.to_string(),
            "Database configuration error. Please contact the administrator."
        );
    }

    #[tokio::test]
    async fn test_sqlx_backed_subscribe() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let service = NewsletterService::new(SqlxNewsletterRepository::boxed(pool));

        let sub = service
            .subscribe(Some("piet@example.nl"), None)
            .await
            .unwrap();
        assert!(sub.is_active());
        let all = service.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].email, "piet@example.nl");
    }

    #[test]
    fn test_classify() {
        let conn = NewsletterServiceError::classify(anyhow::anyhow!("Connection refused"));
        assert!(matches!(conn, NewsletterServiceError::StorageConnection(_)));
        let denied = NewsletterServiceError::classify(anyhow::anyhow!("Access denied for user"));
        assert!(matches!(denied, NewsletterServiceError::StorageConnection(_)));
        let other = NewsletterServiceError::classify(anyhow::anyhow!("disk full"));
        assert_eq!(other.to_string(), "disk full");
    }
}
