//! Database-first repositories with a JSON safety net
//!
//! `Fallback<dyn Trait>` holds an optional primary (database) repository and a
//! secondary (JSON file or memory) repository. Every call goes to the primary
//! first; when it fails the error is logged and the same call is made on the
//! secondary. Without a primary the secondary serves everything.

use super::{
    ArtworkRepository, ContactRepository, NewContactSubmission, OrderRepository,
    SessionRepository,
};
use crate::models::{AdminSession, Artwork, ContactStatus, ContactSubmission, OrderRequest};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Repository wrapper that retries failed primary calls on a secondary store
pub struct Fallback<T: ?Sized> {
    primary: Option<Arc<T>>,
    secondary: Arc<T>,
}

impl<T: ?Sized> Fallback<T> {
    pub fn new(primary: Option<Arc<T>>, secondary: Arc<T>) -> Self {
        Self { primary, secondary }
    }

    /// Whether calls are tried on the database first
    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }
}

impl<T: ?Sized> Clone for Fallback<T> {
    fn clone(&self) -> Self {
        Self {
            primary: self.primary.clone(),
            secondary: self.secondary.clone(),
        }
    }
}

/// Implement a repository trait for `Fallback<dyn Trait>` by forwarding each
/// listed method. Arguments must be `Copy` (references, ids, enums).
macro_rules! impl_fallback {
    ($trait:ident, $entity:literal {
        $( async fn $method:ident(&self $(, $arg:ident : $ty:ty)* ) -> $ret:ty; )*
    }) => {
        #[async_trait]
        impl $trait for Fallback<dyn $trait> {
            $(
                async fn $method(&self $(, $arg: $ty)*) -> $ret {
                    if let Some(primary) = &self.primary {
                        match primary.$method($($arg),*).await {
                            Ok(value) => return Ok(value),
                            Err(e) => tracing::warn!(
                                "Database {} {} failed, falling back to file storage: {:#}",
                                $entity,
                                stringify!($method),
                                e
                            ),
                        }
                    }
                    self.secondary.$method($($arg),*).await
                }
            )*
        }

        impl Fallback<dyn $trait> {
            /// Wrap into a shared trait object
            pub fn shared(self) -> Arc<dyn $trait> {
                Arc::new(self)
            }
        }
    };
}

impl_fallback!(ArtworkRepository, "artwork" {
    async fn list(&self) -> Result<Vec<Artwork>>;
    async fn get_by_id(&self, id: &str) -> Result<Option<Artwork>>;
    async fn create(&self, artwork: &Artwork) -> Result<Artwork>;
    async fn update(&self, artwork: &Artwork) -> Result<Option<Artwork>>;
    async fn delete(&self, id: &str) -> Result<bool>;
});

impl_fallback!(OrderRepository, "order" {
    async fn create(&self, order: &OrderRequest) -> Result<OrderRequest>;
    async fn list(&self) -> Result<Vec<OrderRequest>>;
});

impl_fallback!(ContactRepository, "contact" {
    async fn create(&self, input: &NewContactSubmission<'_>) -> Result<ContactSubmission>;
    async fn get_by_id(&self, id: i64) -> Result<Option<ContactSubmission>>;
    async fn list(&self) -> Result<Vec<ContactSubmission>>;
    async fn update_status(&self, id: i64, status: ContactStatus, read_at: Option<DateTime<Utc>>) -> Result<Option<ContactSubmission>>;
});

impl_fallback!(SessionRepository, "session" {
    async fn create(&self, session: &AdminSession) -> Result<AdminSession>;
    async fn get_by_id(&self, id: &str) -> Result<Option<AdminSession>>;
    async fn delete(&self, id: &str) -> Result<bool>;
    async fn delete_expired(&self) -> Result<u64>;
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        JsonArtworkRepository, JsonOrderRepository, MemorySessionRepository, SqlxArtworkRepository,
        SqlxOrderRepository, SqlxSessionRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{ArtworkCategory, ContactInfo, OrderType};
    use chrono::Duration;
    use tempfile::TempDir;

    fn artwork(id: &str) -> Artwork {
        let now = Utc::now();
        Artwork {
            id: id.to_string(),
            title: "Molen".to_string(),
            image: "/img/molen.jpg".to_string(),
            category: ArtworkCategory::GrafischeKunst,
            description: None,
            available: true,
            rotation: None,
            available_products: None,
            digital_file: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_without_primary_uses_secondary() {
        let dir = TempDir::new().unwrap();
        let repo: Arc<dyn ArtworkRepository> =
            Fallback::<dyn ArtworkRepository>::new(None, JsonArtworkRepository::boxed(dir.path()))
                .shared();

        repo.create(&artwork("a1")).await.unwrap();
        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert!(dir.path().join("artworks.json").exists());
    }

    #[tokio::test]
    async fn test_healthy_primary_is_preferred() {
        let dir = TempDir::new().unwrap();
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let repo = Fallback::<dyn ArtworkRepository>::new(
            Some(SqlxArtworkRepository::boxed(pool)),
            JsonArtworkRepository::boxed(dir.path()),
        );
        assert!(repo.has_primary());

        repo.create(&artwork("db-only")).await.unwrap();
        assert!(repo.get_by_id("db-only").await.unwrap().is_some());
        assert!(!dir.path().join("artworks.json").exists());
    }

    #[tokio::test]
    async fn test_failing_primary_falls_back_to_json() {
        let dir = TempDir::new().unwrap();
        // No migrations: every query against the primary fails.
        let pool = create_test_pool().await.unwrap();

        let repo = Fallback::<dyn OrderRepository>::new(
            Some(SqlxOrderRepository::boxed(pool)),
            JsonOrderRepository::boxed(dir.path()),
        )
        .shared();

        let order = OrderRequest {
            id: "o1".to_string(),
            artwork_id: None,
            order_type: OrderType::Custom,
            options: None,
            inspiration: Some("Een plankje voor oma".to_string()),
            contact_info: ContactInfo {
                name: "Els".to_string(),
                email: "els@example.nl".to_string(),
                phone: None,
                message: None,
            },
            created_at: Utc::now(),
        };
        repo.create(&order).await.unwrap();

        let orders = repo.list().await.unwrap();
        assert_eq!(orders, vec![order]);
        assert!(dir.path().join("orders.json").exists());
    }

    #[tokio::test]
    async fn test_session_fallback_to_memory() {
        let pool = create_test_pool().await.unwrap();
        let repo = Fallback::<dyn SessionRepository>::new(
            Some(SqlxSessionRepository::boxed(pool)),
            MemorySessionRepository::boxed(),
        )
        .shared();

        let now = Utc::now();
        let session = AdminSession {
            id: "token".to_string(),
            expires_at: now + Duration::hours(1),
            created_at: now,
        };
        repo.create(&session).await.unwrap();
        assert_eq!(repo.get_by_id("token").await.unwrap(), Some(session));
        assert!(repo.delete("token").await.unwrap());
    }
}
