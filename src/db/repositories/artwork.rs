//! Artwork repository
//!
//! Storage operations for gallery artworks.
//!
//! This module provides:
//! - `ArtworkRepository` trait defining the interface for artwork data access
//! - `SqlxArtworkRepository` implementing the trait for SQLite and MySQL
//! - `JsonArtworkRepository` implementing the trait over `artworks.json`

use crate::db::{Backend, DynDatabasePool, JsonCollection};
use crate::models::{Artwork, ProductType};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::path::Path;
use std::sync::Arc;

/// Artwork repository trait
#[async_trait]
pub trait ArtworkRepository: Send + Sync {
    /// List all artworks, newest first
    async fn list(&self) -> Result<Vec<Artwork>>;

    /// Get artwork by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<Artwork>>;

    /// Store a new artwork
    async fn create(&self, artwork: &Artwork) -> Result<Artwork>;

    /// Replace a stored artwork. Returns `None` if it does not exist.
    async fn update(&self, artwork: &Artwork) -> Result<Option<Artwork>>;

    /// Delete an artwork. Returns whether it existed.
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// SQLx-based artwork repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxArtworkRepository {
    pool: DynDatabasePool,
}

impl SqlxArtworkRepository {
    /// Create a new SQLx artwork repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArtworkRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArtworkRepository for SqlxArtworkRepository {
    async fn list(&self) -> Result<Vec<Artwork>> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => list_artworks_sqlite(pool).await,
            Backend::Mysql(pool) => list_artworks_mysql(pool).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Artwork>> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => get_artwork_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_artwork_mysql(pool, id).await,
        }
    }

    async fn create(&self, artwork: &Artwork) -> Result<Artwork> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => create_artwork_sqlite(pool, artwork).await,
            Backend::Mysql(pool) => create_artwork_mysql(pool, artwork).await,
        }
    }

    async fn update(&self, artwork: &Artwork) -> Result<Option<Artwork>> {
        let affected = match self.pool.backend()? {
            Backend::Sqlite(pool) => update_artwork_sqlite(pool, artwork).await?,
            Backend::Mysql(pool) => update_artwork_mysql(pool, artwork).await?,
        };
        if affected > 0 {
            return Ok(Some(artwork.clone()));
        }
        // MySQL reports 0 affected rows when nothing changed, so confirm existence.
        Ok(self.get_by_id(&artwork.id).await?.map(|_| artwork.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let affected = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(DELETE_SQL)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete artwork")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(DELETE_SQL)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete artwork")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, title, image, category, description, available, rotation,
           available_products, digital_file, created_at, updated_at
    FROM artworks
"#;

const INSERT_SQL: &str = r#"
    INSERT INTO artworks (id, title, image, category, description, available, rotation,
                          available_products, digital_file, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_SQL: &str = r#"
    UPDATE artworks
    SET title = ?, image = ?, category = ?, description = ?, available = ?, rotation = ?,
        available_products = ?, digital_file = ?, updated_at = ?
    WHERE id = ?
"#;

const DELETE_SQL: &str = "DELETE FROM artworks WHERE id = ?";

/// Encode the product list as the JSON text stored in `available_products`
pub(crate) fn encode_products(products: &Option<Vec<ProductType>>) -> Result<Option<String>> {
    products
        .as_ref()
        .map(|p| serde_json::to_string(p).context("Failed to encode available products"))
        .transpose()
}

fn decode_products(raw: Option<String>) -> Result<Option<Vec<ProductType>>> {
    match raw {
        Some(text) if !text.trim().is_empty() => Ok(Some(
            serde_json::from_str(&text).context("Invalid available_products column")?,
        )),
        _ => Ok(None),
    }
}

fn parse_category(raw: String) -> Result<crate::models::ArtworkCategory> {
    raw.parse().map_err(anyhow::Error::msg)
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_artworks_sqlite(pool: &SqlitePool) -> Result<Vec<Artwork>> {
    let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC"))
        .fetch_all(pool)
        .await
        .context("Failed to list artworks")?;

    rows.iter().map(row_to_artwork_sqlite).collect()
}

async fn get_artwork_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<Artwork>> {
    let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get artwork by ID")?;

    row.as_ref().map(row_to_artwork_sqlite).transpose()
}

async fn create_artwork_sqlite(pool: &SqlitePool, artwork: &Artwork) -> Result<Artwork> {
    sqlx::query(INSERT_SQL)
        .bind(&artwork.id)
        .bind(&artwork.title)
        .bind(&artwork.image)
        .bind(artwork.category.as_str())
        .bind(&artwork.description)
        .bind(artwork.available)
        .bind(artwork.rotation)
        .bind(encode_products(&artwork.available_products)?)
        .bind(&artwork.digital_file)
        .bind(artwork.created_at)
        .bind(artwork.updated_at)
        .execute(pool)
        .await
        .context("Failed to create artwork")?;

    Ok(artwork.clone())
}

async fn update_artwork_sqlite(pool: &SqlitePool, artwork: &Artwork) -> Result<u64> {
    let result = sqlx::query(UPDATE_SQL)
        .bind(&artwork.title)
        .bind(&artwork.image)
        .bind(artwork.category.as_str())
        .bind(&artwork.description)
        .bind(artwork.available)
        .bind(artwork.rotation)
        .bind(encode_products(&artwork.available_products)?)
        .bind(&artwork.digital_file)
        .bind(artwork.updated_at)
        .bind(&artwork.id)
        .execute(pool)
        .await
        .context("Failed to update artwork")?;

    Ok(result.rows_affected())
}

fn row_to_artwork_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Artwork> {
    Ok(Artwork {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        image: row.try_get("image")?,
        category: parse_category(row.try_get("category")?)?,
        description: row.try_get("description")?,
        available: row.try_get("available")?,
        rotation: row.try_get("rotation")?,
        available_products: decode_products(row.try_get("available_products")?)?,
        digital_file: row.try_get("digital_file")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_artworks_mysql(pool: &MySqlPool) -> Result<Vec<Artwork>> {
    let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC"))
        .fetch_all(pool)
        .await
        .context("Failed to list artworks")?;

    rows.iter().map(row_to_artwork_mysql).collect()
}

async fn get_artwork_mysql(pool: &MySqlPool, id: &str) -> Result<Option<Artwork>> {
    let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get artwork by ID")?;

    row.as_ref().map(row_to_artwork_mysql).transpose()
}

async fn create_artwork_mysql(pool: &MySqlPool, artwork: &Artwork) -> Result<Artwork> {
    sqlx::query(INSERT_SQL)
        .bind(&artwork.id)
        .bind(&artwork.title)
        .bind(&artwork.image)
        .bind(artwork.category.as_str())
        .bind(&artwork.description)
        .bind(artwork.available)
        .bind(artwork.rotation)
        .bind(encode_products(&artwork.available_products)?)
        .bind(&artwork.digital_file)
        .bind(artwork.created_at)
        .bind(artwork.updated_at)
        .execute(pool)
        .await
        .context("Failed to create artwork")?;

    Ok(artwork.clone())
}

async fn update_artwork_mysql(pool: &MySqlPool, artwork: &Artwork) -> Result<u64> {
    let result = sqlx::query(UPDATE_SQL)
        .bind(&artwork.title)
        .bind(&artwork.image)
        .bind(artwork.category.as_str())
        .bind(&artwork.description)
        .bind(artwork.available)
        .bind(artwork.rotation)
        .bind(encode_products(&artwork.available_products)?)
        .bind(&artwork.digital_file)
        .bind(artwork.updated_at)
        .bind(&artwork.id)
        .execute(pool)
        .await
        .context("Failed to update artwork")?;

    Ok(result.rows_affected())
}

fn row_to_artwork_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Artwork> {
    Ok(Artwork {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        image: row.try_get("image")?,
        category: parse_category(row.try_get("category")?)?,
        description: row.try_get("description")?,
        available: row.try_get("available")?,
        rotation: row.try_get("rotation")?,
        available_products: decode_products(row.try_get("available_products")?)?,
        digital_file: row.try_get("digital_file")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// JSON file implementation
// ============================================================================

/// Artwork repository over `artworks.json`
pub struct JsonArtworkRepository {
    collection: JsonCollection<Artwork>,
}

impl JsonArtworkRepository {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            collection: JsonCollection::new(data_dir, "artworks.json"),
        }
    }

    pub fn boxed(data_dir: impl AsRef<Path>) -> Arc<dyn ArtworkRepository> {
        Arc::new(Self::new(data_dir))
    }
}

#[async_trait]
impl ArtworkRepository for JsonArtworkRepository {
    async fn list(&self) -> Result<Vec<Artwork>> {
        let mut artworks = self.collection.read_all().await?;
        artworks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(artworks)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Artwork>> {
        let artworks = self.collection.read_all().await?;
        Ok(artworks.into_iter().find(|a| a.id == id))
    }

    async fn create(&self, artwork: &Artwork) -> Result<Artwork> {
        let artwork = artwork.clone();
        self.collection
            .modify(|artworks| {
                artworks.push(artwork.clone());
                Some(())
            })
            .await?;
        Ok(artwork)
    }

    async fn update(&self, artwork: &Artwork) -> Result<Option<Artwork>> {
        self.collection
            .modify(|artworks| {
                let existing = artworks.iter_mut().find(|a| a.id == artwork.id)?;
                *existing = artwork.clone();
                Some(artwork.clone())
            })
            .await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let removed = self
            .collection
            .modify(|artworks| {
                let index = artworks.iter().position(|a| a.id == id)?;
                artworks.remove(index);
                Some(())
            })
            .await?;
        Ok(removed.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::ArtworkCategory;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn sample(id: &str, age_minutes: i64) -> Artwork {
        let created = Utc::now() - Duration::minutes(age_minutes);
        Artwork {
            id: id.to_string(),
            title: format!("Plankje {id}"),
            image: format!("/images/{id}.jpg"),
            category: ArtworkCategory::Combinatie,
            description: Some("Hout en tekst".to_string()),
            available: true,
            rotation: Some(-2.5),
            available_products: Some(vec![ProductType::Poster, ProductType::ToteBag]),
            digital_file: None,
            created_at: created,
            updated_at: created,
        }
    }

    async fn sqlx_repo() -> SqlxArtworkRepository {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool).await.expect("Failed to migrate");
        SqlxArtworkRepository::new(pool)
    }

    async fn exercise(repo: &dyn ArtworkRepository) {
        repo.create(&sample("old", 60)).await.unwrap();
        repo.create(&sample("new", 1)).await.unwrap();

        let listed = repo.list().await.unwrap();
        assert_eq!(
            listed.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(),
            vec!["new", "old"]
        );

        let fetched = repo.get_by_id("old").await.unwrap().unwrap();
        assert_eq!(fetched.available_products, Some(vec![ProductType::Poster, ProductType::ToteBag]));
        assert_eq!(fetched.rotation, Some(-2.5));

        let mut changed = fetched.clone();
        changed.title = "Nieuwe titel".to_string();
        changed.description = None;
        changed.digital_file = Some("old_1.png".to_string());
        assert!(repo.update(&changed).await.unwrap().is_some());

        let fetched = repo.get_by_id("old").await.unwrap().unwrap();
        assert_eq!(fetched.title, "Nieuwe titel");
        assert!(fetched.description.is_none());
        assert_eq!(fetched.digital_file.as_deref(), Some("old_1.png"));

        assert!(repo.update(&sample("ghost", 0)).await.unwrap().is_none());

        assert!(repo.delete("old").await.unwrap());
        assert!(!repo.delete("old").await.unwrap());
        assert!(repo.get_by_id("old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlx_artwork_repository() {
        let repo = sqlx_repo().await;
        exercise(&repo).await;
    }

    #[tokio::test]
    async fn test_json_artwork_repository() {
        let dir = TempDir::new().unwrap();
        let repo = JsonArtworkRepository::new(dir.path());
        exercise(&repo).await;
        assert!(dir.path().join("artworks.json").exists());
    }

    #[tokio::test]
    async fn test_sqlx_update_without_changes_still_found() {
        let repo = sqlx_repo().await;
        let artwork = sample("same", 5);
        repo.create(&artwork).await.unwrap();

        let result = repo.update(&artwork).await.unwrap();
        assert_eq!(result, Some(artwork));
    }
}
