//! Artwork service
//!
//! Gallery management plus the digital production file attached to an
//! artwork. Deleting an artwork or replacing its file removes the old file
//! from disk; failures to unlink are logged and otherwise ignored.

use crate::db::repositories::ArtworkRepository;
use crate::models::{Artwork, ArtworkCategory, ArtworkPatch, CreateArtworkInput};
use crate::services::digital_file::{content_type_for, DigitalFileError, DigitalFileStore};
use crate::services::validation::non_blank;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Error types for artwork service operations
#[derive(Debug, thiserror::Error)]
pub enum ArtworkServiceError {
    /// Artwork not found
    #[error("Artwork not found: {0}")]
    NotFound(String),

    /// Artwork exists but has no digital file
    #[error("Artwork has no digital file: {0}")]
    NoDigitalFile(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Digital file rejected or unreadable
    #[error(transparent)]
    DigitalFile(#[from] DigitalFileError),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A digital file ready for download
#[derive(Debug, Clone)]
pub struct DigitalDownload {
    pub file_name: String,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

/// Artwork service
pub struct ArtworkService {
    repo: Arc<dyn ArtworkRepository>,
    files: Arc<DigitalFileStore>,
}

impl ArtworkService {
    pub fn new(repo: Arc<dyn ArtworkRepository>, files: Arc<DigitalFileStore>) -> Self {
        Self { repo, files }
    }

    /// All artworks, newest first
    pub async fn list(&self) -> Result<Vec<Artwork>, ArtworkServiceError> {
        Ok(self.repo.list().await.context("Failed to list artworks")?)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Artwork>, ArtworkServiceError> {
        Ok(self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get artwork")?)
    }

    /// Create an artwork. Title, image and category are required; availability
    /// defaults to true.
    pub async fn create(&self, input: CreateArtworkInput) -> Result<Artwork, ArtworkServiceError> {
        let (Some(title), Some(image), Some(category)) = (
            non_blank(input.title.as_deref()),
            non_blank(input.image.as_deref()),
            non_blank(input.category.as_deref()),
        ) else {
            return Err(ArtworkServiceError::ValidationError(
                "Title, image, and category are required".to_string(),
            ));
        };
        let category = parse_category(category)?;

        let now = Utc::now();
        let artwork = Artwork {
            id: Uuid::new_v4().simple().to_string(),
            title: title.trim().to_string(),
            image: image.trim().to_string(),
            category,
            description: input.description,
            available: input.available.unwrap_or(true),
            rotation: input.rotation,
            available_products: input.available_products,
            digital_file: None,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .repo
            .create(&artwork)
            .await
            .context("Failed to create artwork")?;
        tracing::info!("Created artwork {} ({})", created.id, created.title);
        Ok(created)
    }

    /// Apply a partial update. Absent fields are kept; `null` clears optional
    /// fields. `updatedAt` is always refreshed.
    pub async fn update(&self, id: &str, patch: ArtworkPatch) -> Result<Artwork, ArtworkServiceError> {
        let mut artwork = self
            .get(id)
            .await?
            .ok_or_else(|| ArtworkServiceError::NotFound(id.to_string()))?;

        if let Some(title) = patch.title {
            artwork.title = required(title, "Title")?;
        }
        if let Some(image) = patch.image {
            artwork.image = required(image, "Image")?;
        }
        if let Some(category) = patch.category {
            artwork.category = parse_category(&category)?;
        }
        if let Some(description) = patch.description {
            artwork.description = description;
        }
        if let Some(available) = patch.available {
            artwork.available = available;
        }
        if let Some(rotation) = patch.rotation {
            artwork.rotation = rotation;
        }
        if let Some(products) = patch.available_products {
            artwork.available_products = products;
        }

        self.save(artwork).await
    }

    /// Delete an artwork and its digital file
    pub async fn delete(&self, id: &str) -> Result<(), ArtworkServiceError> {
        let artwork = self
            .get(id)
            .await?
            .ok_or_else(|| ArtworkServiceError::NotFound(id.to_string()))?;

        let deleted = self
            .repo
            .delete(id)
            .await
            .context("Failed to delete artwork")?;
        if !deleted {
            return Err(ArtworkServiceError::NotFound(id.to_string()));
        }

        if let Some(file) = &artwork.digital_file {
            self.files.delete_quietly(file).await;
        }
        tracing::info!("Deleted artwork {}", id);
        Ok(())
    }

    /// Store an uploaded digital file and attach it to the artwork, replacing
    /// (and removing) any previous file. Returns the stored name.
    pub async fn attach_digital_file(
        &self,
        id: &str,
        original_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<(String, Artwork), ArtworkServiceError> {
        self.files
            .check_upload(original_name, content_type, data.len() as u64)?;

        let mut artwork = self
            .get(id)
            .await?
            .ok_or_else(|| ArtworkServiceError::NotFound(id.to_string()))?;
        let previous = artwork.digital_file.take();

        let name = self.files.save(id, original_name, data).await?;
        artwork.digital_file = Some(name.clone());

        let updated = match self.save(artwork).await {
            Ok(updated) => updated,
            Err(e) => {
                self.files.delete_quietly(&name).await;
                return Err(e);
            }
        };

        if let Some(previous) = previous.filter(|p| *p != name) {
            self.files.delete_quietly(&previous).await;
        }
        Ok((name, updated))
    }

    /// Load the digital file of an artwork
    pub async fn digital_file(&self, id: &str) -> Result<DigitalDownload, ArtworkServiceError> {
        let file_name = self.digital_file_name(id).await?;
        let data = self.files.read(&file_name).await?;
        Ok(DigitalDownload {
            content_type: content_type_for(&file_name),
            file_name,
            data,
        })
    }

    /// Remove the digital file from disk and from the artwork
    pub async fn remove_digital_file(&self, id: &str) -> Result<Artwork, ArtworkServiceError> {
        let file_name = self.digital_file_name(id).await?;
        self.files.delete_quietly(&file_name).await;

        let mut artwork = self
            .get(id)
            .await?
            .ok_or_else(|| ArtworkServiceError::NotFound(id.to_string()))?;
        artwork.digital_file = None;
        self.save(artwork).await
    }

    async fn digital_file_name(&self, id: &str) -> Result<String, ArtworkServiceError> {
        self.get(id)
            .await?
            .and_then(|artwork| artwork.digital_file)
            .ok_or_else(|| ArtworkServiceError::NoDigitalFile(id.to_string()))
    }

    async fn save(&self, mut artwork: Artwork) -> Result<Artwork, ArtworkServiceError> {
        artwork.updated_at = Utc::now();
        let id = artwork.id.clone();
        self.repo
            .update(&artwork)
            .await
            .context("Failed to update artwork")?
            .ok_or(ArtworkServiceError::NotFound(id))
    }
}

fn parse_category(raw: &str) -> Result<ArtworkCategory, ArtworkServiceError> {
    raw.trim()
        .parse()
        .map_err(ArtworkServiceError::ValidationError)
}

fn required(value: String, field: &str) -> Result<String, ArtworkServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ArtworkServiceError::ValidationError(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(value.to_string())
}
