//! Storage for production-ready digital artwork files
//!
//! Files live flat in the configured upload directory and are named
//! `{artworkId}_{unixMillis}{ext}`. Only names produced by this module are
//! ever resolved, so paths from stored records cannot escape the directory.

use crate::config::UploadConfig;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Digital file errors
#[derive(Debug, thiserror::Error)]
pub enum DigitalFileError {
    /// Neither the MIME type nor the extension is accepted
    #[error("Bestandstype niet toegestaan. Toegestane types: PNG, JPG, SVG, PDF, AI, EPS")]
    TypeNotAllowed,

    /// Upload exceeds the size limit (in MB)
    #[error("Bestand is te groot. Maximum grootte: {0}MB")]
    TooLarge(u64),

    /// Stored name is not a plain file name
    #[error("Invalid digital file name: {0}")]
    InvalidName(String),

    /// Recorded on the artwork but absent from disk
    #[error("Bestand niet gevonden op server")]
    Missing,

    #[error("Digital file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Digital file store rooted at the upload directory
pub struct DigitalFileStore {
    config: UploadConfig,
}

impl DigitalFileStore {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    /// Largest accepted upload in bytes
    pub fn max_file_size(&self) -> u64 {
        self.config.max_file_size
    }

    /// Check type and size of an incoming upload.
    ///
    /// A file passes when either its declared MIME type or its extension is
    /// on the allow list.
    pub fn check_upload(
        &self,
        original_name: &str,
        content_type: &str,
        size: u64,
    ) -> Result<(), DigitalFileError> {
        let ext = extension_of(original_name);
        if !self.config.is_type_allowed(content_type) && !self.config.is_extension_allowed(&ext) {
            return Err(DigitalFileError::TypeNotAllowed);
        }
        if size > self.config.max_file_size {
            return Err(self.too_large());
        }
        Ok(())
    }

    pub fn too_large(&self) -> DigitalFileError {
        DigitalFileError::TooLarge(self.config.max_file_size / 1024 / 1024)
    }

    /// Write an accepted upload, returning the stored file name
    pub async fn save(
        &self,
        artwork_id: &str,
        original_name: &str,
        data: &[u8],
    ) -> Result<String, DigitalFileError> {
        let name = stored_name(artwork_id, original_name, Utc::now().timestamp_millis());
        fs::create_dir_all(&self.config.path).await?;
        fs::write(self.config.path.join(&name), data).await?;
        tracing::info!("Stored digital file {} ({} bytes)", name, data.len());
        Ok(name)
    }

    /// Read a stored file
    pub async fn read(&self, name: &str) -> Result<Vec<u8>, DigitalFileError> {
        let path = self.resolve(name)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(DigitalFileError::Missing),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a stored file. A file that is already gone is not an error.
    pub async fn delete(&self, name: &str) -> Result<bool, DigitalFileError> {
        let path = self.resolve(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a file, only logging failures
    pub async fn delete_quietly(&self, name: &str) {
        if let Err(e) = self.delete(name).await {
            tracing::warn!("Failed to delete digital file {}: {}", name, e);
        }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, DigitalFileError> {
        let plain = !name.is_empty()
            && !name.contains(['/', '\\'])
            && name != "."
            && !name.contains("..");
        if !plain {
            return Err(DigitalFileError::InvalidName(name.to_string()));
        }
        Ok(self.config.path.join(name))
    }
}

/// Lowercased extension including the dot, or empty
fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

/// `{artworkId}_{millis}{ext}` with the artwork id reduced to safe characters
pub fn stored_name(artwork_id: &str, original_name: &str, millis: i64) -> String {
    let id: String = artwork_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_{}{}", id, millis, extension_of(original_name))
}

/// Download content type by extension
pub fn content_type_for(name: &str) -> &'static str {
    match extension_of(name).as_str() {
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".svg" => "image/svg+xml",
        ".pdf" => "application/pdf",
        ".ai" | ".eps" => "application/postscript",
        _ => "application/octet-stream",
    }
}
