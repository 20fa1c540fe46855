//! Contact form service

use crate::db::repositories::{ContactRepository, NewContactSubmission};
use crate::models::{ContactInput, ContactStatus, ContactSubmission};
use crate::services::validation::{is_valid_email, non_blank, trimmed};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Error types for contact operations
#[derive(Debug, thiserror::Error)]
pub enum ContactServiceError {
    /// Submission not found
    #[error("Contact submission not found: {0}")]
    NotFound(i64),

    /// Validation error
    #[error("{0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Contact form service
pub struct ContactService {
    repo: Arc<dyn ContactRepository>,
}

impl ContactService {
    pub fn new(repo: Arc<dyn ContactRepository>) -> Self {
        Self { repo }
    }

    /// Validate and store a contact form submission
    pub async fn create(&self, input: ContactInput) -> Result<ContactSubmission, ContactServiceError> {
        let name = non_blank(input.name.as_deref()).ok_or_else(|| {
            ContactServiceError::ValidationError("Name is required and must be a string".to_string())
        })?;
        let email = non_blank(input.email.as_deref()).ok_or_else(|| {
            ContactServiceError::ValidationError("Email is required and must be a string".to_string())
        })?;
        let message = non_blank(input.message.as_deref()).ok_or_else(|| {
            ContactServiceError::ValidationError("Message is required and cannot be empty".to_string())
        })?;
        if !is_valid_email(email) {
            return Err(ContactServiceError::ValidationError(
                "Invalid email format".to_string(),
            ));
        }
        let subject = trimmed(input.subject.as_deref());

        let created = self
            .repo
            .create(&NewContactSubmission {
                name: name.trim(),
                email,
                subject: subject.as_deref(),
                message: message.trim(),
            })
            .await
            .context("Failed to store contact submission")?;
        tracing::info!("New contact submission {}", created.id);
        Ok(created)
    }

    /// All submissions, newest first
    pub async fn list(&self) -> Result<Vec<ContactSubmission>, ContactServiceError> {
        Ok(self
            .repo
            .list()
            .await
            .context("Failed to list contact submissions")?)
    }

    pub async fn get(&self, id: i64) -> Result<ContactSubmission, ContactServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get contact submission")?
            .ok_or(ContactServiceError::NotFound(id))
    }

    /// Change the status of a submission.
    ///
    /// Moving to `read` stamps `read_at` the first time only.
    pub async fn update_status(
        &self,
        id: i64,
        status: Option<&str>,
    ) -> Result<ContactSubmission, ContactServiceError> {
        let status = Self::parse_status(status)?;

        let read_at = (status == ContactStatus::Read).then(Utc::now);
        self.repo
            .update_status(id, status, read_at)
            .await
            .context("Failed to update contact submission status")?
            .ok_or(ContactServiceError::NotFound(id))
    }

    /// Parse a requested status, rejecting unknown or missing values
    pub fn parse_status(status: Option<&str>) -> Result<ContactStatus, ContactServiceError> {
        status
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| ContactServiceError::ValidationError("Invalid status".to_string()))
    }

    pub async fn mark_as_read(&self, id: i64) -> Result<ContactSubmission, ContactServiceError> {
        self.update_status(id, Some(ContactStatus::Read.as_str())).await
    }
}
