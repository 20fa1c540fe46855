//! Data models
//!
//! This module contains the data structures shared by the storage, service and
//! API layers:
//! - Stored entities (Artwork, OrderRequest, NewsletterSubscription,
//!   ContactSubmission, AdminSession)
//! - API request types, which keep required fields optional so handlers can
//!   answer with the studio's own validation messages

mod artwork;
mod contact;
mod newsletter;
mod order;
mod session;

pub use artwork::{Artwork, ArtworkCategory, ArtworkPatch, CreateArtworkInput, ProductType};
pub use contact::{ContactInput, ContactStatus, ContactSubmission, UpdateContactStatusInput};
pub use newsletter::{NewsletterSubscription, SubscribeInput, SubscriptionStatus};
pub use order::{ContactInfo, ContactInfoInput, CreateOrderInput, OrderOptions, OrderRequest, OrderType};
pub use session::{AdminSession, SessionInfo};

use serde::{Deserialize, Deserializer};

/// Deserialize a field that distinguishes "absent" from explicit `null`.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`: an absent
/// field stays `None`, `null` becomes `Some(None)`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Deserialize an optional text field where any non-string JSON value counts
/// as missing.
///
/// Use with `#[serde(default, deserialize_with = "string_or_none")]` so the
/// service answers `{"email": 42}` with its own "is required" message.
pub(crate) fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}
