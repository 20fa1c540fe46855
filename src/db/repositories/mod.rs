//! Repositories
//!
//! One trait per entity with a SQL implementation (SQLite and MySQL), a JSON
//! file (or in-memory) implementation, and the [`Fallback`] wrapper that ties
//! the two together.

pub mod artwork;
pub mod contact;
pub mod fallback;
pub mod newsletter;
pub mod order;
pub mod session;

pub use artwork::{ArtworkRepository, JsonArtworkRepository, SqlxArtworkRepository};
pub use contact::{ContactRepository, JsonContactRepository, NewContactSubmission, SqlxContactRepository};
pub use fallback::Fallback;
pub use newsletter::{JsonNewsletterRepository, NewsletterRepository, SqlxNewsletterRepository};
pub use order::{JsonOrderRepository, OrderRepository, SqlxOrderRepository};
pub use session::{MemorySessionRepository, SessionRepository, SqlxSessionRepository};
