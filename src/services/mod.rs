//! Services layer - Business logic
//!
//! Services validate input, apply the studio's rules and coordinate the
//! repositories, the digital file store and outgoing email.

pub mod admin_auth;
pub mod artwork;
pub mod contact;
pub mod dashboard;
pub mod digital_file;
pub mod email;
pub mod newsletter;
pub mod order;
pub mod password;
pub mod rate_limiter;
pub mod validation;

pub use admin_auth::{AdminAuthError, AdminAuthService};
pub use artwork::{ArtworkService, ArtworkServiceError, DigitalDownload};
pub use contact::{ContactService, ContactServiceError};
pub use dashboard::{DashboardService, DashboardStats};
pub use digital_file::{DigitalFileError, DigitalFileStore};
pub use email::EmailService;
pub use newsletter::{NewsletterService, NewsletterServiceError};
pub use order::{OrderService, OrderServiceError};
pub use password::{hash_password, verify_password};
pub use rate_limiter::{RateLimitDecision, RateLimiter};
pub use validation::is_valid_email;
