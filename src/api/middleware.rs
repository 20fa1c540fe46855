//! API middleware
//!
//! Contains:
//! - `AppState` with the shared services
//! - `ApiError`, the `{ "error": message }` response type
//! - Admin session guard
//! - Per-IP rate limiting

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        ConnectInfo, Request, State,
    },
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::db::repositories::{
    ArtworkRepository, ContactRepository, Fallback, JsonArtworkRepository, JsonContactRepository,
    JsonNewsletterRepository, JsonOrderRepository, MemorySessionRepository, NewsletterRepository,
    OrderRepository, SessionRepository, SqlxArtworkRepository, SqlxContactRepository,
    SqlxNewsletterRepository, SqlxOrderRepository, SqlxSessionRepository,
};
use crate::db::DynDatabasePool;
use crate::models::AdminSession;
use crate::services::{
    AdminAuthService, ArtworkService, ContactService, DashboardService, DigitalFileStore,
    EmailService, NewsletterService, OrderService, RateLimitDecision, RateLimiter,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub artwork_service: Arc<ArtworkService>,
    pub order_service: Arc<OrderService>,
    pub newsletter_service: Arc<NewsletterService>,
    pub contact_service: Arc<ContactService>,
    pub dashboard_service: Arc<DashboardService>,
    pub admin_auth: Arc<AdminAuthService>,
    pub email_service: Arc<EmailService>,
    pub digital_files: Arc<DigitalFileStore>,
    pub api_limiter: Arc<RateLimiter>,
    pub form_limiter: Arc<RateLimiter>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire repositories and services.
    ///
    /// With a pool every repository but the newsletter tries the database
    /// first and falls back to the JSON files (sessions: to memory). The
    /// newsletter uses the database alone. Without a pool the files serve
    /// everything.
    pub fn build(config: &Config, pool: Option<DynDatabasePool>) -> anyhow::Result<Self> {
        let data_dir = &config.storage.data_dir;

        let artworks = Fallback::<dyn ArtworkRepository>::new(
            pool.clone().map(SqlxArtworkRepository::boxed),
            JsonArtworkRepository::boxed(data_dir),
        )
        .shared();
        let orders = Fallback::<dyn OrderRepository>::new(
            pool.clone().map(SqlxOrderRepository::boxed),
            JsonOrderRepository::boxed(data_dir),
        )
        .shared();
        // Newsletter storage errors are reported to the client, so it never
        // falls back
        let newsletter: Arc<dyn NewsletterRepository> = match pool.clone() {
            Some(pool) => SqlxNewsletterRepository::boxed(pool),
            None => JsonNewsletterRepository::boxed(data_dir),
        };
        let contact = Fallback::<dyn ContactRepository>::new(
            pool.clone().map(SqlxContactRepository::boxed),
            JsonContactRepository::boxed(data_dir),
        )
        .shared();
        let sessions = Fallback::<dyn SessionRepository>::new(
            pool.map(SqlxSessionRepository::boxed),
            MemorySessionRepository::boxed(),
        )
        .shared();

        let digital_files = Arc::new(DigitalFileStore::new(config.upload.clone()));

        Ok(Self {
            artwork_service: Arc::new(ArtworkService::new(artworks.clone(), digital_files.clone())),
            order_service: Arc::new(OrderService::new(
                orders.clone(),
                artworks.clone(),
                config.email.studio_email.clone(),
            )),
            newsletter_service: Arc::new(NewsletterService::new(newsletter.clone())),
            contact_service: Arc::new(ContactService::new(contact.clone())),
            dashboard_service: Arc::new(DashboardService::new(
                artworks, orders, newsletter, contact,
            )),
            admin_auth: Arc::new(AdminAuthService::new(sessions, &config.admin)?),
            email_service: Arc::new(EmailService::new(config.email.clone())?),
            digital_files,
            api_limiter: Arc::new(RateLimiter::new(
                config.rate_limit.window_secs,
                config.rate_limit.api_max,
            )),
            form_limiter: Arc::new(RateLimiter::new(
                config.rate_limit.window_secs,
                config.rate_limit.form_max,
            )),
            started_at: Instant::now(),
        })
    }
}

/// Error response for API errors
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            error: message.into(),
        }
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Log the cause and answer with a generic 500
    pub fn internal(cause: impl std::fmt::Display, message: &str) -> Self {
        tracing::error!("{}: {}", message, cause);
        Self::internal_error(message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation_error(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

/// Extract session token from request
///
/// Accepts `Authorization: Bearer <token>` or a `sessionId` cookie.
pub fn extract_session_token(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    if let Some(cookie_header) = headers.get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("sessionId=") {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Admin session guard
///
/// Rejects the request with 401 unless it carries a live session. The session
/// is made available to handlers as an `Extension<AdminSession>`.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    let session: AdminSession = state
        .admin_auth
        .get_session(&token)
        .await
        .map_err(|e| ApiError::internal(e, "Internal server error"))?
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Client address from the connection, or unspecified when not served over TCP
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

async fn apply_limit(
    limiter: &RateLimiter,
    message: &str,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);
    let decision = limiter.check(ip).await;

    if !decision.allowed {
        tracing::warn!("Rate limit exceeded for {}", ip);
        let mut response = ApiError::too_many_requests(message).into_response();
        set_rate_limit_headers(&mut response, &decision);
        return response;
    }

    let mut response = next.run(request).await;
    set_rate_limit_headers(&mut response, &decision);
    response
}

/// Headers already set by an inner, stricter limiter are kept
fn set_rate_limit_headers(response: &mut Response, decision: &RateLimitDecision) {
    let headers = response.headers_mut();
    for (name, value) in [
        ("ratelimit-limit", decision.limit as i64),
        ("ratelimit-remaining", decision.remaining as i64),
        ("ratelimit-reset", decision.reset_secs),
    ] {
        let name = HeaderName::from_static(name);
        if !headers.contains_key(&name) {
            headers.insert(name, HeaderValue::from(value));
        }
    }
}

/// Rate limit for every `/api` route
pub async fn api_rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    apply_limit(
        &state.api_limiter,
        "Too many requests from this IP, please try again later.",
        request,
        next,
    )
    .await
}

/// Stricter limit for form submissions and login
pub async fn form_rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    apply_limit(
        &state.form_limiter,
        "Too many form submissions, please try again later.",
        request,
        next,
    )
    .await
}
