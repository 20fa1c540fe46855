//! Configuration management
//!
//! This module handles loading and parsing configuration for the plankjes server.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// JSON file storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Digital file upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
    /// Admin authentication configuration
    #[serde(default)]
    pub admin: AdminConfig,
    /// Outgoing email configuration
    #[serde(default)]
    pub email: EmailConfig,
    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins. Empty means any origin (without credentials).
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Directory containing the built single-page frontend
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("dist/public")
}

/// Database configuration
///
/// The database is optional. When disabled, every entity lives in the JSON store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Whether to use the database as primary storage
    #[serde(default)]
    pub enabled: bool,
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            driver: DatabaseDriver::default(),
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "mysql://root@localhost:3306/plankjes_maffia".to_string()
}

fn default_max_connections() -> u32 {
    10
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite
    Sqlite,
    /// MySQL (default)
    #[default]
    Mysql,
}

/// JSON file storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding artworks.json, orders.json, newsletter.json and contact.json
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Digital file upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory for digital artwork files
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum file size in bytes (default: 50MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Accepted MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
    /// Accepted file extensions, lowercase with leading dot
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads/digital")
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024 // 50MB
}

fn default_allowed_types() -> Vec<String> {
    [
        "image/png",
        "image/jpeg",
        "image/jpg",
        "image/svg+xml",
        "application/pdf",
        "application/postscript",
        "application/illustrator",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_allowed_extensions() -> Vec<String> {
    [".png", ".jpg", ".jpeg", ".svg", ".pdf", ".ai", ".eps"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }

    /// Check if a lowercase extension (with dot) is allowed
    pub fn is_extension_allowed(&self, ext: &str) -> bool {
        self.allowed_extensions.iter().any(|e| e == ext)
    }
}

/// Admin authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Back-office password
    #[serde(default = "default_admin_password")]
    pub password: String,
    /// Session lifetime in hours
    #[serde(default = "default_session_hours")]
    pub session_hours: i64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            password: default_admin_password(),
            session_hours: default_session_hours(),
        }
    }
}

pub(crate) fn default_admin_password() -> String {
    "admin123".to_string()
}

fn default_session_hours() -> i64 {
    24
}

impl AdminConfig {
    /// Whether the shipped default password is still in use
    pub fn uses_default_password(&self) -> bool {
        self.password == default_admin_password()
    }
}

/// Outgoing email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Master switch for notification emails
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// SMTP host
    #[serde(default)]
    pub smtp_host: Option<String>,
    /// SMTP port
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username
    #[serde(default)]
    pub smtp_user: Option<String>,
    /// SMTP password
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// From address, defaults to the SMTP user
    #[serde(default)]
    pub from: Option<String>,
    /// Where order and contact notifications are sent
    #[serde(default = "default_studio_email")]
    pub admin_email: String,
    /// Studio address used in customer mailto links
    #[serde(default = "default_studio_email")]
    pub studio_email: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_user: None,
            smtp_password: None,
            from: None,
            admin_email: default_studio_email(),
            studio_email: default_studio_email(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_smtp_port() -> u16 {
    587
}

fn default_studio_email() -> String {
    "info@plankjesmaffia.nl".to_string()
}

impl EmailConfig {
    /// SMTP is usable only when host, user and password are all present
    pub fn is_smtp_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        self.enabled
            && present(&self.smtp_host)
            && present(&self.smtp_user)
            && present(&self.smtp_password)
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in seconds, shared by both limiters
    #[serde(default = "default_window_secs")]
    pub window_secs: i64,
    /// Requests per window for any /api route
    #[serde(default = "default_api_max")]
    pub api_max: usize,
    /// Submissions per window for form endpoints and login
    #[serde(default = "default_form_max")]
    pub form_max: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            api_max: default_api_max(),
            form_max: default_form_max(),
        }
    }
}

fn default_window_secs() -> i64 {
    15 * 60
}

fn default_api_max() -> usize {
    100
}

fn default_form_max() -> usize {
    5
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern `PLANKJES_<SECTION>_<KEY>`, e.g.
    /// `PLANKJES_SERVER_PORT`, `PLANKJES_DATABASE_URL`, `PLANKJES_ADMIN_PASSWORD`,
    /// `PLANKJES_SMTP_HOST`.
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.admin.password.is_empty() {
            return Err(ConfigError::ValidationError(
                "admin.password must not be empty".to_string(),
            ));
        }
        if self.admin.session_hours <= 0 {
            return Err(ConfigError::ValidationError(
                "admin.session_hours must be positive".to_string(),
            ));
        }
        if self.rate_limit.window_secs <= 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.window_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        let var = |key: &str| std::env::var(key).ok();

        // Server configuration
        if let Some(host) = var("PLANKJES_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PLANKJES_SERVER_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(origins) = var("PLANKJES_SERVER_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(dir) = var("PLANKJES_SERVER_STATIC_DIR") {
            self.server.static_dir = PathBuf::from(dir);
        }

        // Database configuration
        if let Some(enabled) = var("PLANKJES_DATABASE_ENABLED") {
            self.database.enabled = matches!(enabled.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(driver) = var("PLANKJES_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Some(url) = var("PLANKJES_DATABASE_URL") {
            self.database.url = url;
        }

        // Storage
        if let Some(dir) = var("PLANKJES_STORAGE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("PLANKJES_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(dir);
        }

        // Admin
        if let Some(password) = var("PLANKJES_ADMIN_PASSWORD") {
            self.admin.password = password;
        }
        if let Some(hours) = var("PLANKJES_ADMIN_SESSION_HOURS").and_then(|h| h.parse().ok()) {
            self.admin.session_hours = hours;
        }

        // Email
        if let Some(enabled) = var("PLANKJES_EMAIL_ENABLED") {
            self.email.enabled = enabled.eq_ignore_ascii_case("true");
        }
        if let Some(host) = var("PLANKJES_SMTP_HOST") {
            self.email.smtp_host = Some(host);
        }
        if let Some(port) = var("PLANKJES_SMTP_PORT").and_then(|p| p.parse().ok()) {
            self.email.smtp_port = port;
        }
        if let Some(user) = var("PLANKJES_SMTP_USER") {
            self.email.smtp_user = Some(user);
        }
        if let Some(password) = var("PLANKJES_SMTP_PASSWORD") {
            self.email.smtp_password = Some(password);
        }
        if let Some(from) = var("PLANKJES_SMTP_FROM") {
            self.email.from = Some(from);
        }
        if let Some(admin_email) = var("PLANKJES_ADMIN_EMAIL") {
            self.email.admin_email = admin_email;
        }

        // Rate limits
        if let Some(max) = var("PLANKJES_RATE_LIMIT_API_MAX").and_then(|m| m.parse().ok()) {
            self.rate_limit.api_max = max;
        }
        if let Some(max) = var("PLANKJES_RATE_LIMIT_FORM_MAX").and_then(|m| m.parse().ok()) {
            self.rate_limit.form_max = max;
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ENV_KEYS: &[&str] = &[
        "PLANKJES_SERVER_HOST",
        "PLANKJES_SERVER_PORT",
        "PLANKJES_SERVER_CORS_ORIGINS",
        "PLANKJES_DATABASE_ENABLED",
        "PLANKJES_DATABASE_DRIVER",
        "PLANKJES_DATABASE_URL",
        "PLANKJES_ADMIN_PASSWORD",
        "PLANKJES_SMTP_HOST",
        "PLANKJES_SMTP_USER",
        "PLANKJES_SMTP_PASSWORD",
    ];

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        let guard = super::CONFIG_ENV_MUTEX
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
        guard
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let config = Config::load(std::path::Path::new("nonexistent_config.yml")).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3001);
        assert!(!config.database.enabled);
        assert_eq!(config.database.driver, DatabaseDriver::Mysql);
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
        assert_eq!(config.upload.path, PathBuf::from("uploads/digital"));
        assert_eq!(config.upload.max_file_size, 50 * 1024 * 1024);
        assert_eq!(config.admin.session_hours, 24);
        assert!(config.admin.uses_default_password());
        assert_eq!(config.rate_limit.api_max, 100);
        assert_eq!(config.rate_limit.form_max, 5);
        assert_eq!(config.rate_limit.window_secs, 900);
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "   \n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 3000\nadmin:\n  password: s3cret\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.admin.password, "s3cret");
        assert_eq!(config.admin.session_hours, 24);
        assert!(!config.admin.uses_default_password());
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9000
  cors_origins: ["https://plankjesmaffia.nl"]
database:
  enabled: true
  driver: sqlite
  url: "data/plankjes.db"
storage:
  data_dir: "/var/lib/plankjes"
email:
  smtp_host: "smtp.example.com"
  smtp_user: "mailer"
  smtp_password: "pw"
  admin_email: "orders@example.com"
rate_limit:
  api_max: 50
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.cors_origins, vec!["https://plankjesmaffia.nl"]);
        assert!(config.database.enabled);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/plankjes"));
        assert!(config.email.is_smtp_configured());
        assert_eq!(config.email.admin_email, "orders@example.com");
        assert_eq!(config.rate_limit.api_max, 50);
        assert_eq!(config.rate_limit.form_max, 5);
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn test_empty_admin_password_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "admin:\n  password: \"\"\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("admin.password"));
    }

    #[test]
    fn test_smtp_requires_all_credentials() {
        let mut email = EmailConfig::default();
        assert!(!email.is_smtp_configured());

        email.smtp_host = Some("smtp.example.com".into());
        email.smtp_user = Some("user".into());
        assert!(!email.is_smtp_configured());

        email.smtp_password = Some("pw".into());
        assert!(email.is_smtp_configured());

        email.enabled = false;
        assert!(!email.is_smtp_configured());
    }

    #[test]
    fn test_upload_filters() {
        let upload = UploadConfig::default();
        assert!(upload.is_type_allowed("application/pdf"));
        assert!(!upload.is_type_allowed("text/plain"));
        assert!(upload.is_extension_allowed(".eps"));
        assert!(!upload.is_extension_allowed(".exe"));
    }

    #[test]
    fn test_env_override_server_and_admin() {
        let _guard = lock_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\n").unwrap();

        std::env::set_var("PLANKJES_SERVER_HOST", "192.168.1.1");
        std::env::set_var("PLANKJES_SERVER_PORT", "4000");
        std::env::set_var("PLANKJES_SERVER_CORS_ORIGINS", "https://a.nl, https://b.nl");
        std::env::set_var("PLANKJES_ADMIN_PASSWORD", "from-env");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.cors_origins, vec!["https://a.nl", "https://b.nl"]);
        assert_eq!(config.admin.password, "from-env");

        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_env_override_database_config() {
        let _guard = lock_env();

        std::env::set_var("PLANKJES_DATABASE_ENABLED", "true");
        std::env::set_var("PLANKJES_DATABASE_DRIVER", "SQLITE");
        std::env::set_var("PLANKJES_DATABASE_URL", "data/test.db");

        let config = Config::load_with_env(std::path::Path::new("nonexistent.yml")).unwrap();

        assert!(config.database.enabled);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.database.url, "data/test.db");

        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_env_invalid_port_ignored() {
        let _guard = lock_env();

        std::env::set_var("PLANKJES_SERVER_PORT", "not-a-port");
        let config = Config::load_with_env(std::path::Path::new("nonexistent.yml")).unwrap();
        assert_eq!(config.server.port, 3001);

        std::env::remove_var("PLANKJES_SERVER_PORT");
    }
}
