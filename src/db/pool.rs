//! Database connection pool abstraction
//!
//! This module provides a unified interface for database operations that works
//! with both SQLite and MySQL backends. The appropriate pool is created based
//! on the configuration.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

/// Database pool trait that abstracts over different database backends.
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Execute a raw SQL query that doesn't return rows
    async fn execute(&self, query: &str) -> Result<u64>;

    /// Get the database driver type
    fn driver(&self) -> DatabaseDriver;

    /// Get the underlying SQLite pool if this is a SQLite connection
    fn as_sqlite(&self) -> Option<&SqlitePool>;

    /// Get the underlying MySQL pool if this is a MySQL connection
    fn as_mysql(&self) -> Option<&MySqlPool>;

    /// Borrow the concrete pool for dialect-specific queries
    fn backend(&self) -> Result<Backend<'_>> {
        if let Some(pool) = self.as_sqlite() {
            return Ok(Backend::Sqlite(pool));
        }
        if let Some(pool) = self.as_mysql() {
            return Ok(Backend::Mysql(pool));
        }
        anyhow::bail!("Unsupported database pool")
    }
}

/// A borrowed concrete pool, matched on by repositories.
pub enum Backend<'a> {
    Sqlite(&'a SqlitePool),
    Mysql(&'a MySqlPool),
}

/// SQLite connection pool implementation
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Create a new SQLite connection pool, creating the file's directory
    pub async fn new(url: &str, max_connections: u32) -> Result<Self> {
        let target = SqliteTarget::parse(url);

        if let SqliteTarget::File { path, .. } = &target {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {:?}", parent)
                })?;
            }
        }

        // Every in-memory connection is its own database, so keep exactly one.
        let max_connections = match target {
            SqliteTarget::Memory => 1,
            SqliteTarget::File { .. } => max_connections,
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&target.connection_url())
            .await
            .with_context(|| format!("Failed to connect to SQLite database: {}", url))?;

        Ok(Self { pool })
    }
}

/// Where a configured SQLite URL points
#[derive(Debug, PartialEq, Eq)]
enum SqliteTarget {
    Memory,
    /// `options` is the query string, if the URL had one
    File { path: PathBuf, options: Option<String> },
}

impl SqliteTarget {
    /// Accepts `:memory:`, `sqlite::memory:`, `sqlite:<path>[?opts]` and bare paths
    fn parse(url: &str) -> Self {
        if url == ":memory:" || url.starts_with("sqlite::memory:") {
            return Self::Memory;
        }
        let rest = url.strip_prefix("sqlite:").unwrap_or(url);
        match rest.split_once('?') {
            Some((path, options)) => Self::File {
                path: PathBuf::from(path),
                options: Some(options.to_string()),
            },
            None => Self::File {
                path: PathBuf::from(rest),
                options: None,
            },
        }
    }

    /// Files are created on first connect unless the URL sets its own mode
    fn connection_url(&self) -> String {
        match self {
            Self::Memory => "sqlite::memory:".to_string(),
            Self::File { path, options } => format!(
                "sqlite:{}?{}",
                path.display(),
                options.as_deref().unwrap_or("mode=rwc")
            ),
        }
    }
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        Some(&self.pool)
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        None
    }
}

/// MySQL connection pool implementation
pub struct MysqlDatabase {
    pool: MySqlPool,
}

impl MysqlDatabase {
    /// Create a new MySQL connection pool
    pub async fn new(url: &str, max_connections: u32) -> Result<Self> {
        let connection_url = if url.starts_with("mysql://") {
            url.to_string()
        } else {
            format!("mysql://{}", url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(&connection_url)
            .await
            .context("Failed to connect to MySQL database")?;

        Ok(Self { pool })
    }

}

#[async_trait]
impl DatabasePool for MysqlDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        None
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        Some(&self.pool)
    }
}

/// Type alias for a shared database pool
pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// Create a database connection pool based on configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    match config.driver {
        DatabaseDriver::Sqlite => {
            let db = SqliteDatabase::new(&config.url, config.max_connections).await?;
            Ok(Arc::new(db))
        }
        DatabaseDriver::Mysql => {
            let db = MysqlDatabase::new(&config.url, config.max_connections).await?;
            Ok(Arc::new(db))
        }
    }
}

/// Create a SQLite in-memory database pool for testing
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    let config = DatabaseConfig {
        enabled: true,
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
        max_connections: 1,
    };
    create_pool(&config).await
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_target_parse() {
        assert_eq!(SqliteTarget::parse(":memory:"), SqliteTarget::Memory);
        assert_eq!(SqliteTarget::parse("sqlite::memory:"), SqliteTarget::Memory);

        let bare = SqliteTarget::parse("data/plankjes.db");
        assert_eq!(bare.connection_url(), "sqlite:data/plankjes.db?mode=rwc");

        let with_mode = SqliteTarget::parse("sqlite:data/plankjes.db?mode=ro");
        assert_eq!(
            with_mode,
            SqliteTarget::File {
                path: PathBuf::from("data/plankjes.db"),
                options: Some("mode=ro".to_string()),
            }
        );
        assert_eq!(with_mode.connection_url(), "sqlite:data/plankjes.db?mode=ro");
    }

    #[tokio::test]
    async fn test_memory_pool_is_one_shared_database() {
        // A larger pool would hand out unrelated in-memory databases
        let pool = create_pool(&DatabaseConfig {
            enabled: true,
            driver: DatabaseDriver::Sqlite,
            url: ":memory:".to_string(),
            max_connections: 8,
        })
        .await
        .unwrap();

        pool.execute("CREATE TABLE studio (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        assert_eq!(pool.execute("INSERT INTO studio (id) VALUES (1)").await.unwrap(), 1);
        assert!(matches!(pool.backend().unwrap(), Backend::Sqlite(_)));
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
    }

    #[tokio::test]
    async fn test_file_pool_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("data").join("plankjes.db");

        let pool = create_pool(&DatabaseConfig {
            enabled: true,
            driver: DatabaseDriver::Sqlite,
            url: format!("sqlite:{}", db_path.display()),
            max_connections: 2,
        })
        .await
        .unwrap();

        pool.execute("CREATE TABLE studio (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        assert!(db_path.exists());
    }
}
