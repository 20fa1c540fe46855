//! Storage layer
//!
//! Two interchangeable backends hold the studio's records:
//! - a SQL database (MySQL in production, SQLite for single-binary setups)
//! - pretty-printed JSON files under the data directory
//!
//! Repositories wrap both behind one trait per entity, and the
//! [`repositories::Fallback`] wrapper retries failed database calls on the JSON
//! store.
//!
//! # Usage
//!
//! ```ignore
//! use plankjes::config::DatabaseConfig;
//! use plankjes::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config.database).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod import;
pub mod json_store;
pub mod migrations;
pub mod pool;
pub mod repositories;

pub use json_store::JsonCollection;
pub use pool::{
    create_pool, create_test_pool, Backend, DatabasePool, DynDatabasePool, MysqlDatabase,
    SqliteDatabase,
};
