//! Order repository
//!
//! Storage for order requests submitted through the order wizard.

use crate::db::{Backend, DynDatabasePool, JsonCollection};
use crate::models::{ContactInfo, OrderOptions, OrderRequest};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::path::Path;
use std::sync::Arc;

/// Order repository trait
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Store a new order request
    async fn create(&self, order: &OrderRequest) -> Result<OrderRequest>;

    /// List all order requests, newest first
    async fn list(&self) -> Result<Vec<OrderRequest>>;
}

/// SQLx-based order repository implementation
pub struct SqlxOrderRepository {
    pool: DynDatabasePool,
}

impl SqlxOrderRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn OrderRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl OrderRepository for SqlxOrderRepository {
    async fn create(&self, order: &OrderRequest) -> Result<OrderRequest> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => create_order_sqlite(pool, order).await?,
            Backend::Mysql(pool) => create_order_mysql(pool, order).await?,
        }
        Ok(order.clone())
    }

    async fn list(&self) -> Result<Vec<OrderRequest>> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => list_orders_sqlite(pool).await,
            Backend::Mysql(pool) => list_orders_mysql(pool).await,
        }
    }
}

const INSERT_SQL: &str = r#"
    INSERT INTO orders (id, artwork_id, order_type, options, inspiration,
                        contact_name, contact_email, contact_phone, contact_message, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const LIST_SQL: &str = r#"
    SELECT id, artwork_id, order_type, options, inspiration,
           contact_name, contact_email, contact_phone, contact_message, created_at
    FROM orders
    ORDER BY created_at DESC
"#;

/// Encode the options object as the JSON text stored in `orders.options`
pub(crate) fn encode_options(options: &Option<OrderOptions>) -> Result<Option<String>> {
    options
        .as_ref()
        .map(|o| serde_json::to_string(o).context("Failed to encode order options"))
        .transpose()
}

fn decode_options(raw: Option<String>) -> Result<Option<OrderOptions>> {
    match raw {
        Some(text) if !text.trim().is_empty() => Ok(Some(
            serde_json::from_str(&text).context("Invalid options column")?,
        )),
        _ => Ok(None),
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_order_sqlite(pool: &SqlitePool, order: &OrderRequest) -> Result<()> {
    sqlx::query(INSERT_SQL)
        .bind(&order.id)
        .bind(&order.artwork_id)
        .bind(order.order_type.as_str())
        .bind(encode_options(&order.options)?)
        .bind(&order.inspiration)
        .bind(&order.contact_info.name)
        .bind(&order.contact_info.email)
        .bind(&order.contact_info.phone)
        .bind(&order.contact_info.message)
        .bind(order.created_at)
        .execute(pool)
        .await
        .context("Failed to create order")?;
    Ok(())
}

async fn list_orders_sqlite(pool: &SqlitePool) -> Result<Vec<OrderRequest>> {
    let rows = sqlx::query(LIST_SQL)
        .fetch_all(pool)
        .await
        .context("Failed to list orders")?;

    rows.iter()
        .map(|row| -> Result<OrderRequest> {
            Ok(OrderRequest {
                id: row.try_get("id")?,
                artwork_id: row.try_get("artwork_id")?,
                order_type: row
                    .try_get::<String, _>("order_type")?
                    .parse()
                    .map_err(anyhow::Error::msg)?,
                options: decode_options(row.try_get("options")?)?,
                inspiration: row.try_get("inspiration")?,
                contact_info: ContactInfo {
                    name: row.try_get("contact_name")?,
                    email: row.try_get("contact_email")?,
                    phone: row.try_get("contact_phone")?,
                    message: row.try_get("contact_message")?,
                },
                created_at: row.try_get("created_at")?,
            })
        })
        .collect()
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_order_mysql(pool: &MySqlPool, order: &OrderRequest) -> Result<()> {
    sqlx::query(INSERT_SQL)
        .bind(&order.id)
        .bind(&order.artwork_id)
        .bind(order.order_type.as_str())
        .bind(encode_options(&order.options)?)
        .bind(&order.inspiration)
        .bind(&order.contact_info.name)
        .bind(&order.contact_info.email)
        .bind(&order.contact_info.phone)
        .bind(&order.contact_info.message)
        .bind(order.created_at)
        .execute(pool)
        .await
        .context("Failed to create order")?;
    Ok(())
}

async fn list_orders_mysql(pool: &MySqlPool) -> Result<Vec<OrderRequest>> {
    let rows = sqlx::query(LIST_SQL)
        .fetch_all(pool)
        .await
        .context("Failed to list orders")?;

    rows.iter()
        .map(|row| -> Result<OrderRequest> {
            Ok(OrderRequest {
                id: row.try_get("id")?,
                artwork_id: row.try_get("artwork_id")?,
                order_type: row
                    .try_get::<String, _>("order_type")?
                    .parse()
                    .map_err(anyhow::Error::msg)?,
                options: decode_options(row.try_get("options")?)?,
                inspiration: row.try_get("inspiration")?,
                contact_info: ContactInfo {
                    name: row.try_get("contact_name")?,
                    email: row.try_get("contact_email")?,
                    phone: row.try_get("contact_phone")?,
                    message: row.try_get("contact_message")?,
                },
                created_at: row.try_get("created_at")?,
            })
        })
        .collect()
}

// ============================================================================
// JSON file implementation
// ============================================================================

/// Order repository over `orders.json`
pub struct JsonOrderRepository {
    collection: JsonCollection<OrderRequest>,
}

impl JsonOrderRepository {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            collection: JsonCollection::new(data_dir, "orders.json"),
        }
    }

    pub fn boxed(data_dir: impl AsRef<Path>) -> Arc<dyn OrderRepository> {
        Arc::new(Self::new(data_dir))
    }
}

#[async_trait]
impl OrderRepository for JsonOrderRepository {
    async fn create(&self, order: &OrderRequest) -> Result<OrderRequest> {
        self.collection
            .modify(|orders| {
                orders.push(order.clone());
                Some(())
            })
            .await?;
        Ok(order.clone())
    }

    async fn list(&self) -> Result<Vec<OrderRequest>> {
        let mut orders = self.collection.read_all().await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}
