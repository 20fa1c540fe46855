//! One-shot import of the JSON data files into the database
//!
//! Reads `artworks.json` and `orders.json` from the data directory and upserts
//! every record inside a single transaction. A missing file is skipped. A record
//! that cannot be parsed or written is logged and skipped. Any other failure
//! rolls the whole import back.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::{MySqlConnection, SqliteConnection};
use std::path::Path;

use super::repositories::{artwork::encode_products, order::encode_options};
use super::{Backend, DynDatabasePool};
use crate::models::{Artwork, OrderRequest};

/// Counts reported after an import
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub artworks: usize,
    pub orders: usize,
    pub skipped: usize,
}

const UPSERT_ARTWORK_MYSQL: &str = r#"
    INSERT INTO artworks (id, title, image, category, description, available, rotation,
                          available_products, digital_file, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON DUPLICATE KEY UPDATE
        title = VALUES(title),
        image = VALUES(image),
        category = VALUES(category),
        description = VALUES(description),
        available = VALUES(available),
        rotation = VALUES(rotation),
        available_products = VALUES(available_products),
        digital_file = VALUES(digital_file),
        updated_at = VALUES(updated_at)
"#;

const UPSERT_ARTWORK_SQLITE: &str = r#"
    INSERT INTO artworks (id, title, image, category, description, available, rotation,
                          available_products, digital_file, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        title = excluded.title,
        image = excluded.image,
        category = excluded.category,
        description = excluded.description,
        available = excluded.available,
        rotation = excluded.rotation,
        available_products = excluded.available_products,
        digital_file = excluded.digital_file,
        updated_at = excluded.updated_at
"#;

const UPSERT_ORDER_MYSQL: &str = r#"
    INSERT INTO orders (id, artwork_id, order_type, options, inspiration,
                        contact_name, contact_email, contact_phone, contact_message, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON DUPLICATE KEY UPDATE
        artwork_id = VALUES(artwork_id),
        order_type = VALUES(order_type),
        options = VALUES(options),
        inspiration = VALUES(inspiration),
        contact_name = VALUES(contact_name),
        contact_email = VALUES(contact_email),
        contact_phone = VALUES(contact_phone),
        contact_message = VALUES(contact_message)
"#;

const UPSERT_ORDER_SQLITE: &str = r#"
    INSERT INTO orders (id, artwork_id, order_type, options, inspiration,
                        contact_name, contact_email, contact_phone, contact_message, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        artwork_id = excluded.artwork_id,
        order_type = excluded.order_type,
        options = excluded.options,
        inspiration = excluded.inspiration,
        contact_name = excluded.contact_name,
        contact_email = excluded.contact_email,
        contact_phone = excluded.contact_phone,
        contact_message = excluded.contact_message
"#;

/// Import `artworks.json` and `orders.json` from `data_dir` into the database
pub async fn import_json_data(pool: &DynDatabasePool, data_dir: &Path) -> Result<ImportReport> {
    let mut report = ImportReport::default();

    let artworks: Vec<Artwork> =
        load_records(&data_dir.join("artworks.json"), &["createdAt", "updatedAt"], &mut report)
            .await?;
    let orders: Vec<OrderRequest> =
        load_records(&data_dir.join("orders.json"), &["createdAt"], &mut report).await?;

    match pool.backend()? {
        Backend::Sqlite(pool) => {
            let mut tx = pool.begin().await.context("Failed to begin transaction")?;
            for artwork in &artworks {
                match upsert_artwork_sqlite(&mut tx, artwork).await {
                    Ok(()) => report.artworks += 1,
                    Err(e) => skip(&mut report, "artwork", &artwork.id, &e),
                }
            }
            for order in &orders {
                match upsert_order_sqlite(&mut tx, order).await {
                    Ok(()) => report.orders += 1,
                    Err(e) => skip(&mut report, "order", &order.id, &e),
                }
            }
            tx.commit().await.context("Failed to commit import")?;
        }
        Backend::Mysql(pool) => {
            let mut tx = pool.begin().await.context("Failed to begin transaction")?;
            for artwork in &artworks {
                match upsert_artwork_mysql(&mut tx, artwork).await {
                    Ok(()) => report.artworks += 1,
                    Err(e) => skip(&mut report, "artwork", &artwork.id, &e),
                }
            }
            for order in &orders {
                match upsert_order_mysql(&mut tx, order).await {
                    Ok(()) => report.orders += 1,
                    Err(e) => skip(&mut report, "order", &order.id, &e),
                }
            }
            tx.commit().await.context("Failed to commit import")?;
        }
    }

    tracing::info!(
        "Imported {} artworks and {} orders ({} skipped)",
        report.artworks,
        report.orders,
        report.skipped
    );
    Ok(report)
}

fn skip(report: &mut ImportReport, kind: &str, id: &str, error: &anyhow::Error) {
    tracing::warn!("Skipping {} {}: {:#}", kind, id, error);
    report.skipped += 1;
}

/// Read a JSON array file, parsing each element on its own.
///
/// Missing timestamp fields are filled with the current time.
async fn load_records<T: DeserializeOwned>(
    path: &Path,
    timestamp_fields: &[&str],
    report: &mut ImportReport,
) -> Result<Vec<T>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No {} found, skipping", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };

    let values: Vec<Value> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let now = Value::String(Utc::now().to_rfc3339());
    let mut records = Vec::with_capacity(values.len());
    for mut value in values {
        if let Some(object) = value.as_object_mut() {
            for field in timestamp_fields {
                object.entry(*field).or_insert_with(|| now.clone());
            }
        }
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("<no id>")
            .to_string();
        match serde_json::from_value(value) {
            Ok(record) => records.push(record),
            Err(e) => skip(report, "record", &id, &anyhow::Error::new(e)),
        }
    }
    Ok(records)
}

async fn upsert_artwork_sqlite(conn: &mut SqliteConnection, artwork: &Artwork) -> Result<()> {
    sqlx::query(UPSERT_ARTWORK_SQLITE)
        .bind(&artwork.id)
        .bind(&artwork.title)
        .bind(&artwork.image)
        .bind(artwork.category.as_str())
        .bind(&artwork.description)
        .bind(artwork.available)
        .bind(artwork.rotation)
        .bind(encode_products(&artwork.available_products)?)
        .bind(&artwork.digital_file)
        .bind(artwork.created_at)
        .bind(artwork.updated_at)
        .execute(conn)
        .await?;
    Ok(())
}

async fn upsert_order_sqlite(conn: &mut SqliteConnection, order: &OrderRequest) -> Result<()> {
    sqlx::query(UPSERT_ORDER_SQLITE)
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
        .execute(conn)
        .await?;
    Ok(())
}

async fn upsert_artwork_mysql(conn: &mut MySqlConnection, artwork: &Artwork) -> Result<()> {
    sqlx::query(UPSERT_ARTWORK_MYSQL)
        .bind(&artwork.id)
        .bind(&artwork.title)
        .bind(&artwork.image)
        .bind(artwork.category.as_str())
        .bind(&artwork.description)
        .bind(artwork.available)
        .bind(artwork.rotation)
        .bind(encode_products(&artwork.available_products)?)
        .bind(&artwork.digital_file)
        .bind(artwork.created_at)
        .bind(artwork.updated_at)
        .execute(conn)
        .await?;
    Ok(())
}

async fn upsert_order_mysql(conn: &mut MySqlConnection, order: &OrderRequest) -> Result<()> {
    sqlx::query(UPSERT_ORDER_MYSQL)
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
        .execute(conn)
        .await?;
    Ok(())
}
