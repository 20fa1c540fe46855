//! JSON file store
//!
//! Each entity lives in one pretty-printed JSON array file under the data
//! directory (`artworks.json`, `orders.json`, ...). A missing file reads as an
//! empty collection. Writes land in a sibling temp file which is then renamed
//! over the original, so readers never observe a half-written file.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// A JSON array file holding every record of one entity type.
///
/// Read-modify-write cycles are serialized by an async mutex, so concurrent
/// requests cannot drop each other's writes.
pub struct JsonCollection<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCollection<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Create a collection stored at `<data_dir>/<file_name>`
    pub fn new(data_dir: impl AsRef<Path>, file_name: &str) -> Self {
        Self {
            path: data_dir.as_ref().join(file_name),
            lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record
    pub async fn read_all(&self) -> Result<Vec<T>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Run `f` against the loaded records and persist them if it returns `Some`.
    ///
    /// Returning `None` leaves the file untouched.
    pub async fn modify<R, F>(&self, f: F) -> Result<Option<R>>
    where
        F: FnOnce(&mut Vec<T>) -> Option<R>,
    {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        let result = f(&mut items);
        if result.is_some() {
            self.save(&items).await?;
        }
        Ok(result)
    }

    async fn load(&self) -> Result<Vec<T>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    async fn save(&self, items: &[T]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create data directory: {:?}", parent))?;
            }
        }

        let json = serde_json::to_string_pretty(items).context("Failed to serialize records")?;
        let tmp_path = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: u32,
        name: String,
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let collection: JsonCollection<Item> = JsonCollection::new(dir.path(), "items.json");

        assert!(collection.read_all().await.unwrap().is_empty());
        assert!(!collection.path().exists());
    }

    #[tokio::test]
    async fn test_modify_persists_pretty_json() {
        let dir = TempDir::new().unwrap();
        let collection = JsonCollection::new(dir.path().join("nested"), "items.json");

        collection
            .modify(|items| {
                items.push(Item { id: 1, name: "Plankje".into() });
                Some(())
            })
            .await
            .unwrap();

        let items = collection.read_all().await.unwrap();
        assert_eq!(items, vec![Item { id: 1, name: "Plankje".into() }]);

        let raw = std::fs::read_to_string(collection.path()).unwrap();
        assert!(raw.contains("\n  {"), "expected indented output, got {raw}");
        assert!(!dir.path().join("nested/items.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_modify_returning_none_does_not_write() {
        let dir = TempDir::new().unwrap();
        let collection: JsonCollection<Item> = JsonCollection::new(dir.path(), "items.json");

        let result = collection
            .modify(|items| {
                items.push(Item { id: 9, name: "discarded".into() });
                None::<()>
            })
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(!collection.path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("items.json"), "{ not json").unwrap();
        let collection: JsonCollection<Item> = JsonCollection::new(dir.path(), "items.json");

        let err = collection.read_all().await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let collection: Arc<JsonCollection<Item>> =
            Arc::new(JsonCollection::new(dir.path(), "items.json"));

        let mut handles = Vec::new();
        for id in 0..20 {
            let collection = collection.clone();
            handles.push(tokio::spawn(async move {
                collection
                    .modify(|items| {
                        items.push(Item { id, name: format!("item-{id}") });
                        Some(())
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(collection.read_all().await.unwrap().len(), 20);
    }
}
