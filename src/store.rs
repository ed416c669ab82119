use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, MutexGuard};

use crate::config::Config;
use crate::models::Item;

/// What the backing file looked like when it was last read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreState {
    /// No file on disk yet; an empty collection
    Missing,
    /// File decoded successfully
    Loaded,
    /// File exists but could not be read or decoded
    Unreadable { reason: String },
}

impl StoreState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreState::Missing => "missing",
            StoreState::Loaded => "loaded",
            StoreState::Unreadable { .. } => "unreadable",
        }
    }
}

/// Result of a single read of the backing file
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub items: Vec<Item>,
    pub state: StoreState,
}

/// Handle to the JSON file holding the whole item collection
///
/// Every read loads the full file and every write replaces it. Clones share one
/// writer lock; mutating callers take it with [`ItemStore::lock`] before reading
/// and hold it until their write has finished.
#[derive(Clone)]
pub struct ItemStore {
    path: Arc<PathBuf>,
    writer: Arc<Mutex<()>>,
}

impl ItemStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        tracing::info!("Using item data file: {}", config.data_file.display());
        Self::new(config.data_file.clone())
    }

    /// Acquire the single-writer lock for a read/modify/write span.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    /// Load every item, substituting an empty collection for a missing or
    /// unreadable file.
    pub async fn read_all(&self) -> Vec<Item> {
        self.load().await.items
    }

    /// Load the collection a mutating request is about to rewrite.
    ///
    /// Same as [`ItemStore::load`], but warns when the file is unreadable, since
    /// the caller's write will replace whatever is on disk.
    pub async fn load_for_update(&self) -> Snapshot {
        let snapshot = self.load().await;
        if let StoreState::Unreadable { reason } = &snapshot.state {
            tracing::warn!(
                "Data file {} is unreadable ({}); the next write will replace its contents",
                self.path.display(),
                reason
            );
        }
        snapshot
    }

    /// Load every item along with how the file was found.
    ///
    /// Never fails: read and decode errors are logged and reported through
    /// [`StoreState::Unreadable`] with an empty item list.
    pub async fn load(&self) -> Snapshot {
        let bytes = match tokio::fs::read(self.path.as_path()).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Data file {} not found, starting empty", self.path.display());
                return Snapshot {
                    items: Vec::new(),
                    state: StoreState::Missing,
                };
            }
            Err(e) => return self.unreadable(format!("read failed: {}", e)),
        };

        match serde_json::from_slice::<Vec<Item>>(&bytes) {
            Ok(items) => {
                tracing::debug!("Loaded {} items from {}", items.len(), self.path.display());
                Snapshot {
                    items,
                    state: StoreState::Loaded,
                }
            }
            Err(e) => self.unreadable(format!("invalid JSON: {}", e)),
        }
    }

    fn unreadable(&self, reason: String) -> Snapshot {
        tracing::warn!(
            "Error reading data file {}: {}; treating as empty",
            self.path.display(),
            reason
        );
        Snapshot {
            items: Vec::new(),
            state: StoreState::Unreadable { reason },
        }
    }

    /// Replace the backing file with `items`, pretty-printed.
    ///
    /// The new contents go to a sibling temporary file that is then renamed over
    /// the target, so concurrent readers see either the old or the new file.
    pub async fn write_all(&self, items: &[Item]) -> Result<()> {
        let result = self.write_atomic(items).await;
        if let Err(e) = &result {
            tracing::error!("Error writing data file {}: {:#}", self.path.display(), e);
        }
        result
    }

    async fn write_atomic(&self, items: &[Item]) -> Result<()> {
        let json = serde_json::to_string_pretty(items).context("Failed to serialize items")?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = self.tmp_path();
        let replaced = match write_synced(&tmp_path, json.as_bytes()).await {
            Ok(()) => tokio::fs::rename(&tmp_path, self.path.as_path())
                .await
                .with_context(|| format!("Failed to replace {}", self.path.display())),
            Err(e) => Err(e),
        };
        if replaced.is_err() {
            let _ = tokio::fs::remove_file(&tmp_path).await;
        }
        replaced?;

        tracing::debug!("Wrote {} items to {}", items.len(), self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "items".to_string());
        self.path.with_file_name(format!(".{}.tmp", file_name))
    }

    /// Check that the backing file is either absent or decodable.
    pub async fn probe(&self) -> Result<StoreState> {
        match self.load().await.state {
            StoreState::Unreadable { reason } => Err(anyhow::anyhow!(
                "data file {} is unreadable: {}",
                self.path.display(),
                reason
            )),
            state => Ok(state),
        }
    }
}

/// Write `bytes` to `path` and flush them to disk before returning.
async fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    file.sync_all()
        .await
        .with_context(|| format!("Failed to sync {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, name: &str) -> Item {
        Item {
            id: Some(id.to_string()),
            name: name.to_string(),
            description: None,
            price: 1.5,
            quantity: 2,
        }
    }

    #[test]
    fn test_store_is_clonable_and_send_sync() {
        fn assert_traits<T: Clone + Send + Sync>() {}
        assert_traits::<ItemStore>();
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ItemStore::new(dir.path().join("data.json"));

        let snapshot = store.load().await;
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.state, StoreState::Missing);
        assert_eq!(store.probe().await.unwrap(), StoreState::Missing);
    }

    #[tokio::test]
    async fn test_write_then_read_preserves_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ItemStore::new(dir.path().join("data.json"));

        let items = vec![item("3", "third"), item("1", "first"), item("2", "second")];
        store.write_all(&items).await.unwrap();

        let snapshot = store.load().await;
        assert_eq!(snapshot.state, StoreState::Loaded);
        assert_eq!(snapshot.items, items);
        assert_eq!(store.read_all().await, items);
    }

    #[tokio::test]
    async fn test_written_file_is_pretty_printed_array() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.json");
        let store = ItemStore::new(&path);

        store.write_all(&[item("1", "Widget")]).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("[\n  {\n    \"id\": \"1\""));
        assert!(contents.contains("\n    \"description\": null"));
        assert!(!dir.path().join(".data.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty_and_unreadable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = ItemStore::new(&path);

        let snapshot = store.load().await;
        assert!(snapshot.items.is_empty());
        assert!(matches!(snapshot.state, StoreState::Unreadable { .. }));
        assert!(store.read_all().await.is_empty());

        let error = store.probe().await.unwrap_err();
        assert!(error.to_string().contains("unreadable"));
    }

    #[tokio::test]
    async fn test_wrong_shape_is_unreadable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"id": "1"}"#).unwrap();
        let store = ItemStore::new(&path);

        assert_eq!(store.load().await.state.as_str(), "unreadable");
    }

    #[tokio::test]
    async fn test_write_creates_missing_parent_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("items.json");
        let store = ItemStore::new(&path);

        store.write_all(&[]).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        // The target is a directory, so the final rename cannot replace it.
        let path = dir.path().join("data.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();
        let store = ItemStore::new(&path);

        assert!(store.write_all(&[item("1", "Widget")]).await.is_err());
        assert!(!dir.path().join(".data.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_overwrites_entire_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ItemStore::new(dir.path().join("data.json"));

        store
            .write_all(&[item("1", "a"), item("2", "b")])
            .await
            .unwrap();
        store.write_all(&[item("2", "b")]).await.unwrap();

        assert_eq!(store.read_all().await, vec![item("2", "b")]);
    }

    #[tokio::test]
    async fn test_load_for_update_reports_unreadable_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.json");
        std::fs::write(&path, "[{\"id\": ").unwrap();
        let store = ItemStore::new(&path);

        let snapshot = store.load_for_update().await;
        assert!(snapshot.items.is_empty());
        assert!(matches!(snapshot.state, StoreState::Unreadable { .. }));

        store.write_all(&[item("1", "a")]).await.unwrap();
        assert_eq!(store.load_for_update().await.state, StoreState::Loaded);
    }

    #[tokio::test]
    async fn test_load_accepts_numeric_ids_and_loose_numbers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"[{"id": 5, "name": "a", "price": "1.5", "quantity": 2.0}]"#,
        )
        .unwrap();
        let store = ItemStore::new(&path);

        let snapshot = store.load().await;
        assert_eq!(snapshot.state, StoreState::Loaded);
        assert_eq!(snapshot.items, vec![item("5", "a")]);
    }

    #[tokio::test]
    async fn test_failed_temp_write_leaves_target_and_cleans_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.json");
        std::fs::write(&path, "[]").unwrap();
        // A temp path that can't be opened for writing fails before the rename.
        let tmp_path = dir.path().join(".data.json.tmp");
        std::fs::create_dir(&tmp_path).unwrap();
        let store = ItemStore::new(&path);

        let error = store.write_all(&[item("1", "a")]).await.unwrap_err();
        assert!(format!("{:#}", error).contains("Failed to create"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_temp_write_removes_temp_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.json");
        let tmp_path = dir.path().join(".data.json.tmp");
        // Dangling link into a missing directory: creating through it fails.
        std::os::unix::fs::symlink(dir.path().join("missing").join("target"), &tmp_path)
            .unwrap();
        let store = ItemStore::new(&path);

        assert!(store.write_all(&[item("1", "a")]).await.is_err());
        assert!(std::fs::symlink_metadata(&tmp_path).is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_stale_temp_file_is_overwritten() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.json");
        std::fs::write(dir.path().join(".data.json.tmp"), "garbage from a crash").unwrap();
        let store = ItemStore::new(&path);

        store.write_all(&[item("1", "a")]).await.unwrap();

        assert_eq!(store.read_all().await, vec![item("1", "a")]);
        assert!(!dir.path().join(".data.json.tmp").exists());
    }
}
