//! Snapshot persistence
//!
//! [`SnapshotStore`] keeps the harvest loop and the reconciler independent of
//! where the snapshot lives. [`JsonFileStore`] is the file-backed default: a
//! pretty-printed JSON array, replaced atomically on every save.

use crate::error::Result;
use crate::record::Record;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Loads and saves the snapshot as a whole
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the current snapshot; an absent snapshot is empty
    async fn load(&self) -> Result<Vec<Record>>;

    /// Replace the snapshot with `records`
    async fn save(&self, records: &[Record]) -> Result<()>;
}

/// Snapshot stored as a JSON file
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Snapshot file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<Record>> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No snapshot yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let records: Vec<Record> = serde_json::from_slice(&content)?;
        tracing::debug!(path = %self.path.display(), records = records.len(), "Loaded snapshot");
        Ok(records)
    }

    async fn save(&self, records: &[Record]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Two-space indentation; non-ASCII text is written as-is
        let mut json = serde_json::to_vec_pretty(records)?;
        json.push(b'\n');

        // Write beside the target and rename so a crash never leaves a partial file
        let temp = self.temp_path();
        tokio::fs::write(&temp, &json).await?;
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        tracing::info!(path = %self.path.display(), records = records.len(), "Saved snapshot");
        Ok(())
    }
}
