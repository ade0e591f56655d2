//! File-based task storage implementation
//!
//! Stores the whole collection as a single JSON document on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use super::model::TaskCollection;
use crate::{Error, Result};

/// Durable storage for the task collection, loaded and saved as one unit
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Load the persisted collection, or an empty one if nothing is stored
    async fn load(&self) -> Result<TaskCollection>;

    /// Replace the persisted collection
    async fn save(&self, collection: &TaskCollection) -> Result<()>;
}

/// File-based task store using JSON
pub struct FileTaskStore {
    /// Path to the JSON file
    path: PathBuf,
}

impl FileTaskStore {
    /// Create a new FileTaskStore
    ///
    /// The file is not touched until the first load or save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unreadable task file is moved to
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".bak");
        PathBuf::from(name)
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Move the unreadable file aside, replacing any earlier backup
    async fn quarantine(&self, reason: &serde_json::Error) -> Result<()> {
        let backup = self.backup_path();
        tokio::fs::rename(&self.path, &backup).await?;
        warn!(
            "Task file {} is unreadable ({}); moved to {} and starting empty",
            self.path.display(),
            reason,
            backup.display()
        );
        Ok(())
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn load(&self) -> Result<TaskCollection> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(TaskCollection::new()),
            Err(e) => return Err(e.into()),
        };

        let mut collection: TaskCollection = match serde_json::from_slice(&content) {
            Ok(collection) => collection,
            Err(e) => {
                self.quarantine(&e).await?;
                return Ok(TaskCollection::new());
            }
        };

        if let Some(max_id) = collection.max_task_id() {
            if max_id > collection.last_id {
                warn!(
                    "Task file {} has last_id {} below stored id {}; raising it",
                    self.path.display(),
                    collection.last_id,
                    max_id
                );
                collection.last_id = max_id;
            }
        }

        Ok(collection)
    }

    async fn save(&self, collection: &TaskCollection) -> Result<()> {
        let content = serde_json::to_vec_pretty(collection)?;

        let parent = self.parent_dir();
        tokio::fs::create_dir_all(parent).await?;

        // Readers only ever see the old file or the complete new one.
        let temp_path = parent.join(format!(".{}.tmp", Uuid::new_v4().as_hyphenated()));

        if let Err(err) = write_synced(&temp_path, &content).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(err.into());
        }

        if let Err(err) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(Error::Storage(format!(
                "Failed to replace task file {}: {}",
                self.path.display(),
                err
            )));
        }

        debug!(
            "Saved {} tasks to {}",
            collection.tasks.len(),
            self.path.display()
        );
        Ok(())
    }
}

async fn write_synced(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(content).await?;
    file.sync_all().await
}
