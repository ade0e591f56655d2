//! Task repository
//!
//! Lifecycle operations on top of a [`TaskStore`]. Every call reloads the
//! collection, applies its change and saves the result while holding the
//! repository lock, so concurrent callers never interleave a load and a save.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use super::file_store::{FileTaskStore, TaskStore};
use super::model::{Task, TaskStatus};
use crate::{Error, Result};

/// Longest description accepted, counted in characters after trimming
pub const MAX_DESCRIPTION_CHARS: usize = 150;

/// Trim `text` and check it is a usable description
pub fn validate_description(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(
            "Description cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(Error::Validation(format!(
            "Description is too long (max {} chars)",
            MAX_DESCRIPTION_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

/// Task lifecycle operations backed by a [`TaskStore`]
pub struct TaskRepository {
    store: Arc<dyn TaskStore>,
    /// Held across each load/save cycle
    lock: Mutex<()>,
}

impl TaskRepository {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Repository over a JSON file at `path`
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileTaskStore::new(path)))
    }

    /// Create a new `todo` task with the next unused id
    pub async fn add(&self, description: &str) -> Result<Task> {
        let description = validate_description(description)?;

        let _guard = self.lock.lock().await;
        let mut collection = self.store.load().await?;

        let task = Task::new(collection.next_id()?, description);
        collection.last_id = task.id;
        collection.tasks.push(task.clone());

        self.store.save(&collection).await?;
        debug!("Created task {}", task.id);
        Ok(task)
    }

    /// Get a single task
    pub async fn get(&self, id: u64) -> Result<Task> {
        let _guard = self.lock.lock().await;
        let collection = self.store.load().await?;
        collection.find(id).cloned()
    }

    /// Replace the description of a task
    pub async fn update(&self, id: u64, description: &str) -> Result<Task> {
        let description = validate_description(description)?;

        let _guard = self.lock.lock().await;
        let mut collection = self.store.load().await?;

        let task = collection.find_mut(id)?;
        task.description = description;
        task.touch();
        let updated = task.clone();

        self.store.save(&collection).await?;
        debug!("Updated description of task {}", id);
        Ok(updated)
    }

    /// Delete a task. Its id is not reused.
    pub async fn delete(&self, id: u64) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut collection = self.store.load().await?;

        collection.remove(id)?;

        self.store.save(&collection).await?;
        debug!("Deleted task {}", id);
        Ok(())
    }

    /// Move a task to `status`, given in its string form
    pub async fn change_status(&self, id: u64, status: &str) -> Result<Task> {
        let status: TaskStatus = status.parse()?;

        let _guard = self.lock.lock().await;
        let mut collection = self.store.load().await?;

        let task = collection.find_mut(id)?;
        task.status = status;
        task.touch();
        let updated = task.clone();

        self.store.save(&collection).await?;
        debug!("Task {} is now {}", id, status);
        Ok(updated)
    }

    /// List tasks in creation order, optionally only those with `status`.
    ///
    /// An empty filter is treated as no filter.
    pub async fn list(&self, status: Option<&str>) -> Result<Vec<Task>> {
        let _guard = self.lock.lock().await;
        let collection = self.store.load().await?;

        let filter = match status.filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<TaskStatus>()?),
            None => None,
        };

        Ok(match filter {
            Some(status) => collection
                .tasks
                .into_iter()
                .filter(|t| t.status == status)
                .collect(),
            None => collection.tasks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskCollection;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn create_test_repo() -> (TaskRepository, Arc<FileTaskStore>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FileTaskStore::new(temp_dir.path().join("tasks.json")));
        let repo = TaskRepository::new(store.clone());
        (repo, store, temp_dir)
    }

    /// Store one task whose timestamps lie in the past
    async fn seed_old_task(store: &FileTaskStore) -> Task {
        let old = Utc.with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap();
        let mut task = Task::new(1, "Seeded");
        task.created_at = old;
        task.updated_at = old;
        store
            .save(&TaskCollection {
                last_id: 1,
                tasks: vec![task.clone()],
            })
            .await
            .unwrap();
        task
    }

    #[test]
    fn test_validate_description() {
        assert_eq!(validate_description("  Buy milk \n").unwrap(), "Buy milk");
        assert!(matches!(validate_description(""), Err(Error::Validation(_))));
        assert!(matches!(validate_description(" \t "), Err(Error::Validation(_))));

        let longest = "é".repeat(MAX_DESCRIPTION_CHARS);
        assert_eq!(validate_description(&longest).unwrap(), longest);

        let too_long = "x".repeat(MAX_DESCRIPTION_CHARS + 1);
        match validate_description(&too_long) {
            Err(Error::Validation(msg)) => assert!(msg.contains("150")),
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_add_then_list() {
        let (repo, _store, _temp) = create_test_repo();

        let created = repo.add("  Buy milk  ").await.unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(created.description, "Buy milk");
        assert_eq!(created.status, TaskStatus::Todo);
        assert_eq!(created.created_at, created.updated_at);

        let tasks = repo.list(None).await.unwrap();
        assert_eq!(tasks, vec![created]);
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_description_without_writing() {
        let (repo, store, _temp) = create_test_repo();

        assert!(matches!(repo.add("   ").await, Err(Error::Validation(_))));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_ids_are_never_reused() {
        let (repo, store, _temp) = create_test_repo();

        let first = repo.add("First").await.unwrap();
        repo.delete(first.id).await.unwrap();
        let second = repo.add("Second").await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.load().await.unwrap().last_id, 2);
    }

    #[tokio::test]
    async fn test_update_description() {
        let (repo, store, _temp) = create_test_repo();
        let seeded = seed_old_task(&store).await;

        let updated = repo.update(1, " Renamed ").await.unwrap();
        assert_eq!(updated.description, "Renamed");
        assert_eq!(updated.created_at, seeded.created_at);
        assert!(updated.updated_at > seeded.updated_at);

        assert_eq!(repo.get(1).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_with_blank_description_leaves_collection_unchanged() {
        let (repo, store, _temp) = create_test_repo();
        repo.add("Keep me").await.unwrap();
        let before = store.load().await.unwrap();

        for blank in ["", "  "] {
            let result = repo.update(1, blank).await;
            assert!(matches!(result, Err(Error::Validation(_))));
        }

        assert_eq!(store.load().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_update_missing_task() {
        let (repo, _store, _temp) = create_test_repo();

        match repo.update(42, "Anything").await {
            Err(Error::TaskNotFound(42)) => {}
            other => panic!("Expected TaskNotFound error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_change_status() {
        let (repo, store, _temp) = create_test_repo();
        let seeded = seed_old_task(&store).await;

        let updated = repo.change_status(1, "done").await.unwrap();
        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(updated.created_at, seeded.created_at);
        assert!(updated.updated_at > seeded.updated_at);

        let updated = repo.change_status(1, "in-progress").await.unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn test_change_status_rejects_unknown_status() {
        let (repo, store, _temp) = create_test_repo();
        let seeded = seed_old_task(&store).await;

        let result = repo.change_status(1, "bogus").await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(repo.get(1).await.unwrap(), seeded);

        let result = repo.change_status(99, "done").await;
        assert!(matches!(result, Err(Error::TaskNotFound(99))));
    }

    #[tokio::test]
    async fn test_delete_missing_task_leaves_collection_unchanged() {
        let (repo, store, _temp) = create_test_repo();
        repo.add("Stay").await.unwrap();
        let before = store.load().await.unwrap();

        let result = repo.delete(7).await;
        assert!(matches!(result, Err(Error::TaskNotFound(7))));
        assert_eq!(store.load().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_list_filters_and_keeps_insertion_order() {
        let (repo, _store, _temp) = create_test_repo();
        for description in ["One", "Two", "Three", "Four"] {
            repo.add(description).await.unwrap();
        }
        repo.change_status(3, "done").await.unwrap();
        repo.change_status(1, "done").await.unwrap();
        repo.change_status(2, "in-progress").await.unwrap();

        let done: Vec<u64> = repo
            .list(Some("done"))
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(done, vec![1, 3]);

        let todo = repo.list(Some("todo")).await.unwrap();
        assert_eq!(todo.len(), 1);
        assert_eq!(todo[0].description, "Four");

        let all: Vec<u64> = repo.list(Some("")).await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(all, vec![1, 2, 3, 4]);

        assert!(matches!(
            repo.list(Some("archived")).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            repo.list(Some(" ")).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_walkthrough() {
        let (repo, _store, _temp) = create_test_repo();

        let milk = repo.add("Buy milk").await.unwrap();
        assert_eq!(milk.id, 1);
        assert_eq!(milk.status, TaskStatus::Todo);

        let report = repo.add("Write report").await.unwrap();
        assert_eq!(report.id, 2);

        repo.change_status(1, "done").await.unwrap();
        assert_eq!(repo.get(2).await.unwrap(), report);

        let done = repo.list(Some("done")).await.unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, 1);

        repo.delete(2).await.unwrap();
        let remaining = repo.list(None).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, 1);

        assert!(matches!(repo.delete(2).await, Err(Error::TaskNotFound(2))));
    }

    #[tokio::test]
    async fn test_concurrent_adds_get_distinct_ids() {
        let (repo, _store, _temp) = create_test_repo();
        let repo = Arc::new(repo);

        let handles: Vec<_> = (0..25)
            .map(|i| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move { repo.add(&format!("Task {}", i)).await.unwrap() })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().id);
        }
        ids.sort_unstable();

        assert_eq!(ids, (1..=25).collect::<Vec<u64>>());
        assert_eq!(repo.list(None).await.unwrap().len(), 25);
    }

    #[tokio::test]
    async fn test_add_fails_when_id_counter_is_exhausted() {
        let (repo, store, _temp) = create_test_repo();
        let full = TaskCollection {
            last_id: u64::MAX,
            tasks: Vec::new(),
        };
        store.save(&full).await.unwrap();

        match repo.add("One too many").await {
            Err(Error::Storage(msg)) => assert!(msg.contains("exhausted")),
            other => panic!("Expected Storage error, got: {:?}", other),
        }
        assert_eq!(store.load().await.unwrap(), full);
    }

    #[tokio::test]
    async fn test_corrupt_file_recovers_on_next_add() {
        let (repo, store, _temp) = create_test_repo();
        tokio::fs::write(store.path(), "[[[").await.unwrap();

        let task = repo.add("Fresh start").await.unwrap();
        assert_eq!(task.id, 1);
        assert!(store.backup_path().exists());
        assert_eq!(repo.list(None).await.unwrap().len(), 1);
    }
}
