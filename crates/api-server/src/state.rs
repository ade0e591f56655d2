//! Application state

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracker_core::task::TaskRepository;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    tasks: TaskRepository,
    tasks_file: PathBuf,
}

impl AppState {
    /// Create a new AppState storing tasks in `tasks_file`
    pub fn new(tasks_file: PathBuf) -> Self {
        let tasks = TaskRepository::with_file(tasks_file.clone());
        Self {
            inner: Arc::new(AppStateInner { tasks, tasks_file }),
        }
    }

    /// Get reference to the task repository
    pub fn tasks(&self) -> &TaskRepository {
        &self.inner.tasks
    }

    pub fn tasks_file(&self) -> &Path {
        &self.inner.tasks_file
    }
}
