//! Task module
//!
//! This module contains task-related types and logic.

mod file_store;
mod model;
mod repository;

pub use file_store::{FileTaskStore, TaskStore};
pub use model::*;
pub use repository::{validate_description, TaskRepository, MAX_DESCRIPTION_CHARS};
