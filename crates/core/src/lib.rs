//! Core library for the task tracker
//!
//! This crate contains the persistence and mutation layer:
//! - Task model and status
//! - File-backed collection store
//! - Task repository with validation

pub mod error;
pub mod task;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
