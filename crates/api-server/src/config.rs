//! Server configuration read from the environment

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

pub const DEFAULT_TASKS_FILE: &str = "tasks.json";
pub const DEFAULT_ADDR: &str = "127.0.0.1:8000";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// JSON file holding the task collection
    pub tasks_file: PathBuf,
    /// REST API bind address
    pub addr: SocketAddr,
    /// Allow cross-origin requests from any origin
    pub cors: bool,
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl ServerConfig {
    /// Read `TASK_TRACKER_FILE`, `TASK_TRACKER_ADDR` and `TASK_TRACKER_CORS`
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let tasks_file = lookup("TASK_TRACKER_FILE")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TASKS_FILE));

        let raw_addr = lookup("TASK_TRACKER_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = raw_addr
            .trim()
            .parse()
            .with_context(|| format!("Invalid TASK_TRACKER_ADDR '{}'", raw_addr))?;

        let cors = lookup("TASK_TRACKER_CORS")
            .and_then(|raw| parse_flag(&raw))
            .unwrap_or(false);

        Ok(Self {
            tasks_file,
            addr,
            cors,
        })
    }
}
