use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};

/// Storage engine backing the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    /// One SQLite file per database under the data directory.
    Sqlite,
    /// Process memory; nothing survives a restart.
    Memory,
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Engine::Sqlite),
            "memory" | "inmemory" => Ok(Engine::Memory),
            other => Err(format!("unknown storage engine `{other}`")),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::Sqlite => write!(f, "sqlite"),
            Engine::Memory => write!(f, "memory"),
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// Together `engine`, `data_dir` and `database` form the storage descriptor
/// used both by provisioning and by the per-request connections.
#[derive(Debug, Clone)]
pub struct Config {
    /// Storage engine (default: sqlite)
    pub engine: Engine,
    /// Directory the SQLite engine keeps its database files in (default: "data")
    pub data_dir: PathBuf,
    /// Database name (default: "todos")
    pub database: String,
    /// Per-request timeout in seconds (default: 10)
    pub request_timeout_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TODOS_ENGINE` - `sqlite` or `memory` (default: sqlite)
    /// - `TODOS_DATA_DIR` - SQLite data directory (default: "data")
    /// - `TODOS_DB` - Database name (default: "todos")
    /// - `REQUEST_TIMEOUT_SECONDS` - Per-request timeout (default: 10)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Values that fail to parse fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            engine: lookup("TODOS_ENGINE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(Engine::Sqlite),
            data_dir: lookup("TODOS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            database: lookup("TODOS_DB").unwrap_or_else(|| "todos".to_string()),
            request_timeout_seconds: lookup("REQUEST_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        }
    }

    /// Get the request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
