use std::path::PathBuf;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long to wait for background tasks after the server stops (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Directory the filesystem content source reads `<path>.md` from.
    pub content_root: PathBuf,
    /// Number of memoized diffs (default: `256`, `0` disables the cache).
    pub diff_cache_capacity: usize,
    /// Idle time after which a session is ended with discard semantics.
    pub session_stale_timeout_secs: u64,
    /// How often the stale-session sweeper runs.
    pub session_sweep_interval_secs: u64,
    /// How often active sessions are checkpointed; `0` disables autosave.
    pub autosave_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `HOST`                        | `0.0.0.0`               |
    /// | `PORT`                        | `3000`                  |
    /// | `CORS_ORIGINS`                | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | `30`                    |
    /// | `CONTENT_ROOT`                | `./content`             |
    /// | `DIFF_CACHE_CAPACITY`         | `256`                   |
    /// | `SESSION_STALE_TIMEOUT_SECS`  | `1800`                  |
    /// | `SESSION_SWEEP_INTERVAL_SECS` | `60`                    |
    /// | `AUTOSAVE_INTERVAL_SECS`      | `30`                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let content_root =
            PathBuf::from(std::env::var("CONTENT_ROOT").unwrap_or_else(|_| "./content".into()));

        let diff_cache_capacity: usize = std::env::var("DIFF_CACHE_CAPACITY")
            .unwrap_or_else(|_| "256".into())
            .parse()
            .expect("DIFF_CACHE_CAPACITY must be a valid usize");

        let session_stale_timeout_secs: u64 = std::env::var("SESSION_STALE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "1800".into())
            .parse()
            .expect("SESSION_STALE_TIMEOUT_SECS must be a valid u64");

        let session_sweep_interval_secs: u64 = std::env::var("SESSION_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("SESSION_SWEEP_INTERVAL_SECS must be a valid u64");

        let autosave_interval_secs: u64 = std::env::var("AUTOSAVE_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("AUTOSAVE_INTERVAL_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            content_root,
            diff_cache_capacity,
            session_stale_timeout_secs,
            session_sweep_interval_secs,
            autosave_interval_secs,
        }
    }
}
