//! Engine configuration from the environment.
//!
//! Values come from `DHSHEET_*` variables after `.env.local` / `.env` are
//! loaded from the repository root. Unset or unparsable values fall back to
//! typed defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_LOG_FILTER: &str = "dhsheet_engine=info";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Quiet period before queued resource deltas are written.
    pub debounce_window: Duration,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// World export read by the migration binary when no path is given.
    pub world_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_window: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            world_path: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process environment in `from_env`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let value = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let debounce_window = value("DHSHEET_DEBOUNCE_MS")
            .and_then(|ms| match ms.parse::<u64>() {
                Ok(ms) => Some(Duration::from_millis(ms)),
                Err(_) => {
                    tracing::warn!(value = %ms, "Ignoring unparsable DHSHEET_DEBOUNCE_MS");
                    None
                }
            })
            .unwrap_or(defaults.debounce_window);

        Self {
            debounce_window,
            log_filter: value("DHSHEET_LOG").unwrap_or(defaults.log_filter),
            world_path: value("DHSHEET_WORLD_PATH").map(PathBuf::from),
        }
    }
}

/// Load `.env.local` then `.env` from the repository root, if present.
///
/// Variables already set in the process win over file values.
pub fn load_dotenv_from_repo_root() {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
