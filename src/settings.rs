//! Startup configuration
//!
//! Built exactly once at startup: the resolved [`AppPaths`] plus the
//! optional `ftdesk.toml` overrides. Components receive an [`AppConfig`] (or the part they need)
//! instead of reading process-wide state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Name of the optional override file at the application root
pub const SETTINGS_FILE: &str = "ftdesk.toml";

/// Environment variable that pins the application root
pub const ROOT_ENV: &str = "FTDESK_ROOT";

/// Fixed locations derived from the application root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Working directory of every child process
    pub root: PathBuf,
    /// `user_data` directory shared with the bot container
    pub user_data: PathBuf,
    /// Strategy sources
    pub strategies: PathBuf,
    /// The bot's main configuration document
    pub config: PathBuf,
    /// Previously entered pair strings
    pub pair_history: PathBuf,
}

impl AppPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let user_data = root.join("user_data");
        Self {
            strategies: user_data.join("strategies"),
            config: user_data.join("config.json"),
            pair_history: user_data.join("pairs_history.json"),
            user_data,
            root,
        }
    }

    /// Resolve the root from an explicit flag, the environment, or the
    /// executable location, in that order.
    pub fn resolve(explicit: Option<&Path>) -> Self {
        if let Some(dir) = explicit {
            return Self::new(dir);
        }
        if let Some(dir) = std::env::var_os(ROOT_ENV).filter(|v| !v.is_empty()) {
            return Self::new(PathBuf::from(dir));
        }
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        match exe_dir {
            Some(dir) => Self::new(dir),
            None => Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))),
        }
    }
}

/// Orchestrator invocation
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ComposeSettings {
    /// Program prefix, e.g. `docker compose` or `docker-compose`
    pub program: String,
    /// Service that runs the bot toolchain
    pub service: String,
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            program: "docker compose".to_string(),
            service: "freqtrade".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StatusSettings {
    pub poll_interval_secs: u64,
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self { poll_interval_secs: 3 }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FrequiSettings {
    pub url: String,
}

impl Default for FrequiSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LabSettings {
    /// Config file preselected when it exists in `user_data`
    pub default_config: String,
}

impl Default for LabSettings {
    fn default() -> Self {
        Self {
            default_config: "back.json".to_string(),
        }
    }
}

/// Optional overrides read from `ftdesk.toml`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub compose: ComposeSettings,
    pub status: StatusSettings,
    pub frequi: FrequiSettings,
    pub lab: LabSettings,
}

impl Settings {
    /// Load overrides from `root/ftdesk.toml`. Missing or malformed files
    /// fall back to defaults.
    pub fn load(root: &Path) -> Self {
        let path = root.join(SETTINGS_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No {} at {}, using defaults", SETTINGS_FILE, root.display());
                return Self::default();
            }
            Err(e) => {
                tracing::warn!("Could not read {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match toml::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring malformed {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.status.poll_interval_secs.max(1))
    }

    /// `docker compose run --rm freqtrade`
    pub fn run_prefix(&self) -> String {
        format!("{} run --rm {}", self.compose.program, self.compose.service)
    }
}

/// Immutable bundle handed to the dispatcher at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub paths: AppPaths,
    pub settings: Settings,
}

impl AppConfig {
    pub fn load(explicit_root: Option<&Path>) -> Self {
        let paths = AppPaths::resolve(explicit_root);
        let settings = Settings::load(&paths.root);
        Self { paths, settings }
    }
}
