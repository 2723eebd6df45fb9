//! Strategy and config discovery in `user_data`

use std::path::Path;

use crate::settings::AppPaths;

const STRATEGY_EXT: &str = "py";
const STRATEGY_INIT: &str = "__init__.py";
const CONFIG_EXT: &str = "json";

/// Selectable strategies and config files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub strategies: Vec<String>,
    pub configs: Vec<String>,
    /// Config preselected for lab runs
    pub preferred_config: Option<String>,
}

impl Catalog {
    pub fn scan(paths: &AppPaths, default_config: &str) -> Self {
        let strategies = list_strategies(&paths.strategies);
        let configs = list_configs(&paths.user_data);
        let preferred_config = configs
            .iter()
            .find(|c| c.as_str() == default_config)
            .or_else(|| configs.first())
            .cloned();

        tracing::debug!(
            strategies = strategies.len(),
            configs = configs.len(),
            "Scanned user_data"
        );

        Self {
            strategies,
            configs,
            preferred_config,
        }
    }
}

/// Strategy class names: `*.py` stems, excluding the package initializer
pub fn list_strategies(dir: &Path) -> Vec<String> {
    list_files(dir, STRATEGY_EXT)
        .into_iter()
        .filter(|name| name != STRATEGY_INIT)
        .filter_map(|name| {
            Path::new(&name)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .collect()
}

/// Config file names (`*.json`)
pub fn list_configs(dir: &Path) -> Vec<String> {
    list_files(dir, CONFIG_EXT)
}

fn list_files(dir: &Path, ext: &str) -> Vec<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Cannot list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| {
            Path::new(name)
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        })
        .collect();
    names.sort();
    names
}
