use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use challenger_core::{DEFAULT_GROUP, GroupMap};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::CliError;

/// Settings file looked up in the working directory when `--settings` is absent.
pub const DEFAULT_SETTINGS_FILE: &str = "challenger.toml";

/// Contents of `challenger.toml`; every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Catalog JSON file.
    pub store_path: PathBuf,
    pub default_players: usize,
    /// Upper bound applied to requested player counts.
    pub max_players: usize,
    pub log_level: Option<String>,
    /// Display order of category groups.
    pub group_order: Vec<String>,
    /// Category name → display group, applied when seeding.
    pub category_groups: BTreeMap<String, String>,
    pub default_group: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("challenger.json"),
            default_players: 1,
            max_players: 10,
            log_level: None,
            group_order: Vec::new(),
            category_groups: BTreeMap::new(),
            default_group: DEFAULT_GROUP.to_string(),
        }
    }
}

impl Settings {
    pub fn group_map(&self) -> GroupMap {
        GroupMap {
            assignments: self.category_groups.clone(),
            default_group: self.default_group.clone(),
        }
    }
}

/// Load settings. An explicit path must exist; the default file is optional.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_SETTINGS_FILE), false),
    };
    if !path.exists() {
        if required {
            return Err(CliError::InvalidInput(format!(
                "settings file '{}' not found",
                path.display()
            )));
        }
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(&path)?;
    let settings: Settings = toml::from_str(&content)?;
    debug!(path = %path.display(), "settings loaded");
    Ok(settings)
}
