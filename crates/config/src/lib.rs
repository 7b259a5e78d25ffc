//! Configuration loading for Remit services
//!
//! Provides utilities for loading and saving JSON files in the shared
//! Remit config directory (~/.config/remit/, overridable with
//! REMIT_CONFIG_DIR for tests and containerized deployments).
//!
//! Call [`init`] at process startup to bootstrap the config directory.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Directory name under the platform config root
const APP_DIR: &str = "remit";

/// Environment variable overriding the config directory location
const DIR_OVERRIDE_ENV: &str = "REMIT_CONFIG_DIR";

/// Initialize the Remit config directory.
///
/// Creates the directory if it doesn't exist. Call this once at startup.
pub fn init() -> Result<PathBuf> {
    ensure_config_dir()
}

/// Get the Remit config directory
///
/// Honors REMIT_CONFIG_DIR when set, otherwise ~/.config/remit/.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(DIR_OVERRIDE_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|p| p.join(APP_DIR))
}

/// Get the path to a file within the Remit config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Check if a file exists in the Remit config directory
pub fn config_exists(filename: &str) -> bool {
    config_path(filename).is_some_and(|p| p.exists())
}

/// Load and parse a JSON file from the Remit config directory
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = config_path(filename).context("Could not determine config directory")?;
    load_json_file(&path)
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Save a value as pretty-printed JSON in the Remit config directory
pub fn save_json<T: Serialize>(filename: &str, value: &T) -> Result<()> {
    let dir = ensure_config_dir()?;
    save_json_file(&dir.join(filename), value)
}

/// Save a value as pretty-printed JSON to an arbitrary path
pub fn save_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

/// Ensure the Remit config directory exists
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir().context("Could not determine config directory")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_under_dir() {
        let path = config_path("settings.json");
        assert!(path.is_some());
        assert!(path.unwrap().ends_with("settings.json"));
    }

    #[test]
    fn test_json_round_trip() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Sample {
            name: String,
            count: u32,
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        let value = Sample {
            name: "remit".to_string(),
            count: 3,
        };

        save_json_file(&path, &value).unwrap();
        let loaded: Sample = load_json_file(&path).unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let result: Result<serde_json::Value> = load_json_file(&path);
        assert!(result.is_err());
    }
}
