use eyre::Result;
use std::{fs, path::PathBuf};

use crate::settings::Settings;

/// Loaded configuration plus where it came from. The file holds a single
/// `"Settings"` object; a missing file is seeded with defaults on first run.
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    filepath: PathBuf,
}

impl Config {
    pub fn new() -> Result<Self> {
        let prefix = get_app_data_prefix()?;
        Self::load_from(prefix.join("configuration.json"))
    }

    pub fn load_from(filepath: PathBuf) -> Result<Self> {
        let mut settings = Settings::default();

        if filepath.exists() {
            let config_str = fs::read_to_string(&filepath)?;
            if let Ok(user_config) = serde_json::from_str::<serde_json::Value>(&config_str) {
                if let Some(user_settings) = user_config.get("Settings") {
                    match serde_json::from_value::<Settings>(user_settings.clone()) {
                        Ok(parsed) => settings.merge(parsed),
                        Err(err) => {
                            crate::logging::warn(format!(
                                "Ignoring malformed Settings section in {}: {err}",
                                filepath.display()
                            ));
                        }
                    }
                }
            }
        } else {
            // Save initial config if it doesn't exist
            let initial_config = serde_json::json!({ "Settings": settings });
            if let Some(parent) = filepath.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&filepath, serde_json::to_string_pretty(&initial_config)?)?;
        }

        Ok(Self { settings, filepath })
    }

    pub fn filepath(&self) -> &PathBuf {
        &self.filepath
    }
}

pub fn get_app_data_prefix() -> Result<PathBuf> {
    if let Some(config_home) = std::env::var_os("XDG_CONFIG_HOME") {
        let path = PathBuf::from(config_home).join("readtrack");
        return Ok(path);
    } else if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(home.clone()).join(".config").join("readtrack");
        if path.exists() {
            return Ok(path);
        } else {
            return Ok(PathBuf::from(home).join(".readtrack"));
        }
    } else if let Some(user_profile) = std::env::var_os("USERPROFILE") {
        return Ok(PathBuf::from(user_profile).join(".readtrack"));
    }

    Err(eyre::eyre!(
        "Could not determine application data directory"
    ))
}
