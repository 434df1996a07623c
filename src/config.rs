//! Settings storage
//!
//! Three string settings (API key, model, system prompt) persisted as a TOML
//! file under the platform config directory. The file is a partial overlay on
//! top of defaults; environment variables override the file.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default chat model identifier
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-chat:free";

/// Default system prompt
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Vivica, a helpful and friendly AI assistant. \
     Respond conversationally and keep responses concise for voice interaction.";

/// User-editable assistant settings
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    /// Bearer credential for the completion API
    pub api_key: String,

    /// Chat model identifier
    pub model: String,

    /// System prompt prepended to every query
    pub system_prompt: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl Settings {
    /// Whether an API credential is configured
    #[must_use]
    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Partial TOML settings file schema
///
/// All fields are optional — missing fields keep their defaults.
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    api_key: Option<String>,
    model: Option<String>,
    system_prompt: Option<String>,
}

/// Loads and saves [`Settings`] at a fixed path
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Create a store at the platform default location
    /// (e.g. `~/.config/vivica/settings.toml` on Linux)
    ///
    /// # Errors
    ///
    /// Returns error if no home directory can be determined
    pub fn open_default() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "vivica")
            .ok_or_else(|| Error::Config("could not determine config directory".to_string()))?;

        Ok(Self {
            path: dirs.config_dir().join("settings.toml"),
        })
    }

    /// Create a store at an explicit path
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, overlaying the file (if present) and `VIVICA_*`
    /// environment variables on top of defaults
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(&self) -> Result<Settings> {
        let mut settings = Settings::default();

        if self.path.exists() {
            let raw = std::fs::read_to_string(&self.path)?;
            let file: SettingsFile = toml::from_str(&raw)?;

            if let Some(api_key) = file.api_key {
                settings.api_key = api_key;
            }
            if let Some(model) = file.model {
                settings.model = model;
            }
            if let Some(system_prompt) = file.system_prompt {
                settings.system_prompt = system_prompt;
            }

            tracing::debug!(path = %self.path.display(), "settings file loaded");
        }

        for (var, field) in [
            ("VIVICA_API_KEY", &mut settings.api_key),
            ("VIVICA_MODEL", &mut settings.model),
            ("VIVICA_SYSTEM_PROMPT", &mut settings.system_prompt),
        ] {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    *field = value;
                }
            }
        }

        Ok(settings)
    }

    /// Persist settings, creating parent directories as needed
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let raw = toml::to_string_pretty(settings)?;
        std::fs::write(&self.path, raw)?;

        tracing::info!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vivica-test-{}-{name}.toml", std::process::id()))
    }

    #[test]
    fn test_defaults_without_file() {
        let store = SettingsStore::at(scratch_path("missing"));
        let settings = store.load().unwrap();

        assert!(settings.api_key.is_empty());
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert!(!settings.has_credential());
    }

    #[test]
    fn test_partial_overlay() {
        let path = scratch_path("partial");
        std::fs::write(&path, "model = \"other/model\"\n").unwrap();

        let store = SettingsStore::at(&path);
        let settings = store.load().unwrap();

        assert_eq!(settings.model, "other/model");
        assert_eq!(settings.system_prompt, DEFAULT_SYSTEM_PROMPT);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let path = scratch_path("roundtrip");
        let store = SettingsStore::at(&path);

        let settings = Settings {
            api_key: "sk-test".to_string(),
            model: "some/model".to_string(),
            system_prompt: "Be terse.".to_string(),
        };
        store.save(&settings).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.api_key, "sk-test");
        assert_eq!(loaded.model, "some/model");
        assert_eq!(loaded.system_prompt, "Be terse.");
        assert!(loaded.has_credential());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_blank_credential_is_missing() {
        let settings = Settings {
            api_key: "   ".to_string(),
            ..Settings::default()
        };
        assert!(!settings.has_credential());
    }
}
