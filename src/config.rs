//! User configuration stored in `config.yml`.
//!
//! The config directory is `$CLICKUP_CONFIG_DIR` when set, otherwise
//! `clickup/` under the platform config directory. Credentials live next to
//! it in `auth.yml` (see [`crate::auth::store`]).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_DIR_ENV: &str = "CLICKUP_CONFIG_DIR";
pub const CONFIG_FILE: &str = "config.yml";

/// Keys accepted by `clickup config get|set`.
pub const KEYS: &[&str] = &[
    "workspace",
    "space",
    "sprint_folder",
    "link_field",
    "editor",
    "prompt",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no workspace configured\n\nRun 'clickup auth login' or 'clickup config set workspace <id>'")]
    MissingWorkspace,

    #[error("no space configured\n\nRun 'clickup space select' or pass --space <id>")]
    MissingSpace,

    #[error("unknown config key {0:?}\n\nValid keys: {keys}", keys = KEYS.join(", "))]
    UnknownKey(String),
}

/// Per-directory overrides, keyed by absolute directory path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub space: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link_field: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub workspace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub space: String,
    /// Folder whose lists are sprints; remembered after the first lookup.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sprint_folder: String,
    /// Custom field that receives links instead of the task description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link_field: String,
    /// Command used to write comments; `$VISUAL` or `$EDITOR` when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub editor: String,
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub directory_defaults: BTreeMap<String, DirectoryConfig>,
}

fn default_prompt() -> String {
    "enabled".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: String::new(),
            space: String::new(),
            sprint_folder: String::new(),
            link_field: String::new(),
            editor: String::new(),
            prompt: default_prompt(),
            directory_defaults: BTreeMap::new(),
        }
    }
}

/// Directory holding `config.yml` and `auth.yml`.
pub fn config_dir() -> PathBuf {
    match std::env::var(CONFIG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("clickup"),
    }
}

pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

impl Config {
    /// Load the config, returning defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory {}", dir.display()))?;
        }
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Space for `dir`, falling back to the global default.
    pub fn space_for_dir(&self, dir: &Path) -> Option<&str> {
        self.directory_override(dir, |d| &d.space)
            .or(Some(self.space.as_str()))
            .filter(|s| !s.is_empty())
    }

    /// Link field for `dir`, falling back to the global default.
    pub fn link_field_for_dir(&self, dir: &Path) -> Option<&str> {
        self.directory_override(dir, |d| &d.link_field)
            .or(Some(self.link_field.as_str()))
            .filter(|s| !s.is_empty())
    }

    fn directory_override<'a>(
        &'a self,
        dir: &Path,
        field: impl Fn(&'a DirectoryConfig) -> &'a String,
    ) -> Option<&'a str> {
        self.directory_defaults
            .get(dir.to_string_lossy().as_ref())
            .map(field)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn set_directory_default(&mut self, dir: &Path, defaults: DirectoryConfig) {
        self.directory_defaults
            .insert(dir.to_string_lossy().into_owned(), defaults);
    }

    pub fn require_workspace(&self) -> Result<&str, ConfigError> {
        Some(self.workspace.as_str())
            .filter(|w| !w.is_empty())
            .ok_or(ConfigError::MissingWorkspace)
    }

    pub fn get(&self, key: &str) -> Result<&str, ConfigError> {
        let value = match key {
            "workspace" => &self.workspace,
            "space" => &self.space,
            "sprint_folder" => &self.sprint_folder,
            "link_field" => &self.link_field,
            "editor" => &self.editor,
            "prompt" => &self.prompt,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let slot = match key {
            "workspace" => &mut self.workspace,
            "space" => &mut self.space,
            "sprint_folder" => &mut self.sprint_folder,
            "link_field" => &mut self.link_field,
            "editor" => &mut self.editor,
            "prompt" => &mut self.prompt,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        *slot = value.to_string();
        Ok(())
    }

    pub fn prompts_enabled(&self) -> bool {
        self.prompt != "disabled"
    }

    pub fn editor_command(&self) -> Option<&str> {
        Some(self.editor.trim()).filter(|e| !e.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config() {
        let content = r#"
workspace: "9001"
space: "42"
link_field: Links
directory_defaults:
  /work/api:
    space: "77"
"#;
        let config = Config::parse(content).unwrap();
        assert_eq!(config.workspace, "9001");
        assert_eq!(config.prompt, "enabled");
        assert_eq!(config.space_for_dir(Path::new("/work/api")), Some("77"));
        assert_eq!(config.space_for_dir(Path::new("/elsewhere")), Some("42"));
        // no link_field override, so the global one applies
        assert_eq!(config.link_field_for_dir(Path::new("/work/api")), Some("Links"));
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
        let config = Config::default();
        assert_eq!(config.space_for_dir(Path::new("/x")), None);
        assert_eq!(config.require_workspace(), Err(ConfigError::MissingWorkspace));
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_from(&tmp.path().join("config.yml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.yml");

        let mut config = Config::default();
        config.set("workspace", "123").unwrap();
        config.set_directory_default(
            Path::new("/repo"),
            DirectoryConfig {
                space: String::new(),
                link_field: "GitHub".into(),
            },
        );
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.link_field_for_dir(Path::new("/repo")), Some("GitHub"));
        assert!(!fs::read_to_string(&path).unwrap().contains("sprint_folder"));
    }

    #[test]
    fn test_get_set_unknown_key() {
        let mut config = Config::default();
        assert_eq!(config.get("prompt"), Ok("enabled"));
        assert!(matches!(config.set("colour", "red"), Err(ConfigError::UnknownKey(_))));
        config.set("prompt", "disabled").unwrap();
        assert!(!config.prompts_enabled());
    }

    #[test]
    fn test_editor_command() {
        let mut config = Config::default();
        assert_eq!(config.editor_command(), None);
        config.set("editor", "  ").unwrap();
        assert_eq!(config.editor_command(), None);
        config.set("editor", "code --wait").unwrap();
        assert_eq!(config.editor_command(), Some("code --wait"));
    }

    #[test]
    fn test_old_aliases_key_is_ignored() {
        let config = Config::parse("workspace: \"1\"\naliases:\n  s: status set\n").unwrap();
        assert_eq!(config.workspace, "1");
        assert!(!serde_yaml::to_string(&config).unwrap().contains("aliases"));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(Config::parse("workspace: [unclosed").is_err());
    }
}
