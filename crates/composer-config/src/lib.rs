use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Background save settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    pub enabled: bool,
    /// Quiet period after the last edit before saving
    pub delay_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontmatterConfig {
    /// `key: value` lines needed before undelimited text counts as frontmatter
    pub min_pairs: usize,
    /// Regex a key must match; the engine default applies when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_pattern: Option<String>,
    /// Keys of a newly added frontmatter block
    pub template: Vec<String>,
}

impl Default for FrontmatterConfig {
    fn default() -> Self {
        Self {
            min_pairs: 2,
            key_pattern: None,
            template: vec!["subject".to_string(), "preheader".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    pub min_name_len: usize,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self { min_name_len: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one JSON file per composition
    pub store_path: PathBuf,
    #[serde(default)]
    pub autosave: AutosaveConfig,
    #[serde(default)]
    pub frontmatter: FrontmatterConfig,
    #[serde(default)]
    pub save: SaveConfig,
}

impl Config {
    /// Defaults for every section, storing compositions under `store_path`
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            autosave: AutosaveConfig::default(),
            frontmatter: FrontmatterConfig::default(),
            save: SaveConfig::default(),
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the store path
        config.store_path = Self::expand_path(&config.store_path).unwrap_or(config.store_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/composer");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Default store location when no config file exists
    pub fn default_store_path() -> PathBuf {
        let data_dir = shellexpand::tilde("~/.local/share/composer/compositions");
        PathBuf::from(data_dir.as_ref())
    }

    pub fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::default_store_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/composer/config.toml"));
    }

    #[test]
    fn test_minimal_file_uses_section_defaults() {
        let config: Config = toml::from_str(r#"store_path = "/srv/compositions""#).unwrap();

        assert_eq!(config, Config::new("/srv/compositions"));
        assert_eq!(config.autosave.delay_ms, 5000);
        assert_eq!(config.frontmatter.min_pairs, 2);
        assert_eq!(config.save.min_name_len, 3);
    }

    #[test]
    fn test_sections_override_defaults() {
        let config_content = r#"
store_path = "/srv/compositions"

[autosave]
enabled = false
delay_ms = 1500

[frontmatter]
min_pairs = 3
key_pattern = "^[a-z]+$"
template = ["title", "description"]

[save]
min_name_len = 5
"#;

        let config: Config = toml::from_str(config_content).unwrap();

        assert!(!config.autosave.enabled);
        assert_eq!(config.autosave.delay_ms, 1500);
        assert_eq!(config.frontmatter.min_pairs, 3);
        assert_eq!(config.frontmatter.key_pattern.as_deref(), Some("^[a-z]+$"));
        assert_eq!(config.frontmatter.template, vec!["title", "description"]);
        assert_eq!(config.save.min_name_len, 5);
    }

    #[test]
    fn test_missing_store_path_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "[autosave]\nenabled = true\n").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();

        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_leaves_plain_paths_alone() {
        for path in ["/absolute/path", "relative/path"] {
            let path = PathBuf::from(path);
            assert_eq!(Config::expand_path(&path).unwrap(), path);
        }
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let mut test_config = Config::new("/tmp/test-compositions");
        test_config.autosave.delay_ms = 2500;
        test_config.frontmatter.template = vec!["title".to_string()];

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_store_path_env_var_is_expanded_on_load() {
        unsafe {
            env::set_var("COMPOSER_TEST_ROOT", "/custom/data");
        }
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "store_path = \"$COMPOSER_TEST_ROOT/compositions\"\n").unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(config.store_path, PathBuf::from("/custom/data/compositions"));

        unsafe {
            env::remove_var("COMPOSER_TEST_ROOT");
        }
    }
}
