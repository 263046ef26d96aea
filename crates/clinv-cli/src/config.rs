//! Configuration loading and types

use std::path::{Path, PathBuf};

use clinv_aws::AwsConfig;
use clinv_inventory::ScoringWeights;
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "clinv.toml";

/// Top-level configuration of the `clinv` command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `source_data.yaml` and `user_data.yaml`
    #[serde(default)]
    pub data_path: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log format, `text` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Provider settings
    #[serde(default)]
    pub aws: AwsConfig,
    /// Score weights
    #[serde(default)]
    pub scoring: ScoringWeights,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: None,
            log_level: default_log_level(),
            log_format: default_log_format(),
            aws: AwsConfig::default(),
            scoring: ScoringWeights::default(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the first config found, or defaults
    ///
    /// Lookup order: the explicit path, `CLINV_CONFIG`, `./clinv.toml`, then
    /// the user config directory. Returns the path the config came from.
    ///
    /// # Errors
    /// Returns error if the selected file cannot be read or parsed
    pub fn discover(explicit: Option<&Path>) -> eyre::Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        if let Ok(path) = std::env::var("CLINV_CONFIG") {
            let path = PathBuf::from(path);
            return Ok((Self::load(&path)?, Some(path)));
        }

        let paths = [
            Some(PathBuf::from(CONFIG_FILE)),
            dirs::config_dir().map(|p| p.join("clinv").join(CONFIG_FILE)),
        ];

        for path in paths.into_iter().flatten() {
            if path.exists() {
                return Ok((Self::load(&path)?, Some(path)));
            }
        }

        Ok((Config::default(), None))
    }

    /// Data directory, with a leading `~` expanded
    ///
    /// Defaults to `clinv` inside the user data directory.
    #[must_use]
    pub fn data_path(&self) -> PathBuf {
        match &self.data_path {
            Some(path) => expand_home(path),
            None => dirs::data_dir()
                .map(|p| p.join("clinv"))
                .unwrap_or_else(|| PathBuf::from(".clinv")),
        }
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
data_path = "/srv/clinv"
log_level = "info"

[aws]
regions = ["us-east-1", "eu-west-1"]
profile = "audit"

[scoring]
personal_data = 50

[scoring.access]
public = 1
"#,
        )
        .unwrap();

        assert_eq!(config.data_path(), PathBuf::from("/srv/clinv"));
        assert_eq!(config.aws.regions.len(), 2);
        assert_eq!(config.aws.timeout_secs, 120);
        assert_eq!(config.scoring.personal_data, 50);
        assert_eq!(config.scoring.information, 10);
        assert_eq!(config.scoring.access.get("public"), Some(&1));
        assert_eq!(config.log_format, "text");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.aws, AwsConfig::default());
        assert_eq!(config.scoring, ScoringWeights::default());
    }

    #[test]
    fn test_discover_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();

        let (config, source) = Config::discover(Some(file.path())).unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(source.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_discover_missing_explicit_path_fails() {
        assert!(Config::discover(Some(Path::new("/nonexistent/clinv.toml"))).is_err());
    }

    #[test]
    fn test_home_expansion() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/inventory")), home.join("inventory"));
        }
        assert_eq!(expand_home(Path::new("/abs")), PathBuf::from("/abs"));
    }
}
