//! Configuration file support for depscan.
//!
//! Provides YAML-based configuration through `depscan.config.yml` files,
//! environment overrides, and validation.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::shared::security::DEFAULT_MAX_ARCHIVE_SIZE;
use crate::shared::Result;

pub const CONFIG_FILENAME: &str = "depscan.config.yml";

const ENV_SCANNER_COMMAND: &str = "DEPENDENCY_CHECK_CMD";
const ENV_SCANNER_DATA: &str = "DEPENDENCY_CHECK_DATA";
const ENV_DATABASE_URL: &str = "DATABASE_URL";
const ENV_SCANNER_TIMEOUT: &str = "DEPSCAN_SCANNER_TIMEOUT_SECS";

/// Pipeline configuration; every field has a default.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Scanner executable (path or name on `PATH`)
    pub scanner_command: String,
    /// Arguments placed before the scanner options
    pub scanner_launcher_args: Vec<String>,
    /// Offline vulnerability feed directory
    pub scanner_data_dir: PathBuf,
    pub upload_root: PathBuf,
    pub report_root: PathBuf,
    pub database_url: String,
    pub scanner_timeout_secs: u64,
    pub max_archive_bytes: u64,
    /// Captures unknown fields for warnings.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scanner_command: "dependency-check".to_string(),
            scanner_launcher_args: Vec::new(),
            scanner_data_dir: PathBuf::from("dependency-check-data"),
            upload_root: PathBuf::from("uploads"),
            report_root: PathBuf::from("reports"),
            database_url: "sqlite://depscan.db".to_string(),
            scanner_timeout_secs: 3600,
            max_archive_bytes: DEFAULT_MAX_ARCHIVE_SIZE,
            unknown_fields: HashMap::new(),
        }
    }
}

impl PipelineConfig {
    /// Loads configuration: an explicit file, else `depscan.config.yml` in
    /// `dir` if present, else defaults. Process environment overrides are
    /// applied last.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => load_config_from_path(path)?,
            None => discover_config(dir)?.unwrap_or_default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(command) = lookup(ENV_SCANNER_COMMAND) {
            self.scanner_command = command;
        }
        if let Some(data_dir) = lookup(ENV_SCANNER_DATA) {
            self.scanner_data_dir = PathBuf::from(data_dir);
        }
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            self.database_url = url;
        }
        if let Some(timeout) = lookup(ENV_SCANNER_TIMEOUT) {
            self.scanner_timeout_secs = timeout.trim().parse().with_context(|| {
                format!(
                    "Invalid {} value: '{}'\n\n💡 Hint: Use a whole number of seconds (e.g., 3600).",
                    ENV_SCANNER_TIMEOUT, timeout
                )
            })?;
        }
        Ok(())
    }

    /// Validate the loaded configuration.
    pub fn validate(&self) -> Result<()> {
        if self.scanner_command.trim().is_empty() {
            bail!(
                "Invalid config: scanner_command must not be empty.\n\n\
                 💡 Hint: Set it to the dependency-check executable (e.g., \"dependency-check\")."
            );
        }
        for (name, path) in [
            ("scanner_data_dir", &self.scanner_data_dir),
            ("upload_root", &self.upload_root),
            ("report_root", &self.report_root),
        ] {
            if path.as_os_str().is_empty() {
                bail!("Invalid config: {} must not be empty.", name);
            }
        }
        if self.database_url.trim().is_empty() {
            bail!(
                "Invalid config: database_url must not be empty.\n\n\
                 💡 Hint: Use a SQLite URL such as \"sqlite://depscan.db\"."
            );
        }
        if self.scanner_timeout_secs == 0 {
            bail!("Invalid config: scanner_timeout_secs must be greater than zero.");
        }
        if self.max_archive_bytes == 0 {
            bail!("Invalid config: max_archive_bytes must be greater than zero.");
        }
        Ok(())
    }

    pub fn scanner_timeout(&self) -> Duration {
        Duration::from_secs(self.scanner_timeout_secs)
    }
}

/// Load config from an explicit path. Returns an error if the file is not found.
pub fn load_config_from_path(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read config file: {}\n\n💡 Hint: Check that the file exists and is readable.",
            path.display()
        )
    })?;

    // An empty file is a valid, all-defaults configuration
    let config: PipelineConfig = if content.trim().is_empty() {
        PipelineConfig::default()
    } else {
        serde_yaml_ng::from_str(&content).with_context(|| {
            format!(
                "Failed to parse config file: {}\n\n💡 Hint: Ensure the file contains valid YAML syntax.",
                path.display()
            )
        })?
    };

    config.validate()?;
    warn_unknown_fields(&config);

    Ok(config)
}

/// Auto-discover config in a directory. Returns `None` silently if not found.
pub fn discover_config(dir: &Path) -> Result<Option<PipelineConfig>> {
    let config_path = dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        return Ok(None);
    }

    let config = load_config_from_path(&config_path)?;
    Ok(Some(config))
}

/// Warn about unknown fields in the config file.
fn warn_unknown_fields(config: &PipelineConfig) {
    for key in config.unknown_fields.keys() {
        tracing::warn!(field = %key, "Unknown config field will be ignored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_valid_config() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yml");
        fs::write(
            &config_path,
            r#"
scanner_command: /opt/dependency-check/bin/dependency-check.sh
scanner_data_dir: /var/lib/dc-data
upload_root: /srv/uploads
report_root: /srv/reports
database_url: "sqlite:///srv/depscan.db"
scanner_timeout_secs: 900
max_archive_bytes: 1048576
"#,
        )
        .unwrap();

        let config = load_config_from_path(&config_path).unwrap();
        assert_eq!(
            config.scanner_command,
            "/opt/dependency-check/bin/dependency-check.sh"
        );
        assert_eq!(config.scanner_data_dir, PathBuf::from("/var/lib/dc-data"));
        assert_eq!(config.upload_root, PathBuf::from("/srv/uploads"));
        assert_eq!(config.report_root, PathBuf::from("/srv/reports"));
        assert_eq!(config.database_url, "sqlite:///srv/depscan.db");
        assert_eq!(config.scanner_timeout(), Duration::from_secs(900));
        assert_eq!(config.max_archive_bytes, 1_048_576);
        assert!(config.unknown_fields.is_empty());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yml");
        fs::write(&config_path, "scanner_timeout_secs: 60\n").unwrap();

        let config = load_config_from_path(&config_path).unwrap();
        assert_eq!(config.scanner_timeout_secs, 60);
        assert_eq!(config.scanner_command, "dependency-check");
        assert_eq!(config.upload_root, PathBuf::from("uploads"));
    }

    #[test]
    fn test_empty_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yml");
        fs::write(&config_path, "\n").unwrap();

        assert_eq!(
            load_config_from_path(&config_path).unwrap(),
            PipelineConfig::default()
        );
    }

    #[test]
    fn test_unknown_fields_are_collected() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yml");
        fs::write(&config_path, "scaner_command: typo\nfoo: 1\n").unwrap();

        let config = load_config_from_path(&config_path).unwrap();
        assert_eq!(config.unknown_fields.len(), 2);
        assert!(config.unknown_fields.contains_key("scaner_command"));
        assert_eq!(config.scanner_command, "dependency-check");
    }

    #[test]
    fn test_discover_config_found() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "report_root: out\n").unwrap();

        let config = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.report_root, PathBuf::from("out"));
    }

    #[test]
    fn test_discover_config_not_found() {
        let dir = TempDir::new().unwrap();
        let config = discover_config(dir.path()).unwrap();
        assert!(config.is_none());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config_from_path(Path::new("/nonexistent/config.yml"));
        assert!(result.is_err());
        let err = format!("{}", result.unwrap_err());
        assert!(err.contains("Failed to read config file"));
    }

    #[test]
    fn test_load_config_parse_error() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("bad.yml");
        fs::write(&config_path, "invalid: yaml: [[[broken").unwrap();

        let result = load_config_from_path(&config_path);
        assert!(result.is_err());
        let err = format!("{}", result.unwrap_err());
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_zero_timeout_validation_error() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yml");
        fs::write(&config_path, "scanner_timeout_secs: 0\n").unwrap();

        let err = format!("{}", load_config_from_path(&config_path).unwrap_err());
        assert!(err.contains("scanner_timeout_secs"));
    }

    #[test]
    fn test_validation_rejects_empty_values() {
        let config = PipelineConfig {
            database_url: " ".to_string(),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            upload_root: PathBuf::new(),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            max_archive_bytes: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_apply_after_file() {
        let mut config = PipelineConfig::default();
        let env: HashMap<&str, &str> = [
            ("DEPENDENCY_CHECK_CMD", "/usr/local/bin/dependency-check"),
            ("DEPENDENCY_CHECK_DATA", "/data/dc"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("DEPSCAN_SCANNER_TIMEOUT_SECS", " 120 "),
        ]
        .into_iter()
        .collect();

        config
            .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.scanner_command, "/usr/local/bin/dependency-check");
        assert_eq!(config.scanner_data_dir, PathBuf::from("/data/dc"));
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.scanner_timeout_secs, 120);
    }

    #[test]
    fn test_env_override_invalid_timeout() {
        let mut config = PipelineConfig::default();
        let result = config.apply_env_overrides(|key| {
            (key == "DEPSCAN_SCANNER_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::load(None, dir.path()).unwrap();
        assert_eq!(config.upload_root, PathBuf::from("uploads"));
    }
}
