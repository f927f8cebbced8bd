use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Main application configuration: typed global sections plus a flexible
/// per-provider configuration bag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Core server configuration.
    pub server: ServerConfig,
    /// Logging configuration (optional, uses defaults if None).
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
    /// Which discovery providers to load at startup.
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Per-provider configuration bag: provider name → arbitrary JSON/YAML value.
    #[serde(default)]
    pub providers: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Normalized to an absolute path (and created) during load.
    pub home_dir: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// `:`-separated provider names, e.g. `"folder_scan:static_channels"`.
    #[serde(default)]
    pub providers: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_console_level")]
    pub console_level: String,
    /// Optional log file (JSON lines); a relative path resolves under
    /// `server.home_dir`. Empty means no file sink.
    #[serde(default)]
    pub file: String,
    #[serde(default = "default_file_level")]
    pub file_level: String,
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
    /// Retention: number of rotated files to keep. Wins over `max_age_days`.
    #[serde(default)]
    pub max_backups: Option<usize>,
    /// Retention: age limit for rotated files, in days.
    #[serde(default)]
    pub max_age_days: Option<u32>,
}

fn default_console_level() -> String {
    "info".to_string()
}

fn default_file_level() -> String {
    "info".to_string()
}

fn default_max_size_mb() -> u64 {
    100
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_level: default_console_level(),
            file: String::new(),
            file_level: default_file_level(),
            max_size_mb: default_max_size_mb(),
            max_backups: None,
            max_age_days: None,
        }
    }
}

/// CLI arguments that participate in the config layering.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub providers: Option<String>,
    pub print_config: bool,
    pub verbose: u8,
}

impl AppConfig {
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig {
                home_dir: "./.medley".to_string(),
            },
            logging: None,
            discovery: DiscoveryConfig::default(),
            providers: HashMap::new(),
        }
    }

    /// Layered load: defaults → YAML file (if provided) → `MEDLEY__*` env.
    /// Normalizes and creates `server.home_dir`.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default_config()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed("MEDLEY__").split("__"));

        let mut config: AppConfig = figment.extract().context("invalid configuration")?;
        config.normalize_home_dir()?;
        Ok(config)
    }

    /// CLI flags win over every other layer.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(providers) = &args.providers {
            self.discovery.providers = providers.clone();
        }
        if args.verbose > 0 {
            let level = match args.verbose {
                1 => "info",
                2 => "debug",
                _ => "trace",
            };
            self.logging
                .get_or_insert_with(LoggingConfig::default)
                .console_level = level.to_string();
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("cannot serialize configuration")
    }

    fn normalize_home_dir(&mut self) -> Result<()> {
        let home = PathBuf::from(&self.server.home_dir);
        let home = if home.is_absolute() {
            home
        } else {
            std::env::current_dir()
                .context("cannot determine current directory")?
                .join(home)
        };
        std::fs::create_dir_all(&home)
            .with_context(|| format!("cannot create home dir '{}'", home.display()))?;
        self.server.home_dir = home.to_string_lossy().into_owned();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default_config();
        assert!(config.discovery.providers.is_empty());
        assert!(config.providers.is_empty());
        assert!(config.logging.is_none());
    }

    #[test]
    fn yaml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("home");
        let path = dir.path().join("medley.yaml");
        std::fs::write(
            &path,
            format!(
                "server:\n  home_dir: {}\ndiscovery:\n  providers: \"folder_scan:static_channels\"\nproviders:\n  folder_scan:\n    path: /music\n",
                home.display()
            ),
        )
        .unwrap();

        let config = AppConfig::load_or_default(Some(&path)).unwrap();

        assert_eq!(config.discovery.providers, "folder_scan:static_channels");
        assert!(config.providers.contains_key("folder_scan"));
        assert!(home.exists());
        assert!(Path::new(&config.server.home_dir).is_absolute());
    }

    #[test]
    fn unknown_top_level_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medley.yaml");
        std::fs::write(&path, "server:\n  home_dir: x\nsurprise: 1\n").unwrap();
        assert!(AppConfig::load_or_default(Some(&path)).is_err());
    }

    #[test]
    fn cli_overrides_take_precedence() {
        let mut config = AppConfig::default_config();
        config.apply_cli_overrides(&CliArgs {
            providers: Some("sap".to_string()),
            verbose: 2,
            ..Default::default()
        });

        assert_eq!(config.discovery.providers, "sap");
        assert_eq!(config.logging.as_ref().unwrap().console_level, "debug");
    }

    #[test]
    fn effective_config_serializes_to_yaml() {
        let yaml = AppConfig::default_config().to_yaml().unwrap();
        assert!(yaml.contains("home_dir"));
        assert!(yaml.contains("discovery"));
    }
}
