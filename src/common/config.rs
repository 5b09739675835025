use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::guard::normalize;

/// Global TidyGuard configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Normalized absolute paths the user never wants touched
    #[serde(default)]
    pub exclude_paths: Vec<String>,

    /// Additional roots (beyond the built-in cache/log/temp locations)
    /// under which cleanup candidates are accepted
    #[serde(default)]
    pub extra_safe_roots: Vec<String>,

    /// Privileged helper settings
    #[serde(default)]
    pub helper: HelperConfig,

    /// Select "caution" items by default after a scan
    #[serde(default)]
    pub select_caution_items: bool,

    /// Output format preference
    #[serde(default)]
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HelperConfig {
    /// Unix socket the privileged helper daemon listens on
    #[serde(default = "default_helper_socket")]
    pub socket_path: PathBuf,

    /// Fall back to an administrator prompt when the helper is unavailable
    #[serde(default = "default_true")]
    pub allow_admin_prompt: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Quiet,
}

fn default_helper_socket() -> PathBuf {
    PathBuf::from("/var/run/tidyguard-helper.sock")
}
fn default_true() -> bool {
    true
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            socket_path: default_helper_socket(),
            allow_admin_prompt: default_true(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude_paths: Vec::new(),
            extra_safe_roots: Vec::new(),
            helper: HelperConfig::default(),
            select_caution_items: false,
            output_format: OutputFormat::Human,
        }
    }
}

impl Config {
    /// Get the TidyGuard data directory (~/.tidyguard)
    pub fn data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".tidyguard")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    /// Get the logs directory
    pub fn logs_dir() -> PathBuf {
        Self::data_dir().join("logs")
    }

    /// Load config from the default location, or defaults if it does not exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save config to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config dir: {}", dir.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Initialize all TidyGuard directories
    pub fn init_dirs() -> Result<()> {
        for dir in &[Self::data_dir(), Self::logs_dir()] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    /// Extra safe roots, normalized
    pub fn extra_safe_roots(&self) -> Vec<PathBuf> {
        self.extra_safe_roots
            .iter()
            .map(normalize)
            .filter(|p| !p.as_os_str().is_empty())
            .collect()
    }

    /// Set a scalar config key from its string form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "helper.socket_path" => self.helper.socket_path = PathBuf::from(value),
            "helper.allow_admin_prompt" => self.helper.allow_admin_prompt = value.parse()?,
            "select_caution_items" => self.select_caution_items = value.parse()?,
            // Comma-separated; empty clears the list
            "extra_safe_roots" => {
                self.extra_safe_roots = value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect()
            }
            "output_format" => {
                self.output_format = match value {
                    "human" => OutputFormat::Human,
                    "json" => OutputFormat::Json,
                    "quiet" => OutputFormat::Quiet,
                    _ => anyhow::bail!("Unknown output format: {}", value),
                }
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }
}
