//! Configuration loading from TOML files

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use coleta_core::Backoff;

/// Global configuration for coleta
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub run: RunSection,
    pub http: HttpSection,
    pub output: OutputSection,
    pub source: SourceSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunSection {
    pub languages: Vec<String>,
    /// First page to request.
    pub page_start: u32,
    /// Total page count for bounded runs; absent means auto mode.
    pub total_pages: Option<u32>,
    /// Abort the language when a page's retries are exhausted.
    pub abort_on_failed_page: bool,
    pub max_attempts: u32,
    pub backoff: BackoffKind,
    pub backoff_secs: u64,
    pub workers: usize,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            languages: vec!["EN".to_string()],
            page_start: 1,
            total_pages: None,
            abort_on_failed_page: false,
            max_attempts: 5,
            backoff: BackoffKind::Fixed,
            backoff_secs: 5,
            workers: default_workers(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(8)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub fetch_timeout: u64,
    pub verify_timeout: u64,
    pub download_timeout: u64,
    /// Require this content-type prefix when verifying links.
    pub verify_content_type: Option<String>,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            fetch_timeout: 30,
            verify_timeout: 10,
            download_timeout: 30,
            verify_content_type: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    #[serde(deserialize_with = "deserialize_env_path")]
    pub root: PathBuf,
    pub format: ListingFormat,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            root: std::env::var("DIR_BD")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            format: ListingFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ListingFormat {
    Csv,
    Jsonl,
}

impl ListingFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Jsonl => "jsonl",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SourceSection {
    /// Override the catalog host (mirrors, local test servers).
    pub base_url: Option<String>,
}

/// Deserialize a path that may be an environment variable reference like ${VAR}
fn deserialize_env_path<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(PathBuf::from(expand_env_var(&raw).unwrap_or(raw)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./coleta.toml (current directory)
    /// 2. ~/.config/coleta/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("coleta.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "coleta") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn backoff(&self) -> Backoff {
        let base = Duration::from_secs(self.run.backoff_secs);
        match self.run.backoff {
            BackoffKind::Fixed => Backoff::Fixed(base),
            BackoffKind::Exponential => Backoff::Exponential { base },
        }
    }
}
