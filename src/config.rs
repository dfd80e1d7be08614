use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::{Result, VisionError};

/// Hard cap on acquired image size: 10 MiB.
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Wall-clock budget for a single download: 30 seconds.
pub const DOWNLOAD_TIMEOUT_MS: u64 = 30_000;

const DEFAULT_API_URL: &str = "https://api.moonshot.cn/v1/chat/completions";
const DEFAULT_MODEL: &str = "kimi-k2.5";

/// Resource limits applied to every image acquisition.  Built once at
/// startup and passed by reference; never mutated afterwards.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_bytes: u64,
    pub timeout_ms: u64,
}

impl Limits {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_bytes: MAX_IMAGE_BYTES,
            timeout_ms: DOWNLOAD_TIMEOUT_MS,
        }
    }
}

/// Runtime configuration.
///
/// Priority (highest → lowest):
///   1. Environment variables (`KIMI_API_KEY`, `KIMI_API_URL`, `KIMI_MODEL`)
///   2. `config.toml` in the XDG config directory
///   3. Built-in defaults
///
/// The API key has no config-file fallback: it must come from the
/// environment, and its absence is fatal at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_url: String,
    pub default_model: String,
    pub limits: Limits,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    api_url: String,

    #[serde(default)]
    default_model: String,

    #[serde(default)]
    max_image_bytes: Option<u64>,

    #[serde(default)]
    download_timeout_ms: Option<u64>,
}

impl Config {
    /// Load config from the given path (or the default XDG location) and the
    /// environment.  Fails if `KIMI_API_KEY` is not set.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path(),
        };

        let file = if config_path.exists() {
            info!("loading config from {}", config_path.display());
            let contents = std::fs::read_to_string(&config_path).map_err(VisionError::Io)?;
            toml::from_str(&contents)
                .map_err(|e| VisionError::Config(format!("parse error: {e}")))?
        } else {
            FileConfig::default()
        };

        let api_key = std::env::var("KIMI_API_KEY")
            .map_err(|_| VisionError::Config("KIMI_API_KEY environment variable not set".into()))?;

        let api_url = std::env::var("KIMI_API_URL")
            .ok()
            .or_else(|| (!file.api_url.is_empty()).then(|| file.api_url.clone()))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let default_model = std::env::var("KIMI_MODEL")
            .ok()
            .or_else(|| (!file.default_model.is_empty()).then(|| file.default_model.clone()))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let limits = Limits {
            max_bytes: file.max_image_bytes.unwrap_or(MAX_IMAGE_BYTES),
            timeout_ms: file.download_timeout_ms.unwrap_or(DOWNLOAD_TIMEOUT_MS),
        };

        Ok(Self {
            api_key,
            api_url,
            default_model,
            limits,
        })
    }

    /// Returns the default config file path: `$XDG_CONFIG_HOME/kimi-vision/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("kimi-vision")
            .join("config.toml")
    }
}
