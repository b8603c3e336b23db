use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per request (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.5 = 500ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.5,
            max_delay_secs: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/bvdm/config.toml`.
///
/// The endpoint defaults point at the Binance Vision public data bucket; they
/// are configurable so tests (and mirrors) can swap in another host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BvdmConfig {
    /// Listing endpoint: a directory prefix is appended to this URL verbatim.
    /// Must already carry the `delimiter=/&prefix=` query tail.
    pub listing_base_url: String,
    /// File endpoint: an archive key is appended to this URL verbatim.
    /// Must end with `/`.
    pub file_base_url: String,
    /// User-Agent header sent on every request.
    pub user_agent: String,
    /// Connect timeout for listing requests, in seconds.
    pub listing_connect_timeout_secs: u64,
    /// Total timeout for one listing request, in seconds.
    pub listing_timeout_secs: u64,
    /// Connect timeout for archive downloads, in seconds.
    pub download_connect_timeout_secs: u64,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for BvdmConfig {
    fn default() -> Self {
        Self {
            listing_base_url:
                "https://s3-ap-northeast-1.amazonaws.com/data.binance.vision?delimiter=/&prefix="
                    .to_string(),
            file_base_url: "https://data.binance.vision/".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/111.0.0.0 Safari/537.36"
                .to_string(),
            listing_connect_timeout_secs: 15,
            listing_timeout_secs: 60,
            download_connect_timeout_secs: 30,
            retry: None,
        }
    }
}

impl BvdmConfig {
    /// Retry policy from the `[retry]` section, or built-in defaults.
    pub fn retry_policy(&self) -> RetryPolicy {
        match &self.retry {
            Some(r) => RetryPolicy {
                max_attempts: r.max_attempts,
                base_delay: Duration::from_secs_f64(r.base_delay_secs.max(0.0)),
                max_delay: Duration::from_secs(r.max_delay_secs),
            },
            None => RetryPolicy::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("bvdm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BvdmConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BvdmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: BvdmConfig = toml::from_str(&data)?;
    Ok(cfg)
}
