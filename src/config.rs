use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::view::PAGE_SIZES;

pub const ENV_CONFIG: &str = "HEALTHVOICE_CONFIG";
pub const ENV_API_BASE: &str = "HEALTHVOICE_API_BASE";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub api_base: String,
    pub timeout_secs: u64,
    pub page_size: usize,
    pub debounce_ms: u64,
    pub display_timezone: String,
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:5000".to_string(),
            timeout_secs: 30,
            page_size: 10,
            debounce_ms: 1000,
            display_timezone: "UTC".to_string(),
            batch_size: 8,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(text).context("Parsing config TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if !PAGE_SIZES.contains(&self.page_size) {
            bail!("page_size must be one of {:?}, got {}", PAGE_SIZES, self.page_size);
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        self.timezone()?;
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.display_timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Unknown display_timezone {:?}: {}", self.display_timezone, e))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Config file location: explicit path > $HEALTHVOICE_CONFIG > <config dir>/healthvoice/config.toml.
/// The default location is optional; explicit ones must exist.
fn resolve_path(explicit: Option<&Path>) -> Option<(PathBuf, bool)> {
    if let Some(p) = explicit {
        return Some((p.to_path_buf(), true));
    }
    if let Ok(p) = std::env::var(ENV_CONFIG) {
        return Some((PathBuf::from(p), true));
    }
    let path = dirs::config_dir()?.join("healthvoice").join("config.toml");
    Some((path, false))
}

/// Layer defaults, config file, environment, then the `--api-base` flag.
pub fn resolve(explicit: Option<&Path>, api_base_flag: Option<&str>) -> Result<Config> {
    let mut cfg = match resolve_path(explicit) {
        Some((path, required)) if required || path.exists() => {
            if !path.exists() {
                bail!(
                    "Config not found at {}\n\
                     Use --config to point at a TOML file, or set {}.\n\
                     Example config.toml:\n\
                     api_base = \"http://localhost:5000\"\npage_size = 10\ndisplay_timezone = \"UTC\"\n",
                    path.display(),
                    ENV_CONFIG
                );
            }
            debug!("Using config file: {}", path.display());
            Config::load(&path)?
        }
        _ => {
            debug!("No config file, using defaults");
            Config::default()
        }
    };

    if let Ok(base) = std::env::var(ENV_API_BASE) {
        debug!("API base from {}: {}", ENV_API_BASE, base);
        cfg.api_base = base;
    }
    if let Some(base) = api_base_flag {
        debug!("API base from --api-base: {}", base);
        cfg.api_base = base.to_string();
    }
    Ok(cfg)
}
