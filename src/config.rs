use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("FACEPRINT_CONFIG_PATH").unwrap_or("/usr/local/etc/faceprint/config.toml"))
});

/// Caller-side policy thresholds. The core never enforces these: the
/// encoding builder always returns its best effort and verification code
/// applies the cutoffs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Minimum acceptable face quality for enrollment and check-in.
    pub quality_threshold: f64,
    /// Minimum descriptor similarity counted as a match.
    pub match_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quality_threshold: 0.3,
            match_threshold: 0.65,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}
