use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub verification: VerificationConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,
}

/// Thresholds for photo verification. Injected into the verifier; never
/// changed after load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Maximum distance between photo and listing that still counts as a match.
    #[serde(default = "default_location_tolerance_km")]
    pub location_tolerance_km: f64,

    /// Maximum photo age that can still earn verified on-site status.
    #[serde(default = "default_warning_age_days")]
    pub warning_age_days: i64,

    /// Photos older than this are expired and must be re-verified.
    #[serde(default = "default_expiry_age_days")]
    pub expiry_age_days: i64,
}

fn default_location_tolerance_km() -> f64 {
    2.0
}

fn default_warning_age_days() -> i64 {
    1
}

fn default_expiry_age_days() -> i64 {
    30
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            location_tolerance_km: default_location_tolerance_km(),
            warning_age_days: default_warning_age_days(),
            expiry_age_days: default_expiry_age_days(),
        }
    }
}

impl VerificationConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.location_tolerance_km.is_finite() || self.location_tolerance_km < 0.0 {
            anyhow::bail!(
                "location_tolerance_km must be a non-negative number, got {}",
                self.location_tolerance_km
            );
        }
        if self.warning_age_days < 0 || self.expiry_age_days < 0 {
            anyhow::bail!("age thresholds must not be negative");
        }
        if self.warning_age_days > self.expiry_age_days {
            anyhow::bail!(
                "warning_age_days ({}) exceeds expiry_age_days ({})",
                self.warning_age_days,
                self.expiry_age_days
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
}

fn default_image_extensions() -> Vec<String> {
    vec![
        "jpg".to_string(),
        "jpeg".to_string(),
        "png".to_string(),
        "webp".to_string(),
        "heic".to_string(),
        "heif".to_string(),
        "tif".to_string(),
        "tiff".to_string(),
    ]
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            image_extensions: default_image_extensions(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("siteproof")
        .join("siteproof.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            verification: VerificationConfig::default(),
            scanner: ScannerConfig::default(),
        }
    }
}

impl Config {
    /// Load from `SITEPROOF_CONFIG` or the default location, writing a default
    /// config on first run.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var_os("SITEPROOF_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(Self::config_path);

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config.verification.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("siteproof")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}
