//! Hub configuration.
//!
//! The defaults need no file at all. With the `config` feature enabled a TOML file can
//! override them:
//!
//! ```toml
//! epsilon = 0.01
//! ```

use crate::error::{PriceSyncError, Result};

/// Prices closer than this are treated as equal by the store.
pub const DEFAULT_EPSILON: f64 = 0.001;

/// Settings for one provider instance.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default, deny_unknown_fields))]
pub struct HubConfig {
    /// Minimum absolute difference for a write to count as a change
    pub epsilon: f64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl HubConfig {
    /// Replace the epsilon, validating it
    pub fn with_epsilon(mut self, epsilon: f64) -> Result<Self> {
        self.epsilon = epsilon;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(PriceSyncError::config(format!(
                "epsilon must be a finite non-negative number, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

#[cfg(feature = "config")]
impl HubConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: HubConfig =
            toml::from_str(text).map_err(|e| PriceSyncError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, falling back to defaults when it does not exist
    pub fn load(path: &std::path::Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(PriceSyncError::config(format!(
                "failed to read {}: {}",
                path.display(),
                err
            ))),
        }
    }

    /// `<config_dir>/price-sync/config.toml`, when the platform has a config dir
    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|dir| dir.join("price-sync").join("config.toml"))
    }
}
