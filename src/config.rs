//! Render configuration
//!
//! Settings are read from a JSON file, either given explicitly or found in the
//! platform config directory. Every field has a default, so a partial file (or
//! none at all) is fine.

use crate::colour::{ColourMap, ColourScale, ColourScaleType};
use crate::model::SpectrogramConfig;
use crate::render::{BinScale, Normalization, Parameters};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// FFT window size (power of two recommended)
    pub fft_size: usize,
    /// Frames between analysis columns
    pub hop_size: usize,
    /// Wall-clock budget for one time-constrained render
    pub time_budget_ms: u64,
    /// New columns a time-constrained render always completes
    pub min_columns: usize,
    /// Where rendering of an empty view starts when time-constrained
    pub middle_start_fraction: f32,
    pub colour_map: ColourMap,
    pub colour_scale: ColourScaleType,
    pub gain: f32,
    pub bin_scale: BinScale,
    pub normalization: Normalization,
    pub invert_vertical: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            hop_size: 256,
            time_budget_ms: 100,
            min_columns: 4,
            middle_start_fraction: 0.3,
            colour_map: ColourMap::default(),
            colour_scale: ColourScaleType::default(),
            gain: 1.0,
            bin_scale: BinScale::default(),
            normalization: Normalization::default(),
            invert_vertical: false,
        }
    }
}

impl RenderConfig {
    /// Location of the config file in the platform config directory
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "spectroview").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load from `path`, or from the default location if it exists
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    tracing::debug!("no config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_json(&contents)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let mut config: RenderConfig = serde_json::from_str(contents)?;
        config.min_columns = config.min_columns.max(1);
        config.middle_start_fraction = config.middle_start_fraction.clamp(0.0, 1.0);
        Ok(config)
    }

    pub fn spectrogram(&self) -> SpectrogramConfig {
        SpectrogramConfig {
            fft_size: self.fft_size,
            hop_size: self.hop_size,
        }
    }

    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }

    pub fn parameters(&self) -> Parameters {
        Parameters {
            colour_scale: ColourScale {
                map: self.colour_map,
                scale: self.colour_scale,
                gain: self.gain,
                ..ColourScale::default()
            },
            bin_scale: self.bin_scale,
            normalization: self.normalization,
            invert_vertical: self.invert_vertical,
            time_budget: self.time_budget(),
            min_columns: self.min_columns.max(1),
            middle_start_fraction: self.middle_start_fraction,
        }
    }
}
