//! Siting configuration.
//!
//! Loaded from TOML; every section and field is optional. Decay and capacity
//! bounds fall back to the selected [`Preset`] (suburban unless set), so a
//! config file only needs to name what differs from it.
//!
//! ```toml
//! [decay]
//! preset = "urban"
//! capture_range = 3500.0
//!
//! [capacity]
//! max_iter = 400
//!
//! [runner]
//! threads = 8
//! save_intermediate = true
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use siting_algo::{CapacityBounds, QpSettings};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Study-area presets for the decay kernel and per-site bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Dense areas: narrow kernel, capacity between 2 and 25 per site.
    Urban,
    #[default]
    Suburban,
    /// Sparse areas: wide kernel.
    Rural,
}

impl Preset {
    pub fn bandwidth(&self) -> f64 {
        match self {
            Preset::Urban => 1000.0,
            Preset::Suburban => 1500.0,
            Preset::Rural => 3000.0,
        }
    }

    pub fn capture_range(&self) -> f64 {
        match self {
            Preset::Urban => 3000.0,
            Preset::Suburban => 4000.0,
            Preset::Rural => 5000.0,
        }
    }

    pub fn bounds(&self) -> CapacityBounds {
        match self {
            Preset::Urban => CapacityBounds::new(Some(2.0), Some(25.0)),
            Preset::Suburban | Preset::Rural => CapacityBounds::new(Some(1.0), None),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Urban => "urban",
            Preset::Suburban => "suburban",
            Preset::Rural => "rural",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "urban" => Ok(Preset::Urban),
            "suburban" => Ok(Preset::Suburban),
            "rural" => Ok(Preset::Rural),
            other => bail!("unknown preset '{other}' (expected urban, suburban or rural)"),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitingConfig {
    pub decay: DecayConfig,
    pub capacity: CapacityConfig,
    pub runner: RunnerConfig,
}

/// Distance decay settings; unset values come from the preset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub preset: Option<Preset>,
    pub bandwidth: Option<f64>,
    pub capture_range: Option<f64>,
}

/// Per-site bounds and QP solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// Minimum capacity per site; preset value when unset.
    pub min: Option<f64>,
    /// Maximum capacity per site; preset value when unset.
    pub max: Option<f64>,
    /// Hessian diagonal regularization.
    pub stabilizer: f64,
    /// Interior-point iteration cap per solve.
    pub max_iter: u32,
    /// Wall-clock limit per solve in seconds (none when unset).
    pub time_limit_secs: Option<f64>,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        let qp = QpSettings::default();
        Self {
            min: None,
            max: None,
            stabilizer: qp.stabilizer,
            max_iter: qp.max_iter,
            time_limit_secs: None,
        }
    }
}

/// Execution settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Number of worker threads (0 = auto-detect).
    pub threads: usize,
    /// Write per-step supply and accessibility vectors.
    pub save_intermediate: bool,
}

impl SitingConfig {
    /// Configuration seeded from a preset.
    pub fn from_preset(preset: Preset) -> Self {
        let mut config = Self::default();
        config.decay.preset = Some(preset);
        config
    }

    /// Load configuration from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config '{}'", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing config '{}'", path.display()))?;
        Ok(config)
    }

    /// Save configuration as TOML.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("serializing config to TOML")?;
        std::fs::write(path, contents)
            .with_context(|| format!("writing config '{}'", path.display()))?;
        Ok(())
    }

    pub fn preset(&self) -> Preset {
        self.decay.preset.unwrap_or_default()
    }

    pub fn bandwidth(&self) -> f64 {
        self.decay.bandwidth.unwrap_or_else(|| self.preset().bandwidth())
    }

    pub fn capture_range(&self) -> f64 {
        self.decay
            .capture_range
            .unwrap_or_else(|| self.preset().capture_range())
    }

    pub fn capacity_bounds(&self) -> CapacityBounds {
        let preset = self.preset().bounds();
        CapacityBounds::new(
            self.capacity.min.or(preset.min),
            self.capacity.max.or(preset.max),
        )
    }

    pub fn qp_settings(&self) -> QpSettings {
        QpSettings {
            stabilizer: self.capacity.stabilizer,
            max_iter: self.capacity.max_iter,
            time_limit_secs: self.capacity.time_limit_secs.unwrap_or(f64::INFINITY),
        }
    }
}
