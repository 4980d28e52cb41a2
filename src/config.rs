use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{presentation::Position, severity::SpawnRates};

fn default_name() -> String {
    "pm25".into()
}

fn default_seed() -> u64 {
    42
}

fn default_current_value() -> f64 {
    35.0
}

fn default_lifetime_ms() -> u64 {
    8_000
}

fn default_max_particles() -> usize {
    100
}

fn default_spawn_radius() -> f32 {
    5.0
}

fn default_spawn_interval_ms() -> u64 {
    100
}

fn default_eviction_interval_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Starting PM2.5 value in µg/m³.
    #[serde(default = "default_current_value")]
    pub current_value: f64,
    #[serde(default = "default_lifetime_ms")]
    pub particle_lifetime_ms: u64,
    #[serde(default = "default_max_particles")]
    pub max_particles: usize,
    #[serde(default = "default_spawn_radius")]
    pub spawn_radius: f32,
    #[serde(default)]
    pub origin: Position,
    #[serde(default = "default_spawn_interval_ms")]
    pub spawn_interval_ms: u64,
    #[serde(default = "default_eviction_interval_ms")]
    pub eviction_interval_ms: u64,
    #[serde(default)]
    pub spawn_rates: SpawnRates,
    #[serde(default)]
    pub particle: ParticleStyle,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            seed: default_seed(),
            current_value: default_current_value(),
            particle_lifetime_ms: default_lifetime_ms(),
            max_particles: default_max_particles(),
            spawn_radius: default_spawn_radius(),
            origin: Position::ORIGIN,
            spawn_interval_ms: default_spawn_interval_ms(),
            eviction_interval_ms: default_eviction_interval_ms(),
            spawn_rates: SpawnRates::default(),
            particle: ParticleStyle::default(),
        }
    }
}

/// Look of a single particle sphere and its idle float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleStyle {
    pub radius: f32,
    pub opacity: f32,
    pub float_distance: f32,
    pub float_period_min_ms: u32,
    pub float_period_max_ms: u32,
}

impl Default for ParticleStyle {
    fn default() -> Self {
        Self {
            radius: 0.05,
            opacity: 0.7,
            float_distance: 0.2,
            float_period_min_ms: 2_000,
            float_period_max_ms: 4_000,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
    #[error("spawn radius must be a finite non-negative number, got {0}")]
    SpawnRadius(f32),
    #[error("current value must be finite, got {0}")]
    CurrentValue(f64),
    #[error("spawn range for {tier} has min {min} above max {max}")]
    SpawnRange { tier: String, min: u32, max: u32 },
    #[error("float period range {min}..{max} is reversed")]
    FloatPeriod { min: u32, max: u32 },
}

impl VisualizationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("particle_lifetime_ms", self.particle_lifetime_ms),
            ("spawn_interval_ms", self.spawn_interval_ms),
            ("eviction_interval_ms", self.eviction_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::NotPositive { field });
            }
        }
        if !self.spawn_radius.is_finite() || self.spawn_radius < 0.0 {
            return Err(ConfigError::SpawnRadius(self.spawn_radius));
        }
        if !self.current_value.is_finite() {
            return Err(ConfigError::CurrentValue(self.current_value));
        }
        for (tier, range) in self.spawn_rates.iter() {
            if !range.is_valid() {
                return Err(ConfigError::SpawnRange {
                    tier: format!("{tier:?}"),
                    min: range.min,
                    max: range.max,
                });
            }
        }
        if self.particle.float_period_min_ms > self.particle.float_period_max_ms {
            return Err(ConfigError::FloatPeriod {
                min: self.particle.float_period_min_ms,
                max: self.particle.float_period_max_ms,
            });
        }
        Ok(())
    }

    pub fn lifetime(&self) -> Duration {
        Duration::from_millis(self.particle_lifetime_ms)
    }

    pub fn spawn_interval(&self) -> Duration {
        Duration::from_millis(self.spawn_interval_ms)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_millis(self.eviction_interval_ms)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: VisualizationConfig =
            serde_yaml::from_str(text).context("Failed to parse visualization config")?;
        config.validate()?;
        Ok(config)
    }
}

pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<VisualizationConfig> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: VisualizationConfig = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }
}

/// Shared, settable PM2.5 reading.
///
/// Clones observe the same value. Readers and writers may live on different
/// threads; the value is stored as raw `f64` bits.
#[derive(Debug, Clone)]
pub struct Concentration {
    bits: Arc<AtomicU64>,
}

impl Concentration {
    pub fn new(value: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(value.to_bits())),
        }
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }
}

impl Default for Concentration {
    fn default() -> Self {
        Self::new(default_current_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::SpawnRange;

    #[test]
    fn empty_document_uses_defaults() {
        let config = VisualizationConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.current_value, 35.0);
        assert_eq!(config.particle_lifetime_ms, 8_000);
        assert_eq!(config.max_particles, 100);
        assert_eq!(config.spawn_radius, 5.0);
        assert_eq!(config.spawn_interval(), Duration::from_millis(100));
        assert_eq!(config.eviction_interval(), Duration::from_secs(1));
        assert_eq!(config.spawn_rates, SpawnRates::default());
    }

    #[test]
    fn partial_spawn_rates_keep_other_tiers() {
        let config = VisualizationConfig::from_yaml_str(
            "spawn_rates:\n  hazardous: { min: 50, max: 60 }\n",
        )
        .unwrap();
        assert_eq!(config.spawn_rates.hazardous, SpawnRange::new(50, 60));
        assert_eq!(config.spawn_rates.good, SpawnRange::new(1, 3));
    }

    #[test]
    fn reversed_spawn_range_is_rejected() {
        let mut config = VisualizationConfig::default();
        config.spawn_rates.moderate = SpawnRange::new(9, 2);
        assert_eq!(
            config.validate(),
            Err(ConfigError::SpawnRange {
                tier: "Moderate".into(),
                min: 9,
                max: 2
            })
        );
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let mut config = VisualizationConfig::default();
        config.spawn_interval_ms = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "spawn_interval_ms"
            })
        );
    }

    #[test]
    fn concentration_is_shared_between_clones() {
        let reading = Concentration::new(10.0);
        let writer = reading.clone();
        writer.set(180.0);
        assert_eq!(reading.get(), 180.0);
    }
}
