//! Configuration system for the simulation.
//!
//! Supports YAML configuration files with sensible defaults. Any section left
//! out of a file falls back to its default.

use crate::geometry::{Rect, Vec2};
use crate::random::ForkMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub world: WorldConfig,
    pub organisms: OrganismConfig,
    pub evolution: EvolutionConfig,
    pub spawn: SpawnConfig,
    pub random: RandomConfig,
    pub admin: AdminConfig,
    pub logging: LoggingConfig,
}

/// World geometry, resource regeneration and clock
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Continuous world rectangle covered by the resource grid
    pub bounds: Rect,
    /// Grid cells along x
    pub dim_x: usize,
    /// Grid cells along y
    pub dim_y: usize,
    /// Mean `Energy` tokens regenerated per unit time
    pub regen_rate: f64,
    /// Tick duration used by the CLI driver
    pub dt: f64,
}

/// Organism energetics and instruction costs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganismConfig {
    /// Organisms spawned when the simulation is created
    pub initial_population: usize,
    /// Energy of freshly spawned (not divided) organisms
    pub initial_energy: f64,
    /// Energy charged for every executed instruction
    pub thinking_cost: f64,
    /// Organisms whose energy falls below this die
    pub death_threshold: f64,
    /// Energy gained by METABOLIZE turning `Energy` into `Waste`
    pub metabolize_reward: f64,
    /// Energy gained by METABOLIZE2 turning two `Waste` into one `Energy`
    pub recycle_reward: f64,
    /// Energy lost on DIVIDE before the remainder is split between children
    pub division_cost: f64,
}

/// Evolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Per-slot probability of a point mutation when a genome is copied
    pub mutation_rate: f64,
}

/// Spontaneous generation of organisms from the resource field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Mean spawn attempts per unit time
    pub rate: f64,
    /// Minimum stack height (before the take) for an `Energy` token to seed an organism
    pub min_depth: usize,
    /// No spontaneous spawns once the population reaches this size
    pub max_population: usize,
}

/// Random stream configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomConfig {
    /// How child streams are derived on division
    pub fork_mode: ForkMode,
}

/// Administrative commands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Rectangle cleared by the reset command
    pub reset_zone: Rect,
    /// Directory that receives debug dumps
    pub dump_dir: PathBuf,
}

/// Logging and statistics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Ticks between stats history snapshots
    pub stats_interval: u64,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            bounds: Rect::new(Vec2::new(-16.0, -12.0), Vec2::new(16.0, 12.0)),
            dim_x: 64,
            dim_y: 48,
            regen_rate: 20.0,
            dt: 0.1,
        }
    }
}

impl Default for OrganismConfig {
    fn default() -> Self {
        Self {
            initial_population: 50,
            initial_energy: 10.0,
            thinking_cost: 0.002,
            death_threshold: 1.0,
            metabolize_reward: 2.0,
            recycle_reward: 0.0,
            division_cost: 0.0,
        }
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            mutation_rate: 0.05,
        }
    }
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            rate: 0.5,
            min_depth: 1,
            max_population: 5000,
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            reset_zone: Rect::new(Vec2::new(-4.0, -4.0), Vec2::new(4.0, 4.0)),
            dump_dir: PathBuf::from("dumps"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 100,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.world.dim_x == 0 || self.world.dim_y == 0 {
            return invalid("grid dimensions must be > 0");
        }
        if self.world.bounds.width() <= 0.0 || self.world.bounds.height() <= 0.0 {
            return invalid("world bounds must have positive area");
        }
        if self.world.regen_rate < 0.0 || self.spawn.rate < 0.0 {
            return invalid("Poisson rates must be >= 0");
        }
        if self.world.dt <= 0.0 {
            return invalid("dt must be > 0");
        }
        // a non-positive thinking cost would let a loop of non-terminal ops spin forever
        if self.organisms.thinking_cost <= 0.0 {
            return invalid("thinking_cost must be > 0");
        }
        if self.organisms.division_cost < 0.0 {
            return invalid("division_cost must be >= 0");
        }
        if !(0.0..=1.0).contains(&self.evolution.mutation_rate) {
            return invalid("mutation_rate must be within [0, 1]");
        }
        if self.spawn.min_depth == 0 {
            return invalid("spawn min_depth must be >= 1");
        }
        if self.organisms.initial_population > self.spawn.max_population {
            return invalid("initial_population cannot exceed max_population");
        }
        if self.logging.stats_interval == 0 {
            return invalid("stats_interval must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let loaded: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.world.dim_x, loaded.world.dim_x);
        assert_eq!(config.random.fork_mode, loaded.random.fork_mode);
        assert_eq!(config.admin.reset_zone, loaded.admin.reset_zone);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let yaml = "organisms:\n  thinking_cost: 0.01\nrandom:\n  fork_mode: clone\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.organisms.thinking_cost, 0.01);
        assert_eq!(config.organisms.death_threshold, 1.0);
        assert_eq!(config.world.dim_y, 48);
        assert_eq!(config.random.fork_mode, ForkMode::Clone);
    }

    #[test]
    fn test_zero_thinking_cost_rejected() {
        let mut config = Config::default();
        config.organisms.thinking_cost = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = Config::default();
        config.spawn.min_depth = 3;
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.spawn.min_depth, 3);
    }
}
