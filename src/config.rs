//! Game configuration
//!
//! Loaded once at session start and shared read-only afterwards. Every
//! section has defaults, so a JSON file only needs the fields it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Configuration loading/validation failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Visible world dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: WORLD_WIDTH,
            height: WORLD_HEIGHT,
        }
    }
}

/// The player's basket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub width: f32,
    pub height: f32,
    /// Max horizontal speed (world units/sec)
    pub speed: f32,
    pub start_y: f32,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            width: COLLECTOR_WIDTH,
            height: COLLECTOR_HEIGHT,
            speed: COLLECTOR_SPEED,
            start_y: COLLECTOR_START_Y,
        }
    }
}

/// Size and score value of one falling item kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemConfig {
    pub width: f32,
    pub height: f32,
    /// Signed score applied when caught
    pub points: i32,
}

/// Clean water drops
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectibleConfig {
    pub width: f32,
    pub height: f32,
    pub points: i32,
}

impl Default for CollectibleConfig {
    fn default() -> Self {
        Self {
            width: COLLECTIBLE_WIDTH,
            height: COLLECTIBLE_HEIGHT,
            points: COLLECTIBLE_POINTS,
        }
    }
}

impl CollectibleConfig {
    pub fn item(&self) -> ItemConfig {
        ItemConfig {
            width: self.width,
            height: self.height,
            points: self.points,
        }
    }
}

/// Pollutants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    pub width: f32,
    pub height: f32,
    /// Penalty (negative)
    pub points: i32,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            width: HAZARD_WIDTH,
            height: HAZARD_HEIGHT,
            points: HAZARD_POINTS,
        }
    }
}

impl HazardConfig {
    pub fn item(&self) -> ItemConfig {
        ItemConfig {
            width: self.width,
            height: self.height,
            points: self.points,
        }
    }
}

/// Spawn cadence and placement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    pub collectible_probability: f64,
    pub spawn_y: f32,
    pub edge_margin: f32,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            collectible_probability: COLLECTIBLE_PROBABILITY,
            spawn_y: SPAWN_Y,
            edge_margin: SPAWN_EDGE_MARGIN,
        }
    }
}

/// Difficulty curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    pub max_level: u32,
    pub points_per_level: u64,
    /// Fractional interval shrink per level (compounding)
    pub decrease_per_level: f32,
    /// Fractional speed growth per level (compounding)
    pub increase_per_level: f32,
    pub min_interval: f32,
    pub max_interval: f32,
    pub min_speed: f32,
    pub max_speed: f32,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            max_level: MAX_LEVEL,
            points_per_level: POINTS_PER_LEVEL,
            decrease_per_level: SPAWN_RATE_DECREASE_PER_LEVEL,
            increase_per_level: SPEED_INCREASE_PER_LEVEL,
            min_interval: MIN_INTERVAL,
            max_interval: MAX_INTERVAL,
            min_speed: MIN_SPEED,
            max_speed: MAX_SPEED,
        }
    }
}

impl DifficultyConfig {
    /// Reject curves the engine cannot evaluate
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_level == 0 {
            return Err(ConfigError::invalid("difficulty.max_level", "must be at least 1"));
        }
        if self.points_per_level == 0 {
            return Err(ConfigError::invalid(
                "difficulty.points_per_level",
                "must be at least 1",
            ));
        }
        if self.min_interval <= 0.0 || self.min_interval > self.max_interval {
            return Err(ConfigError::invalid(
                "difficulty.min_interval",
                "intervals must satisfy 0 < min <= max",
            ));
        }
        if self.min_speed <= 0.0 || self.min_speed > self.max_speed {
            return Err(ConfigError::invalid(
                "difficulty.min_speed",
                "speeds must satisfy 0 < min <= max",
            ));
        }
        if !(0.0..1.0).contains(&self.decrease_per_level) {
            return Err(ConfigError::invalid(
                "difficulty.decrease_per_level",
                "must be in [0, 1)",
            ));
        }
        if self.increase_per_level < 0.0 {
            return Err(ConfigError::invalid(
                "difficulty.increase_per_level",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

/// Entity limits and pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub max_entities: usize,
    pub pool_size_collectible: usize,
    pub pool_size_hazard: usize,
    pub pool_health_threshold: f32,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_entities: MAX_ENTITIES,
            pool_size_collectible: POOL_SIZE_COLLECTIBLE,
            pool_size_hazard: POOL_SIZE_HAZARD,
            pool_health_threshold: POOL_HEALTH_THRESHOLD,
        }
    }
}

/// Complete game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub world: WorldConfig,
    pub collector: CollectorConfig,
    pub collectible: CollectibleConfig,
    pub hazard: HazardConfig,
    pub spawner: SpawnerConfig,
    pub difficulty: DifficultyConfig,
    pub performance: PerformanceConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            collector: CollectorConfig::default(),
            collectible: CollectibleConfig::default(),
            hazard: HazardConfig::default(),
            spawner: SpawnerConfig::default(),
            difficulty: DifficultyConfig::default(),
            performance: PerformanceConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.width <= 0.0 || self.world.height <= 0.0 {
            return Err(ConfigError::invalid("world", "dimensions must be positive"));
        }
        if self.collector.width <= 0.0 || self.collector.height <= 0.0 {
            return Err(ConfigError::invalid("collector", "size must be positive"));
        }
        for (field, item) in [
            ("collectible", self.collectible.item()),
            ("hazard", self.hazard.item()),
        ] {
            if item.width <= 0.0 || item.height <= 0.0 {
                return Err(ConfigError::invalid(field, "size must be positive"));
            }
        }

        let spawner = &self.spawner;
        if !(0.0..=1.0).contains(&spawner.collectible_probability) {
            return Err(ConfigError::invalid(
                "spawner.collectible_probability",
                format!("{} is outside [0, 1]", spawner.collectible_probability),
            ));
        }
        if spawner.edge_margin < 0.0 || spawner.edge_margin * 2.0 >= self.world.width {
            return Err(ConfigError::invalid(
                "spawner.edge_margin",
                "margins leave no horizontal spawn band",
            ));
        }

        self.difficulty.validate()?;

        if self.performance.max_entities == 0 {
            return Err(ConfigError::invalid(
                "performance.max_entities",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
