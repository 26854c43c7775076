//! Eco Warriors - catch the clean water, dodge the pollution
//!
//! Core modules:
//! - `sim`: Deterministic simulation (pools, entities, difficulty, spawning)
//! - `config`: Data-driven game balance, loaded once per session

pub mod config;
pub mod sim;

pub use config::{ConfigError, GameConfig};

use glam::Vec2;

/// Default tuning constants (world units and seconds)
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Largest frame delta the wall clock will report
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Visible world dimensions
    pub const WORLD_WIDTH: f32 = 10.0;
    pub const WORLD_HEIGHT: f32 = 16.0;

    /// Collector (basket) defaults
    pub const COLLECTOR_WIDTH: f32 = 0.8;
    pub const COLLECTOR_HEIGHT: f32 = 0.6;
    pub const COLLECTOR_SPEED: f32 = 3.0;
    pub const COLLECTOR_START_Y: f32 = -7.0;

    /// Collectible (water drop) defaults
    pub const COLLECTIBLE_WIDTH: f32 = 0.3;
    pub const COLLECTIBLE_HEIGHT: f32 = 0.4;
    pub const COLLECTIBLE_POINTS: i32 = 10;

    /// Hazard (pollutant) defaults
    pub const HAZARD_WIDTH: f32 = 0.35;
    pub const HAZARD_HEIGHT: f32 = 0.35;
    pub const HAZARD_POINTS: i32 = -5;

    /// Fall speed bounds
    pub const MIN_SPEED: f32 = 1.5;
    pub const MAX_SPEED: f32 = 4.0;

    /// Seconds between spawns
    pub const MIN_INTERVAL: f32 = 0.5;
    pub const MAX_INTERVAL: f32 = 2.0;
    /// Chance that a spawn is a collectible rather than a hazard
    pub const COLLECTIBLE_PROBABILITY: f64 = 0.7;
    /// Spawn row (top of the visible world)
    pub const SPAWN_Y: f32 = 8.0;
    /// Keep spawns this far from the left/right edges
    pub const SPAWN_EDGE_MARGIN: f32 = 0.5;
    /// Interval jitter band around the difficulty spawn rate
    pub const SPAWN_JITTER_MIN: f32 = 0.8;
    pub const SPAWN_JITTER_MAX: f32 = 1.2;

    /// Difficulty curve
    pub const MAX_LEVEL: u32 = 10;
    pub const POINTS_PER_LEVEL: u64 = 100;
    pub const SPEED_INCREASE_PER_LEVEL: f32 = 0.15;
    pub const SPAWN_RATE_DECREASE_PER_LEVEL: f32 = 0.10;

    /// Soft cap on live entities before spawning is held back
    pub const MAX_ENTITIES: usize = 50;
    pub const POOL_SIZE_COLLECTIBLE: usize = 30;
    pub const POOL_SIZE_HAZARD: usize = 20;
    /// Utilization above which a pool is reported as unhealthy
    pub const POOL_HEALTH_THRESHOLD: f32 = 0.9;
}

/// Y coordinate below which a falling entity deactivates itself
#[inline]
pub fn despawn_threshold(world_height: f32) -> f32 {
    -world_height / 2.0 - 1.0
}

/// Horizontal half-extent of the visible world
#[inline]
pub fn half_width(world_width: f32) -> f32 {
    world_width / 2.0
}

/// Velocity of an entity falling at `speed` (negative Y is down)
#[inline]
pub fn fall_velocity(speed: f32) -> Vec2 {
    Vec2::new(0.0, -speed)
}
