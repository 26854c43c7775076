//! Score-driven difficulty curve
//!
//! Level is `floor(score / points_per_level) + 1`, capped at `max_level`.
//! The spawn interval decays and the fall speed grows geometrically per
//! level; the interval is floored at `min_interval` and the speed capped at
//! `max_speed`, so neither can run away even if the curve would.

use serde::Serialize;

use crate::config::DifficultyConfig;

/// Snapshot for UI/telemetry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DifficultyStats {
    pub level: u32,
    pub max_level: u32,
    pub spawn_rate: f32,
    pub fall_speed: f32,
    pub points_per_level: u64,
}

#[derive(Debug, Clone)]
pub struct DifficultyEngine {
    config: DifficultyConfig,
    current_level: u32,
    last_level_up_score: u64,
}

impl DifficultyEngine {
    /// Build the curve, falling back to the defaults if `config` is unusable
    pub fn new(config: DifficultyConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                log::warn!("{}; using default difficulty curve", e);
                DifficultyConfig::default()
            }
        };
        log::info!("Difficulty initialized at level 1 (max {})", config.max_level);
        Self {
            config,
            current_level: 1,
            last_level_up_score: 0,
        }
    }

    /// Level a given score maps to
    pub fn calculate_level(&self, score: u64) -> u32 {
        let level = score / self.config.points_per_level + 1;
        level.min(u64::from(self.config.max_level)) as u32
    }

    /// Refresh from the current score; returns true on level up
    ///
    /// Levels only go up here. A score that drops (hazard penalties) keeps
    /// the level earned so far; only `reset`/`set_level` lower it.
    pub fn update(&mut self, score: u64) -> bool {
        let new_level = self.calculate_level(score);
        if new_level > self.current_level && new_level <= self.config.max_level {
            log::info!("Level up! {} -> {}", self.current_level, new_level);
            self.current_level = new_level;
            self.last_level_up_score = score;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.current_level = 1;
        self.last_level_up_score = 0;
        log::info!("Difficulty reset to level 1");
    }

    /// Force a level (clamped to `[1, max_level]`)
    pub fn set_level(&mut self, level: u32) {
        self.current_level = level.clamp(1, self.config.max_level);
        log::info!("Difficulty level set to {}", self.current_level);
    }

    #[inline]
    pub fn level(&self) -> u32 {
        self.current_level
    }

    #[inline]
    pub fn max_level(&self) -> u32 {
        self.config.max_level
    }

    #[inline]
    pub fn last_level_up_score(&self) -> u64 {
        self.last_level_up_score
    }

    /// Base seconds between spawns at the current level
    pub fn spawn_rate(&self) -> f32 {
        self.spawn_rate_at(self.current_level)
    }

    /// Fall speed for items spawned at the current level
    pub fn fall_speed(&self) -> f32 {
        self.fall_speed_at(self.current_level)
    }

    pub fn spawn_rate_at(&self, level: u32) -> f32 {
        let steps = self.steps(level);
        let rate = self.config.max_interval * (1.0 - self.config.decrease_per_level).powi(steps);
        rate.max(self.config.min_interval)
    }

    pub fn fall_speed_at(&self, level: u32) -> f32 {
        let steps = self.steps(level);
        let speed = self.config.min_speed * (1.0 + self.config.increase_per_level).powi(steps);
        speed.min(self.config.max_speed)
    }

    /// Levels above 1, with the level pinned to the valid range
    fn steps(&self, level: u32) -> i32 {
        (level.clamp(1, self.config.max_level) - 1) as i32
    }

    /// Fraction (0-1) of the way from the last level up to the next level
    pub fn progress_to_next_level(&self, score: u64) -> f32 {
        if self.is_max_difficulty() {
            return 1.0;
        }
        let into_level = score.saturating_sub(self.last_level_up_score);
        (into_level as f32 / self.config.points_per_level as f32).min(1.0)
    }

    pub fn points_to_next_level(&self, score: u64) -> u64 {
        if self.is_max_difficulty() {
            return 0;
        }
        let next_level_score = u64::from(self.current_level) * self.config.points_per_level;
        next_level_score.saturating_sub(score)
    }

    pub fn is_max_difficulty(&self) -> bool {
        self.current_level >= self.config.max_level
    }

    /// Scoring multiplier: +10% per level above 1
    pub fn difficulty_multiplier(&self) -> f32 {
        1.0 + (self.current_level - 1) as f32 * 0.1
    }

    pub fn stats(&self) -> DifficultyStats {
        DifficultyStats {
            level: self.current_level,
            max_level: self.config.max_level,
            spawn_rate: self.spawn_rate(),
            fall_speed: self.fall_speed(),
            points_per_level: self.config.points_per_level,
        }
    }
}
