//! Game state and session types
//!
//! `GameState` wires the pools, registry, difficulty curve and spawn
//! scheduler together for one run; `tick` drives it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::difficulty::{DifficultyEngine, DifficultyStats};
use super::entity::{EntityId, EntityKind, EntityView, SpawnParams};
use super::pools::{PoolRegistry, PoolRegistryStats};
use super::registry::{Driver, EntityRegistry};
use super::spawner::{SpawnScheduler, SpawnerStats};
use crate::config::GameConfig;
use crate::half_width;

/// Current phase of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Before the first game
    Menu,
    /// Active gameplay
    Playing,
    /// Frozen mid-run
    Paused,
    /// Run ended
    GameOver,
}

/// Something the rendering/audio side may want to react to
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum GameEvent {
    Spawned {
        id: EntityId,
        kind: EntityKind,
        position: Vec2,
    },
    Retired {
        id: EntityId,
        kind: EntityKind,
    },
    Caught {
        id: EntityId,
        kind: EntityKind,
        points: i32,
    },
    LevelUp {
        level: u32,
    },
    NewHighScore {
        score: u64,
    },
}

/// Score bookkeeping for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub score: u64,
    pub high_score: u64,
    /// Seconds spent in `Playing`
    pub elapsed: f32,
}

impl Session {
    pub fn with_high_score(high_score: u64) -> Self {
        Self {
            high_score,
            ..Default::default()
        }
    }

    /// Apply a signed score delta, saturating at zero
    ///
    /// Returns true when the high score was raised.
    pub fn add_score(&mut self, points: i32) -> bool {
        self.score = self.score.saturating_add_signed(i64::from(points));
        if self.score > self.high_score {
            self.high_score = self.score;
            return true;
        }
        false
    }

    /// Zero score and time; the high score survives
    pub fn reset(&mut self) {
        self.score = 0;
        self.elapsed = 0.0;
    }
}

/// Everything a stats/telemetry consumer polls
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GameStats {
    pub phase: GamePhase,
    pub session: Session,
    pub entities: usize,
    pub difficulty: DifficultyStats,
    pub spawner: SpawnerStats,
    pub pools: PoolRegistryStats,
}

pub struct GameState {
    pub config: GameConfig,
    /// Run seed for reproducibility
    pub seed: u64,
    pub phase: GamePhase,
    pub session: Session,
    pub difficulty: DifficultyEngine,
    pub pools: PoolRegistry,
    pub registry: EntityRegistry,
    pub spawner: SpawnScheduler,
    /// Events from the most recent ticks, drained by the consumer
    pub events: Vec<GameEvent>,
    /// Visible world width (follows the viewport aspect)
    world_width: f32,
}

impl GameState {
    /// Build a run in the `Menu` phase with the collector in place
    ///
    /// A config that fails validation is replaced by the defaults.
    pub fn new(config: GameConfig, seed: u64, high_score: u64) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                log::warn!("{}; using default config", e);
                GameConfig::default()
            }
        };
        let difficulty = DifficultyEngine::new(config.difficulty);
        let mut pools = PoolRegistry::new(&config);
        let mut registry =
            EntityRegistry::new(config.collector, config.performance.max_entities);
        registry.create_entity(EntityKind::Collector, &SpawnParams::default(), &mut pools);
        let spawner = SpawnScheduler::new(config.spawner, config.world.width, &difficulty, seed);

        Self {
            world_width: config.world.width,
            config,
            seed,
            phase: GamePhase::Menu,
            session: Session::with_high_score(high_score),
            difficulty,
            pools,
            registry,
            spawner,
            events: Vec::new(),
        }
    }

    /// Leave the menu (or a finished run) and start playing
    pub fn start(&mut self) {
        match self.phase {
            GamePhase::Menu => {
                self.phase = GamePhase::Playing;
                self.spawner.start();
                log::info!("Game started (seed {})", self.seed);
            }
            GamePhase::GameOver => self.new_game(),
            GamePhase::Playing | GamePhase::Paused => {}
        }
    }

    pub fn pause(&mut self) {
        if self.phase == GamePhase::Playing {
            self.phase = GamePhase::Paused;
            self.spawner.stop();
            log::info!("Game paused");
        }
    }

    pub fn resume(&mut self) {
        if self.phase == GamePhase::Paused {
            self.phase = GamePhase::Playing;
            self.spawner.start();
            log::info!("Game resumed");
        }
    }

    /// End the run; entities stay on screen until the next game
    pub fn game_over(&mut self) {
        if matches!(self.phase, GamePhase::Playing | GamePhase::Paused) {
            self.phase = GamePhase::GameOver;
            self.spawner.stop();
            log::info!(
                "Game over: score {} (high {})",
                self.session.score,
                self.session.high_score
            );
        }
    }

    /// Clear the field, reset score and difficulty, and play again
    pub fn new_game(&mut self) {
        for id in self.spawner.clear_all(&mut self.pools) {
            self.registry.forget(id);
        }
        self.registry.clear_all(true, &mut self.pools);
        if let Some(collector) = self.registry.collector_mut() {
            collector.pos.x = 0.0;
            collector.vel = Vec2::ZERO;
        }
        self.difficulty.reset();
        self.session.reset();
        self.events.clear();
        self.phase = GamePhase::Playing;
        self.spawner.start();
        log::info!("New game started");
    }

    /// Remove one entity through whichever component drives it
    ///
    /// Emits `Retired` so render mirrors drop it too.
    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        match self.registry.driver(id) {
            Some(Driver::Spawner) => {
                let released = self.spawner.despawn(id, &mut self.pools, &mut self.events);
                self.registry.forget(id);
                released
            }
            Some(Driver::Input | Driver::Registry) => {
                let destroyed = self.registry.destroy_entity(id, &mut self.pools);
                if destroyed {
                    self.events.push(GameEvent::Retired { id, kind: id.kind() });
                }
                destroyed
            }
            None => {
                log::warn!("Entity not found: {}", id);
                false
            }
        }
    }

    /// Keep the world height fixed and widen/narrow to the viewport
    pub fn set_viewport_aspect(&mut self, aspect: f32) {
        if !(aspect.is_finite() && aspect > 0.0) {
            log::warn!("Ignoring invalid viewport aspect {}", aspect);
            return;
        }
        self.world_width = self.config.world.height * aspect;
        self.spawner.set_world_width(self.world_width);
    }

    #[inline]
    pub fn world_width(&self) -> f32 {
        self.world_width
    }

    #[inline]
    pub fn half_world_width(&self) -> f32 {
        half_width(self.world_width)
    }

    #[inline]
    pub fn level(&self) -> u32 {
        self.difficulty.level()
    }

    /// Render snapshot of every live entity, in id order
    pub fn render_views(&self) -> Vec<EntityView> {
        self.registry
            .entities(&self.pools)
            .map(|entity| entity.view())
            .collect()
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, GameEvent> {
        self.events.drain(..)
    }

    pub fn stats(&self) -> GameStats {
        GameStats {
            phase: self.phase,
            session: self.session,
            entities: self.registry.count(),
            difficulty: self.difficulty.stats(),
            spawner: self.spawner.stats(&self.pools),
            pools: self.pools.stats(),
        }
    }
}
