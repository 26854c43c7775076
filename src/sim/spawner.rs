//! Time-accumulator spawn scheduling
//!
//! Each frame the scheduler adds `dt` to its accumulator and emits at most
//! one spawn once the accumulator reaches the current (jittered) interval.
//! It then advances every entity it spawned on an earlier frame and retires
//! the ones that went inactive back to their pools.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use super::difficulty::DifficultyEngine;
use super::entity::{Entity, EntityId, EntityKind, HazardKind};
use super::pools::PoolRegistry;
use super::state::GameEvent;
use crate::config::SpawnerConfig;
use crate::consts::{SPAWN_JITTER_MAX, SPAWN_JITTER_MIN};
use crate::half_width;

/// Snapshot for UI/telemetry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpawnerStats {
    pub running: bool,
    pub throttled: bool,
    /// Spawns since construction
    pub total_spawned: u64,
    /// Entities currently tracked (spawned, not yet retired)
    pub tracked: usize,
    pub active: usize,
    pub collectibles: usize,
    pub hazards: usize,
    /// Seconds until the next spawn is due
    pub next_spawn_in: f32,
}

pub struct SpawnScheduler {
    config: SpawnerConfig,
    world_width: f32,
    rng: Pcg32,
    running: bool,
    throttled: bool,
    time_since_last_spawn: f32,
    next_spawn_interval: f32,
    /// Spawn order, oldest first
    spawned: Vec<EntityId>,
    total_spawned: u64,
}

impl SpawnScheduler {
    pub fn new(
        config: SpawnerConfig,
        world_width: f32,
        difficulty: &DifficultyEngine,
        seed: u64,
    ) -> Self {
        let mut scheduler = Self {
            config,
            world_width,
            rng: Pcg32::seed_from_u64(seed),
            running: false,
            throttled: false,
            time_since_last_spawn: 0.0,
            next_spawn_interval: difficulty.spawn_rate(),
            spawned: Vec::new(),
            total_spawned: 0,
        };
        scheduler.next_spawn_interval = scheduler.draw_interval(difficulty);
        log::info!("Spawn scheduler initialized (seed {})", seed);
        scheduler
    }

    pub fn start(&mut self) {
        self.running = true;
        self.time_since_last_spawn = 0.0;
        log::info!("Spawn scheduler started");
    }

    /// Halt spawning and advancement; tracked entities stay where they are
    pub fn stop(&mut self) {
        self.running = false;
        log::info!("Spawn scheduler stopped");
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Hold back due spawns without losing the accumulated time
    pub fn set_throttled(&mut self, throttled: bool) {
        if throttled != self.throttled {
            log::debug!("Spawn throttle {}", if throttled { "on" } else { "off" });
        }
        self.throttled = throttled;
    }

    /// Advance one frame
    ///
    /// Entities spawned during this call are neither advanced nor checked
    /// for retirement until the next call.
    pub fn update(
        &mut self,
        dt: f32,
        difficulty: &DifficultyEngine,
        pools: &mut PoolRegistry,
        events: &mut Vec<GameEvent>,
    ) {
        if !self.running {
            return;
        }

        self.time_since_last_spawn += dt;

        let mut spawned_now = false;
        if self.time_since_last_spawn >= self.next_spawn_interval {
            if self.throttled {
                log::trace!("Spawn due but throttled");
            } else {
                self.spawn(difficulty, pools, events);
                self.time_since_last_spawn = 0.0;
                self.next_spawn_interval = self.draw_interval(difficulty);
                spawned_now = true;
            }
        }
        // Fresh spawns sit at the tail and wait for the next frame
        let existing = self.spawned.len() - usize::from(spawned_now);

        let mut index = 0;
        self.spawned.retain(|&id| {
            let fresh = index >= existing;
            index += 1;
            if fresh {
                return true;
            }

            // Released elsewhere and not handed out again
            if !pools.is_live(id) {
                events.push(GameEvent::Retired { id, kind: id.kind() });
                return false;
            }

            let active = match pools.get_mut(id) {
                Some(entity) => {
                    entity.advance(dt);
                    entity.active
                }
                None => false,
            };
            if !active {
                pools.release_entity(id);
                events.push(GameEvent::Retired { id, kind: id.kind() });
                log::trace!("Retired {}", id);
            }
            active
        });
    }

    fn spawn(
        &mut self,
        difficulty: &DifficultyEngine,
        pools: &mut PoolRegistry,
        events: &mut Vec<GameEvent>,
    ) {
        let probability = self.config.collectible_probability.clamp(0.0, 1.0);
        let collectible = self.rng.random_bool(probability);

        let position = Vec2::new(self.random_x(), self.config.spawn_y);
        // Frozen for the entity's lifetime
        let speed = difficulty.fall_speed();

        let (id, kind) = if collectible {
            (
                pools.acquire_collectible(position, speed),
                EntityKind::Collectible,
            )
        } else {
            let subtype = HazardKind::ALL[self.rng.random_range(0..HazardKind::ALL.len())];
            (
                pools.acquire_hazard(position, speed, subtype),
                EntityKind::Hazard,
            )
        };

        // A recycled slot keeps its id; drop whatever entry the previous
        // lifetime left behind so the id is tracked once
        if let Some(stale) = self.spawned.iter().position(|&tracked| tracked == id) {
            self.spawned.remove(stale);
            events.push(GameEvent::Retired { id, kind });
            log::debug!("Dropped stale entry for recycled {}", id);
        }

        self.spawned.push(id);
        self.total_spawned += 1;
        events.push(GameEvent::Spawned { id, kind, position });
        log::trace!("Spawned {} at ({:.2}, {:.2})", id, position.x, position.y);
    }

    /// Uniform in the spawn rate's jitter band
    fn draw_interval(&mut self, difficulty: &DifficultyEngine) -> f32 {
        let rate = difficulty.spawn_rate();
        let (low, high) = (rate * SPAWN_JITTER_MIN, rate * SPAWN_JITTER_MAX);
        if low < high {
            self.rng.random_range(low..high)
        } else {
            low
        }
    }

    /// Uniform across the world width minus the edge margins
    fn random_x(&mut self) -> f32 {
        let extent = half_width(self.world_width) - self.config.edge_margin;
        if extent > 0.0 {
            self.rng.random_range(-extent..extent)
        } else {
            0.0
        }
    }

    /// Release every tracked entity back to its pool
    ///
    /// Returns the ids that were tracked so mirrors can drop them.
    pub fn clear_all(&mut self, pools: &mut PoolRegistry) -> Vec<EntityId> {
        let cleared = std::mem::take(&mut self.spawned);
        for &id in &cleared {
            if pools.is_live(id) {
                pools.release_entity(id);
            }
        }
        log::info!("Cleared {} spawned entities", cleared.len());
        cleared
    }

    /// Stop tracking one entity and release it to its pool
    ///
    /// Returns false (and changes nothing) if `id` is not tracked.
    pub fn despawn(
        &mut self,
        id: EntityId,
        pools: &mut PoolRegistry,
        events: &mut Vec<GameEvent>,
    ) -> bool {
        let Some(index) = self.spawned.iter().position(|&tracked| tracked == id) else {
            log::warn!("Spawner is not tracking {}", id);
            return false;
        };
        self.spawned.remove(index);
        if pools.is_live(id) {
            pools.release_entity(id);
        }
        events.push(GameEvent::Retired { id, kind: id.kind() });
        log::debug!("Despawned {}", id);
        true
    }

    /// Override the interval until the next spawn (testing/tuning)
    pub fn set_spawn_interval(&mut self, seconds: f32) {
        self.next_spawn_interval = seconds.max(f32::MIN_POSITIVE);
    }

    pub fn set_world_width(&mut self, width: f32) {
        self.world_width = width;
    }

    #[inline]
    pub fn world_width(&self) -> f32 {
        self.world_width
    }

    pub fn next_spawn_in(&self) -> f32 {
        (self.next_spawn_interval - self.time_since_last_spawn).max(0.0)
    }

    /// Tracked ids, oldest first
    pub fn tracked(&self) -> &[EntityId] {
        &self.spawned
    }

    pub fn active_entities<'a>(&'a self, pools: &'a PoolRegistry) -> impl Iterator<Item = &'a Entity> {
        self.spawned
            .iter()
            .filter_map(|&id| pools.get(id))
            .filter(|e| e.active)
    }

    pub fn entities_by_kind<'a>(
        &'a self,
        kind: EntityKind,
        pools: &'a PoolRegistry,
    ) -> impl Iterator<Item = &'a Entity> {
        self.active_entities(pools).filter(move |e| e.kind == kind)
    }

    pub fn stats(&self, pools: &PoolRegistry) -> SpawnerStats {
        SpawnerStats {
            running: self.running,
            throttled: self.throttled,
            total_spawned: self.total_spawned,
            tracked: self.spawned.len(),
            active: self.active_entities(pools).count(),
            collectibles: self.entities_by_kind(EntityKind::Collectible, pools).count(),
            hazards: self.entities_by_kind(EntityKind::Hazard, pools).count(),
            next_spawn_in: self.next_spawn_in(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::consts::SIM_DT;

    fn setup(seed: u64) -> (SpawnScheduler, DifficultyEngine, PoolRegistry) {
        setup_with(GameConfig::default(), seed)
    }

    fn setup_with(
        config: GameConfig,
        seed: u64,
    ) -> (SpawnScheduler, DifficultyEngine, PoolRegistry) {
        let difficulty = DifficultyEngine::new(config.difficulty);
        let scheduler = SpawnScheduler::new(config.spawner, config.world.width, &difficulty, seed);
        (scheduler, difficulty, PoolRegistry::new(&config))
    }

    fn spawns(events: &[GameEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, GameEvent::Spawned { .. }))
            .count()
    }

    fn run(
        scheduler: &mut SpawnScheduler,
        difficulty: &DifficultyEngine,
        pools: &mut PoolRegistry,
        seconds: f32,
    ) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let frames = (seconds / SIM_DT).round() as usize;
        for _ in 0..frames {
            scheduler.update(SIM_DT, difficulty, pools, &mut events);
        }
        events
    }

    #[test]
    fn test_spawn_count_tracks_rate() {
        for level in [1, 5, 10] {
            let (mut scheduler, mut difficulty, mut pools) = setup(7);
            difficulty.set_level(level);
            scheduler.start();

            let seconds = 600.0;
            let events = run(&mut scheduler, &difficulty, &mut pools, seconds);
            let rate = difficulty.spawn_rate();
            let count = spawns(&events) as f32;

            assert!(count >= seconds / (rate * SPAWN_JITTER_MAX), "level {level}: {count}");
            assert!(count <= seconds / (rate * SPAWN_JITTER_MIN), "level {level}: {count}");
        }
    }

    #[test]
    fn test_fresh_spawn_not_advanced() {
        let (mut scheduler, difficulty, mut pools) = setup(1);
        scheduler.start();
        scheduler.set_spawn_interval(0.1);

        let mut events = Vec::new();
        scheduler.update(0.5, &difficulty, &mut pools, &mut events);

        let &[GameEvent::Spawned { id, position, .. }] = events.as_slice() else {
            panic!("expected one spawn, got {events:?}");
        };
        assert_eq!(position.y, 8.0);
        assert_eq!(pools.get(id).unwrap().pos.y, 8.0);

        scheduler.set_spawn_interval(100.0);
        scheduler.update(0.5, &difficulty, &mut pools, &mut events);
        assert!((pools.get(id).unwrap().pos.y - 7.25).abs() < 1e-5);
    }

    #[test]
    fn test_retires_after_leaving_world() {
        let (mut scheduler, difficulty, mut pools) = setup(3);
        scheduler.start();
        scheduler.set_spawn_interval(0.1);

        let mut events = Vec::new();
        scheduler.update(0.2, &difficulty, &mut pools, &mut events);
        assert_eq!(scheduler.tracked().len(), 1);
        let id = scheduler.tracked()[0];

        // 17 units to fall at 1.5/s
        scheduler.set_spawn_interval(1_000.0);
        for _ in 0..20 {
            scheduler.update(1.0, &difficulty, &mut pools, &mut events);
        }

        let retired: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, GameEvent::Retired { .. }))
            .collect();
        assert_eq!(retired, vec![&GameEvent::Retired { id, kind: id.kind() }]);
        assert!(scheduler.tracked().is_empty());
        assert!(!pools.is_live(id));
        let stats = pools.stats();
        assert_eq!(stats.collectible.in_use + stats.hazard.in_use, 0);
    }

    #[test]
    fn test_stopped_is_noop() {
        let (mut scheduler, difficulty, mut pools) = setup(1);
        let mut events = Vec::new();
        scheduler.update(100.0, &difficulty, &mut pools, &mut events);
        assert!(events.is_empty());
        assert_eq!(scheduler.stats(&pools).total_spawned, 0);

        scheduler.start();
        scheduler.set_spawn_interval(0.1);
        scheduler.update(0.2, &difficulty, &mut pools, &mut events);
        let id = scheduler.tracked()[0];
        scheduler.stop();
        scheduler.update(5.0, &difficulty, &mut pools, &mut events);
        assert_eq!(pools.get(id).unwrap().pos.y, 8.0);
        assert_eq!(spawns(&events), 1);
    }

    #[test]
    fn test_throttle_holds_due_spawn() {
        let (mut scheduler, difficulty, mut pools) = setup(1);
        scheduler.start();
        scheduler.set_spawn_interval(0.5);
        scheduler.set_throttled(true);

        let mut events = Vec::new();
        scheduler.update(1.0, &difficulty, &mut pools, &mut events);
        assert!(events.is_empty());
        assert_eq!(scheduler.next_spawn_in(), 0.0);

        scheduler.set_throttled(false);
        scheduler.update(SIM_DT, &difficulty, &mut pools, &mut events);
        assert_eq!(spawns(&events), 1);
    }

    #[test]
    fn test_deterministic_by_seed() {
        let (mut a, difficulty, mut pools_a) = setup(42);
        let (mut b, _, mut pools_b) = setup(42);
        a.start();
        b.start();
        let events_a = run(&mut a, &difficulty, &mut pools_a, 60.0);
        let events_b = run(&mut b, &difficulty, &mut pools_b, 60.0);
        assert!(spawns(&events_a) > 0);
        assert_eq!(events_a, events_b);
    }

    #[test]
    fn test_spawn_placement() {
        let (mut scheduler, difficulty, mut pools) = setup(9);
        scheduler.start();
        let events = run(&mut scheduler, &difficulty, &mut pools, 120.0);
        for event in &events {
            if let GameEvent::Spawned { id, kind, position } = *event {
                assert!(position.x.abs() <= 4.5);
                assert_eq!(position.y, 8.0);
                assert_eq!(id.kind(), kind);
            }
        }

        // No room between the margins: spawn on the center line
        scheduler.set_world_width(0.8);
        scheduler.set_spawn_interval(0.01);
        let mut events = Vec::new();
        scheduler.update(0.1, &difficulty, &mut pools, &mut events);
        assert!(matches!(
            events.last(),
            Some(GameEvent::Spawned { position, .. }) if position.x == 0.0
        ));
    }

    #[test]
    fn test_clear_all_releases() {
        let (mut scheduler, difficulty, mut pools) = setup(5);
        scheduler.start();
        run(&mut scheduler, &difficulty, &mut pools, 10.0);
        let tracked = scheduler.tracked().len();
        assert!(tracked > 0);

        let cleared = scheduler.clear_all(&mut pools);
        assert_eq!(cleared.len(), tracked);
        assert!(cleared.iter().all(|&id| !pools.is_live(id)));
        assert_eq!(scheduler.stats(&pools).active, 0);
    }

    #[test]
    fn test_stats_counts_by_kind() {
        let (mut scheduler, difficulty, mut pools) = setup(11);
        scheduler.start();
        run(&mut scheduler, &difficulty, &mut pools, 8.0);
        let stats = scheduler.stats(&pools);
        assert!(stats.running);
        assert_eq!(stats.collectibles + stats.hazards, stats.active);
        assert!(stats.next_spawn_in >= 0.0);
    }

    fn only_collectibles() -> GameConfig {
        let mut config = GameConfig::default();
        config.spawner.collectible_probability = 1.0;
        config
    }

    fn retired_count(events: &[GameEvent], target: EntityId) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, GameEvent::Retired { id, .. } if *id == target))
            .count()
    }

    #[test]
    fn test_recycled_id_tracked_once() {
        let (mut scheduler, difficulty, mut pools) = setup_with(only_collectibles(), 4);
        scheduler.start();
        scheduler.set_spawn_interval(0.01);

        let mut events = Vec::new();
        scheduler.update(SIM_DT, &difficulty, &mut pools, &mut events);
        let first = scheduler.tracked()[0];

        // Released behind the scheduler's back; the next acquire reuses the slot
        assert!(pools.release_entity(first));
        scheduler.set_spawn_interval(0.01);
        events.clear();
        scheduler.update(SIM_DT, &difficulty, &mut pools, &mut events);

        assert_eq!(scheduler.tracked(), &[first]);
        assert_eq!(pools.get(first).unwrap().pos.y, 8.0);
        assert_eq!(retired_count(&events, first), 1);
        let retired_at = events
            .iter()
            .position(|e| matches!(e, GameEvent::Retired { .. }))
            .unwrap();
        let spawned_at = events
            .iter()
            .position(|e| matches!(e, GameEvent::Spawned { .. }))
            .unwrap();
        assert!(retired_at < spawned_at);

        // Advanced once per frame from here on
        scheduler.set_spawn_interval(1_000.0);
        scheduler.update(1.0, &difficulty, &mut pools, &mut events);
        assert!((pools.get(first).unwrap().pos.y - 6.5).abs() < 1e-5);
        assert!(pools.pool(EntityKind::Collectible).unwrap().is_consistent());
    }

    #[test]
    fn test_despawn_releases_once() {
        let (mut scheduler, difficulty, mut pools) = setup(6);
        scheduler.start();
        scheduler.set_spawn_interval(0.01);

        let mut events = Vec::new();
        scheduler.update(SIM_DT, &difficulty, &mut pools, &mut events);
        let id = scheduler.tracked()[0];
        events.clear();

        assert!(scheduler.despawn(id, &mut pools, &mut events));
        assert!(!pools.is_live(id));
        assert!(scheduler.tracked().is_empty());
        assert_eq!(events, vec![GameEvent::Retired { id, kind: id.kind() }]);

        assert!(!scheduler.despawn(id, &mut pools, &mut events));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_kind_follows_probability() {
        let (mut scheduler, difficulty, mut pools) = setup_with(only_collectibles(), 2);
        scheduler.start();
        let events = run(&mut scheduler, &difficulty, &mut pools, 30.0);
        assert!(spawns(&events) > 0);
        assert!(events.iter().all(|e| !matches!(
            e,
            GameEvent::Spawned {
                kind: EntityKind::Hazard,
                ..
            }
        )));

        let mut config = GameConfig::default();
        config.spawner.collectible_probability = 0.0;
        let (mut scheduler, difficulty, mut pools) = setup_with(config, 2);
        scheduler.start();
        let events = run(&mut scheduler, &difficulty, &mut pools, 30.0);
        for event in &events {
            if let GameEvent::Spawned { id, kind, .. } = *event {
                assert_eq!(kind, EntityKind::Hazard);
                assert!(pools.get(id).unwrap().hazard.is_some());
            }
        }
    }
}
