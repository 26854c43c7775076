//! Authoritative index of every live entity
//!
//! The registry owns the collector outright. Falling items live in the pools;
//! the registry only indexes them, remembering who moves each one:
//! - items made through `create_entity` are advanced by `update_all`
//! - items spawned by the scheduler are mirrored here but advanced (and
//!   retired) by the scheduler, so nothing is stepped twice per frame

use std::collections::BTreeMap;

use super::entity::{Entity, EntityId, EntityKind, SpawnParams};
use super::pools::PoolRegistry;
use crate::config::CollectorConfig;

/// Who drives an indexed entity's motion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    /// Player input (the collector)
    Input,
    /// `EntityRegistry::update_all`
    Registry,
    /// The spawn scheduler
    Spawner,
}

pub struct EntityRegistry {
    collector_config: CollectorConfig,
    collector: Option<Entity>,
    /// Ordered by id for deterministic iteration
    index: BTreeMap<EntityId, Driver>,
    max_entities: usize,
    /// Scratch list for the removal pass
    retired: Vec<EntityId>,
}

impl EntityRegistry {
    pub fn new(collector_config: CollectorConfig, max_entities: usize) -> Self {
        log::info!("Entity registry initialized (soft limit {})", max_entities);
        Self {
            collector_config,
            collector: None,
            index: BTreeMap::new(),
            max_entities,
            retired: Vec::new(),
        }
    }

    /// Build and register an entity
    ///
    /// The collector is constructed here and owned by the registry; pooled
    /// kinds are acquired from `pools` and advanced by `update_all`.
    pub fn create_entity(
        &mut self,
        kind: EntityKind,
        params: &SpawnParams,
        pools: &mut PoolRegistry,
    ) -> Option<EntityId> {
        let id = match kind {
            EntityKind::Collector => {
                if self.collector.is_some() {
                    log::warn!("Collector already exists; ignoring create");
                    return None;
                }
                let mut collector = Entity::collector(&self.collector_config);
                collector.pos.x = params.pos.x;
                let id = collector.id;
                self.collector = Some(collector);
                self.index.insert(id, Driver::Input);
                id
            }
            EntityKind::Collectible | EntityKind::Hazard => {
                let id = pools.acquire(kind, params)?;
                self.index.insert(id, Driver::Registry);
                id
            }
        };
        log::debug!("Entity created: {}", id);
        Some(id)
    }

    /// Mirror an entity the scheduler acquired
    pub fn track_spawned(&mut self, id: EntityId, pools: &PoolRegistry) -> bool {
        if !pools.is_live(id) {
            log::warn!("Cannot track {}: not a live pooled entity", id);
            return false;
        }
        self.index.insert(id, Driver::Spawner);
        true
    }

    /// Drop a mirrored entry without touching its pool
    pub fn forget(&mut self, id: EntityId) -> bool {
        match self.index.get(&id) {
            Some(Driver::Spawner) => {
                self.index.remove(&id);
                true
            }
            Some(_) => {
                log::warn!("Entity {} is not scheduler-driven; use destroy_entity", id);
                false
            }
            None => false,
        }
    }

    /// Remove an entity and hand it back to whoever owns its memory
    ///
    /// Scheduler-driven entities are refused: their owner is the scheduler,
    /// which must stop tracking them before the slot can be recycled (see
    /// `GameState::destroy_entity`).
    pub fn destroy_entity(&mut self, id: EntityId, pools: &mut PoolRegistry) -> bool {
        match self.index.get(&id) {
            None => {
                log::warn!("Entity not found: {}", id);
                return false;
            }
            Some(Driver::Spawner) => {
                log::warn!("Entity {} is scheduler-driven; destroy it through the scheduler", id);
                return false;
            }
            Some(Driver::Input | Driver::Registry) => {}
        }
        self.index.remove(&id);
        match id.kind() {
            EntityKind::Collector => {
                if let Some(mut collector) = self.collector.take() {
                    collector.active = false;
                }
            }
            EntityKind::Collectible | EntityKind::Hazard => {
                pools.release_entity(id);
            }
        }
        log::debug!("Entity destroyed: {}", id);
        true
    }

    /// Advance registry-driven entities, then remove the ones that went inactive
    ///
    /// Returns the ids removed this pass. The collector is moved by input and
    /// scheduler-driven items by the scheduler, so both are skipped.
    pub fn update_all(&mut self, dt: f32, pools: &mut PoolRegistry) -> &[EntityId] {
        self.retired.clear();

        for (&id, &driver) in &self.index {
            if driver != Driver::Registry {
                continue;
            }
            if let Some(entity) = pools.get_mut(id) {
                entity.advance(dt);
            }
        }

        for (&id, &driver) in &self.index {
            if driver == Driver::Registry && !pools.get(id).is_some_and(|e| e.active) {
                self.retired.push(id);
            }
        }

        for &id in &self.retired {
            self.index.remove(&id);
            pools.release_entity(id);
            log::trace!("Entity retired: {}", id);
        }

        &self.retired
    }

    /// Destroy every entity this registry drives, optionally sparing the collector
    ///
    /// Scheduler-driven mirrors are left alone; clear the scheduler first.
    pub fn clear_all(&mut self, keep_collector: bool, pools: &mut PoolRegistry) {
        let doomed: Vec<EntityId> = self
            .index
            .iter()
            .filter(|&(id, driver)| match driver {
                Driver::Input => !keep_collector,
                Driver::Registry => true,
                Driver::Spawner => {
                    log::debug!("Leaving scheduler-driven {} for the scheduler", id);
                    false
                }
            })
            .map(|(&id, _)| id)
            .collect();
        let count = doomed.len();
        for id in doomed {
            self.destroy_entity(id, pools);
        }
        log::info!("Cleared {} entities", count);
    }

    pub fn get<'a>(&'a self, id: EntityId, pools: &'a PoolRegistry) -> Option<&'a Entity> {
        if !self.index.contains_key(&id) {
            return None;
        }
        match id.kind() {
            EntityKind::Collector => self.collector.as_ref(),
            EntityKind::Collectible | EntityKind::Hazard => pools.get(id),
        }
    }

    #[inline]
    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn driver(&self, id: EntityId) -> Option<Driver> {
        self.index.get(&id).copied()
    }

    pub fn collector(&self) -> Option<&Entity> {
        self.collector.as_ref()
    }

    pub fn collector_mut(&mut self) -> Option<&mut Entity> {
        self.collector.as_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.index.keys().copied()
    }

    /// Every live entity, in id order
    pub fn entities<'a>(&'a self, pools: &'a PoolRegistry) -> impl Iterator<Item = &'a Entity> {
        self.index.keys().filter_map(move |&id| self.get(id, pools))
    }

    pub fn entities_by_kind<'a>(
        &'a self,
        kind: EntityKind,
        pools: &'a PoolRegistry,
    ) -> impl Iterator<Item = &'a Entity> {
        self.entities(pools).filter(move |e| e.kind == kind)
    }

    pub fn active_entities<'a>(&'a self, pools: &'a PoolRegistry) -> impl Iterator<Item = &'a Entity> {
        self.entities(pools).filter(|e| e.active)
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.index.len()
    }

    pub fn count_by_kind(&self, kind: EntityKind) -> usize {
        self.index.keys().filter(|id| id.kind() == kind).count()
    }

    /// Soft cap used upstream to hold back spawning
    pub fn is_entity_limit_reached(&self) -> bool {
        self.index.len() >= self.max_entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::sim::entity::HazardKind;
    use glam::Vec2;

    fn setup() -> (EntityRegistry, PoolRegistry) {
        let config = GameConfig::default();
        (
            EntityRegistry::new(config.collector, 4),
            PoolRegistry::new(&config),
        )
    }

    fn falling(x: f32, y: f32) -> SpawnParams {
        SpawnParams {
            pos: Vec2::new(x, y),
            speed: 2.0,
            hazard: None,
        }
    }

    #[test]
    fn test_single_collector() {
        let (mut registry, mut pools) = setup();
        let id = registry
            .create_entity(EntityKind::Collector, &falling(1.0, 0.0), &mut pools)
            .unwrap();
        assert_eq!(id, EntityId::COLLECTOR);
        assert_eq!(registry.collector().unwrap().pos, Vec2::new(1.0, -7.0));

        assert!(registry
            .create_entity(EntityKind::Collector, &falling(0.0, 0.0), &mut pools)
            .is_none());
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_create_and_lookup_pooled() {
        let (mut registry, mut pools) = setup();
        let params = SpawnParams {
            hazard: Some(HazardKind::Plastic),
            ..falling(0.5, 3.0)
        };
        let id = registry
            .create_entity(EntityKind::Hazard, &params, &mut pools)
            .unwrap();

        let entity = registry.get(id, &pools).unwrap();
        assert_eq!(entity.hazard, Some(HazardKind::Plastic));
        assert_eq!(registry.driver(id), Some(Driver::Registry));
        assert_eq!(registry.count_by_kind(EntityKind::Hazard), 1);
        assert_eq!(pools.stats().hazard.in_use, 1);
    }

    #[test]
    fn test_update_skips_collector_and_spawned() {
        let (mut registry, mut pools) = setup();
        registry.create_entity(EntityKind::Collector, &falling(0.0, 0.0), &mut pools);
        let owned = registry
            .create_entity(EntityKind::Collectible, &falling(0.0, 5.0), &mut pools)
            .unwrap();
        let spawned = pools.acquire_collectible(Vec2::new(1.0, 5.0), 2.0);
        assert!(registry.track_spawned(spawned, &pools));

        let removed = registry.update_all(0.5, &mut pools);
        assert!(removed.is_empty());

        assert_eq!(registry.get(owned, &pools).unwrap().pos.y, 4.0);
        assert_eq!(registry.get(spawned, &pools).unwrap().pos.y, 5.0);
        assert_eq!(registry.collector().unwrap().pos.y, -7.0);
    }

    #[test]
    fn test_update_retires_inactive() {
        let (mut registry, mut pools) = setup();
        let low = registry
            .create_entity(EntityKind::Collectible, &falling(0.0, -8.5), &mut pools)
            .unwrap();
        let high = registry
            .create_entity(EntityKind::Collectible, &falling(0.0, 5.0), &mut pools)
            .unwrap();

        let removed = registry.update_all(0.5, &mut pools).to_vec();
        assert_eq!(removed, vec![low]);
        assert!(!registry.contains(low));
        assert!(registry.contains(high));
        assert!(!pools.is_live(low));
        assert!(pools.pool(EntityKind::Collectible).unwrap().is_consistent());
    }

    #[test]
    fn test_destroy_unknown_is_noop() {
        let (mut registry, mut pools) = setup();
        let stray = pools.acquire_collectible(Vec2::ZERO, 1.0);
        assert!(!registry.destroy_entity(stray, &mut pools));
        // Not ours to release
        assert!(pools.is_live(stray));
    }

    #[test]
    fn test_destroy_releases_to_pool() {
        let (mut registry, mut pools) = setup();
        let id = registry
            .create_entity(EntityKind::Collectible, &falling(0.0, 0.0), &mut pools)
            .unwrap();
        assert!(registry.destroy_entity(id, &mut pools));
        assert!(!pools.is_live(id));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_forget_only_mirrored() {
        let (mut registry, mut pools) = setup();
        let owned = registry
            .create_entity(EntityKind::Collectible, &falling(0.0, 0.0), &mut pools)
            .unwrap();
        assert!(!registry.forget(owned));
        assert!(registry.contains(owned));

        let spawned = pools.acquire_hazard(Vec2::ZERO, 1.0, HazardKind::Oil);
        registry.track_spawned(spawned, &pools);
        assert!(registry.forget(spawned));
        assert!(pools.is_live(spawned));
    }

    #[test]
    fn test_entity_limit() {
        let (mut registry, mut pools) = setup();
        registry.create_entity(EntityKind::Collector, &falling(0.0, 0.0), &mut pools);
        for i in 0..3 {
            assert!(!registry.is_entity_limit_reached());
            registry.create_entity(EntityKind::Collectible, &falling(i as f32, 0.0), &mut pools);
        }
        assert!(registry.is_entity_limit_reached());
    }

    #[test]
    fn test_clear_all_keeps_collector() {
        let (mut registry, mut pools) = setup();
        registry.create_entity(EntityKind::Collector, &falling(0.0, 0.0), &mut pools);
        registry.create_entity(EntityKind::Collectible, &falling(0.0, 0.0), &mut pools);
        registry.create_entity(EntityKind::Hazard, &falling(0.0, 0.0), &mut pools);

        registry.clear_all(true, &mut pools);
        assert_eq!(registry.count(), 1);
        assert!(registry.collector().is_some());
        assert_eq!(pools.stats().collectible.in_use, 0);
        assert_eq!(pools.stats().hazard.in_use, 0);

        registry.clear_all(false, &mut pools);
        assert_eq!(registry.count(), 0);
        assert!(registry.collector().is_none());
    }

    #[test]
    fn test_queries() {
        let (mut registry, mut pools) = setup();
        registry.create_entity(EntityKind::Collector, &falling(0.0, 0.0), &mut pools);
        let drop = registry
            .create_entity(EntityKind::Collectible, &falling(0.0, 0.0), &mut pools)
            .unwrap();
        registry.create_entity(EntityKind::Hazard, &falling(0.0, 0.0), &mut pools);
        pools.get_mut(drop).unwrap().active = false;

        assert_eq!(registry.entities(&pools).count(), 3);
        assert_eq!(registry.active_entities(&pools).count(), 2);
        assert_eq!(
            registry
                .entities_by_kind(EntityKind::Hazard, &pools)
                .count(),
            1
        );
    }

    #[test]
    fn test_refuses_scheduler_driven_destroy() {
        let (mut registry, mut pools) = setup();
        let spawned = pools.acquire_collectible(Vec2::ZERO, 1.0);
        registry.track_spawned(spawned, &pools);

        assert!(!registry.destroy_entity(spawned, &mut pools));
        assert!(registry.contains(spawned));
        assert!(pools.is_live(spawned));

        registry.clear_all(false, &mut pools);
        assert!(registry.contains(spawned));
        assert!(pools.is_live(spawned));
        assert!(registry.forget(spawned));
        assert_eq!(registry.count(), 0);
    }
}
