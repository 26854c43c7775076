//! One reuse pool per recyclable entity kind

use glam::Vec2;
use serde::Serialize;

use super::entity::{Entity, EntityId, EntityKind, HazardKind, SpawnParams};
use super::pool::{ObjectPool, PoolStats};
use crate::config::GameConfig;
use crate::despawn_threshold;

/// Advisory report for a pool running hot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolHealthIssue {
    pub kind: EntityKind,
    pub message: String,
    pub stats: PoolStats,
}

/// Stats for every pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PoolRegistryStats {
    pub collectible: PoolStats,
    pub hazard: PoolStats,
}

/// Owns every collectible and hazard instance
pub struct PoolRegistry {
    collectibles: ObjectPool<Entity>,
    hazards: ObjectPool<Entity>,
    health_threshold: f32,
}

impl PoolRegistry {
    pub fn new(config: &GameConfig) -> Self {
        let despawn_y = despawn_threshold(config.world.height);

        let collectible = config.collectible.item();
        let collectibles = ObjectPool::new(
            "collectible",
            config.performance.pool_size_collectible,
            move |handle, params: &SpawnParams| {
                Entity::falling(
                    EntityId::pooled(EntityKind::Collectible, handle),
                    &collectible,
                    despawn_y,
                    params,
                )
            },
        );

        let hazard = config.hazard.item();
        let hazards = ObjectPool::new(
            "hazard",
            config.performance.pool_size_hazard,
            move |handle, params: &SpawnParams| {
                Entity::falling(
                    EntityId::pooled(EntityKind::Hazard, handle),
                    &hazard,
                    despawn_y,
                    params,
                )
            },
        );

        log::info!(
            "Entity pools initialized (collectible: {}, hazard: {})",
            config.performance.pool_size_collectible,
            config.performance.pool_size_hazard
        );

        Self {
            collectibles,
            hazards,
            health_threshold: config.performance.pool_health_threshold,
        }
    }

    pub fn acquire_collectible(&mut self, pos: Vec2, speed: f32) -> EntityId {
        let handle = self.collectibles.acquire(&SpawnParams {
            pos,
            speed,
            hazard: None,
        });
        EntityId::pooled(EntityKind::Collectible, handle)
    }

    pub fn acquire_hazard(&mut self, pos: Vec2, speed: f32, subtype: HazardKind) -> EntityId {
        let handle = self.hazards.acquire(&SpawnParams {
            pos,
            speed,
            hazard: Some(subtype),
        });
        EntityId::pooled(EntityKind::Hazard, handle)
    }

    /// Acquire by kind; the collector is not pooled and is rejected
    pub fn acquire(&mut self, kind: EntityKind, params: &SpawnParams) -> Option<EntityId> {
        match kind {
            EntityKind::Collectible => Some(self.acquire_collectible(params.pos, params.speed)),
            EntityKind::Hazard => Some(self.acquire_hazard(
                params.pos,
                params.speed,
                params.hazard.unwrap_or_default(),
            )),
            EntityKind::Collector => {
                log::warn!("No pool for entity kind: {}", kind);
                None
            }
        }
    }

    /// Return an entity to the pool that owns it
    pub fn release_entity(&mut self, id: EntityId) -> bool {
        let Some(handle) = id.handle() else {
            log::warn!("No pool for entity kind: {}", id.kind());
            return false;
        };
        match self.pool_mut(id.kind()) {
            Some(pool) => pool.release(handle),
            None => false,
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        let handle = id.handle()?;
        self.pool(id.kind())?.get(handle)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let handle = id.handle()?;
        self.pool_mut(id.kind())?.get_mut(handle)
    }

    /// Whether `id` names an instance currently handed out
    pub fn is_live(&self, id: EntityId) -> bool {
        match (id.handle(), self.pool(id.kind())) {
            (Some(handle), Some(pool)) => pool.is_in_use(handle),
            _ => false,
        }
    }

    pub fn pool(&self, kind: EntityKind) -> Option<&ObjectPool<Entity>> {
        match kind {
            EntityKind::Collectible => Some(&self.collectibles),
            EntityKind::Hazard => Some(&self.hazards),
            EntityKind::Collector => None,
        }
    }

    fn pool_mut(&mut self, kind: EntityKind) -> Option<&mut ObjectPool<Entity>> {
        match kind {
            EntityKind::Collectible => Some(&mut self.collectibles),
            EntityKind::Hazard => Some(&mut self.hazards),
            EntityKind::Collector => None,
        }
    }

    pub fn stats(&self) -> PoolRegistryStats {
        PoolRegistryStats {
            collectible: self.collectibles.stats(),
            hazard: self.hazards.stats(),
        }
    }

    pub fn pool_stats(&self, kind: EntityKind) -> Option<PoolStats> {
        self.pool(kind).map(ObjectPool::stats)
    }

    /// Pools above the health threshold; purely advisory
    pub fn check_pool_health(&self) -> Vec<PoolHealthIssue> {
        [EntityKind::Collectible, EntityKind::Hazard]
            .into_iter()
            .filter_map(|kind| {
                let pool = self.pool(kind)?;
                pool.needs_expansion(self.health_threshold)
                    .then(|| PoolHealthIssue {
                        kind,
                        message: format!("Pool '{}' is at high utilization", pool.name()),
                        stats: pool.stats(),
                    })
            })
            .collect()
    }

    pub fn expand_pool(&mut self, kind: EntityKind, count: usize) {
        match self.pool_mut(kind) {
            Some(pool) => {
                pool.expand(count);
                log::info!("Expanded {} pool by {}", kind, count);
            }
            None => log::warn!("Pool '{}' not found", kind),
        }
    }

    /// Trim each pool's available list to half its total
    pub fn shrink_pools(&mut self) {
        for pool in [&mut self.collectibles, &mut self.hazards] {
            let target = pool.total_created().div_ceil(2);
            pool.shrink(target);
        }
    }

    pub fn clear_all(&mut self) {
        self.collectibles.clear();
        self.hazards.clear();
    }
}
