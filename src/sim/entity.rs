//! Entity types shared by the pools, the registry and the scheduler

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Bounds;
use super::pool::{PoolHandle, Poolable};
use crate::config::{CollectorConfig, ItemConfig};
use crate::consts::MIN_SPEED;
use crate::fall_velocity;

/// What an entity is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// The player's basket (exactly one per session, never pooled)
    Collector,
    /// Clean water drop, positive score
    Collectible,
    /// Pollutant, negative score
    Hazard,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Collector => "collector",
            EntityKind::Collectible => "collectible",
            EntityKind::Hazard => "hazard",
        }
    }

    /// Whether instances of this kind are recycled through a pool
    pub fn is_pooled(&self) -> bool {
        match self {
            EntityKind::Collector => false,
            EntityKind::Collectible | EntityKind::Hazard => true,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pollutant variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HazardKind {
    #[default]
    Trash,
    Oil,
    Plastic,
}

impl HazardKind {
    pub const ALL: [HazardKind; 3] = [HazardKind::Trash, HazardKind::Oil, HazardKind::Plastic];

    pub fn as_str(&self) -> &'static str {
        match self {
            HazardKind::Trash => "trash",
            HazardKind::Oil => "oil",
            HazardKind::Plastic => "plastic",
        }
    }
}

/// Stable entity identifier
///
/// Pooled entities are named by their pool slot and the slot's generation,
/// so an instance keeps its id across acquire/release cycles and a slot
/// refilled after disposal gets a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    kind: EntityKind,
    slot: u32,
    generation: u32,
}

impl EntityId {
    pub const COLLECTOR: EntityId = EntityId {
        kind: EntityKind::Collector,
        slot: 0,
        generation: 0,
    };

    pub fn pooled(kind: EntityKind, handle: PoolHandle) -> Self {
        Self {
            kind,
            slot: handle.index(),
            generation: handle.generation(),
        }
    }

    #[inline]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Pool handle for pooled kinds, `None` for the collector
    pub fn handle(&self) -> Option<PoolHandle> {
        if self.kind.is_pooled() {
            Some(PoolHandle::new(self.slot, self.generation))
        } else {
            None
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EntityKind::Collector => write!(f, "collector"),
            kind => write!(f, "{}#{}.{}", kind, self.slot, self.generation),
        }
    }
}

/// Construction/reset arguments for a falling entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnParams {
    pub pos: Vec2,
    pub speed: f32,
    /// Ignored for collectibles
    pub hazard: Option<HazardKind>,
}

impl Default for SpawnParams {
    fn default() -> Self {
        Self {
            pos: Vec2::ZERO,
            speed: MIN_SPEED,
            hazard: None,
        }
    }
}

/// A simulated object: the basket or a falling item
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Set only for hazards
    pub hazard: Option<HazardKind>,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Full width/height
    pub size: Vec2,
    /// Participates in advancement, collision and scoring
    pub active: bool,
    /// Signed score applied when caught
    pub points: i32,
    /// Falling below this Y deactivates the entity
    despawn_y: f32,
}

impl Entity {
    /// The player's basket, centered horizontally
    pub fn collector(config: &CollectorConfig) -> Self {
        Self {
            id: EntityId::COLLECTOR,
            kind: EntityKind::Collector,
            hazard: None,
            pos: Vec2::new(0.0, config.start_y),
            vel: Vec2::ZERO,
            size: Vec2::new(config.width, config.height),
            active: true,
            points: 0,
            despawn_y: f32::NEG_INFINITY,
        }
    }

    /// A falling collectible or hazard
    pub fn falling(
        id: EntityId,
        item: &ItemConfig,
        despawn_y: f32,
        params: &SpawnParams,
    ) -> Self {
        let kind = id.kind();
        let hazard = match kind {
            EntityKind::Hazard => Some(params.hazard.unwrap_or_default()),
            EntityKind::Collectible | EntityKind::Collector => None,
        };
        Self {
            id,
            kind,
            hazard,
            pos: params.pos,
            vel: fall_velocity(params.speed),
            size: Vec2::new(item.width, item.height),
            active: true,
            points: item.points,
            despawn_y,
        }
    }

    /// Fall speed (world units/sec), fixed for the current lifetime
    #[inline]
    pub fn speed(&self) -> f32 {
        -self.vel.y
    }

    /// Move by constant velocity; deactivates once below the despawn line
    pub fn advance(&mut self, dt: f32) {
        if !self.active {
            return;
        }
        self.pos += self.vel * dt;
        if self.pos.y < self.despawn_y {
            self.active = false;
        }
    }

    /// Apply input velocity to the collector, clamped inside the world
    pub fn steer(&mut self, velocity_x: f32, dt: f32, half_world_width: f32) {
        self.vel.x = velocity_x;
        self.pos.x += self.vel.x * dt;

        let half = self.size.x / 2.0;
        let left = -half_world_width + half;
        let right = half_world_width - half;
        if self.pos.x < left {
            self.pos.x = left;
            self.vel.x = 0.0;
        } else if self.pos.x > right {
            self.pos.x = right;
            self.vel.x = 0.0;
        }
    }

    /// Axis-aligned collision box
    pub fn bounds(&self) -> Bounds {
        Bounds::from_center(self.pos, self.size)
    }

    /// What the rendering sink needs to draw this entity
    pub fn view(&self) -> EntityView {
        EntityView {
            id: self.id,
            kind: self.kind,
            hazard: self.hazard,
            pos: self.pos,
            visible: self.active,
        }
    }
}

impl Poolable for Entity {
    type Args = SpawnParams;

    fn reset(&mut self, args: &SpawnParams) {
        self.pos = args.pos;
        self.vel = fall_velocity(args.speed);
        if self.kind == EntityKind::Hazard {
            self.hazard = Some(args.hazard.unwrap_or_default());
        }
        self.active = true;
    }

    fn deactivate(&mut self) {
        self.active = false;
    }

    fn dispose(&mut self) {
        self.active = false;
        log::trace!("Disposed {}", self.id);
    }
}

/// Render-facing snapshot of one entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityKind,
    pub hazard: Option<HazardKind>,
    pub pos: Vec2,
    pub visible: bool,
}
