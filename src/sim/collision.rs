//! Axis-aligned collision between the basket and falling items
//!
//! The entity core only exposes bounds and active flags; this is the step
//! that consumes them and turns overlaps into catches.

use glam::Vec2;
use serde::Serialize;

use super::entity::{Entity, EntityId, EntityKind};

/// Axis-aligned bounding box (Y up)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Bounds {
    /// Box of full `size` centered on `center`
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        let half = size / 2.0;
        Self {
            left: center.x - half.x,
            right: center.x + half.x,
            top: center.y + half.y,
            bottom: center.y - half.y,
        }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    /// Overlap test; touching edges count as a hit
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.left <= other.right
            && self.right >= other.left
            && self.bottom <= other.top
            && self.top >= other.bottom
    }
}

/// An item that landed in the basket
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Catch {
    pub id: EntityId,
    pub kind: EntityKind,
    pub points: i32,
}

/// Check one falling item against the basket
///
/// Inactive items and the collector itself never produce a catch.
pub fn check_catch(collector: &Entity, item: &Entity) -> Option<Catch> {
    if !item.active || !collector.active || item.kind == EntityKind::Collector {
        return None;
    }
    collector.bounds().intersects(&item.bounds()).then_some(Catch {
        id: item.id,
        kind: item.kind,
        points: item.points,
    })
}
