//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time comes in only through `tick`'s `dt`
//! - Seeded RNG only
//! - Stable iteration order (by entity id)
//! - No rendering or platform dependencies

pub mod clock;
pub mod collision;
pub mod difficulty;
pub mod entity;
pub mod pool;
pub mod pools;
pub mod registry;
pub mod spawner;
pub mod state;
pub mod tick;

pub use clock::{Clock, FixedClock, WallClock};
pub use collision::{Bounds, Catch, check_catch};
pub use difficulty::{DifficultyEngine, DifficultyStats};
pub use entity::{Entity, EntityId, EntityKind, EntityView, HazardKind, SpawnParams};
pub use pool::{ObjectPool, PoolHandle, PoolStats, Poolable};
pub use pools::{PoolHealthIssue, PoolRegistry, PoolRegistryStats};
pub use registry::{Driver, EntityRegistry};
pub use spawner::{SpawnScheduler, SpawnerStats};
pub use state::{GameEvent, GamePhase, GameState, GameStats, Session};
pub use tick::{TickInput, tick};
