//! Per-frame simulation step
//!
//! Order within one frame:
//! 1. phase gate (only `Playing` advances)
//! 2. collector steering from input
//! 3. difficulty refresh from the current score
//! 4. spawn throttle from the registry's soft limit
//! 5. scheduler update, mirrored into the registry
//! 6. registry bulk update
//! 7. catches and scoring

use super::collision::{Catch, check_catch};
use super::state::{GameEvent, GamePhase, GameState};

/// Input commands for a single tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Horizontal steering in [-1, 1], scaled by the collector speed
    pub steer: f32,
    /// Pause toggle
    pub pause: bool,
}

/// Advance the game state by `dt` seconds
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.pause();
                return;
            }
            GamePhase::Paused => state.resume(),
            GamePhase::Menu | GamePhase::GameOver => {}
        }
    }

    if state.phase != GamePhase::Playing {
        return;
    }
    state.session.elapsed += dt;

    let half_width = state.half_world_width();
    let speed = state.config.collector.speed;
    if let Some(collector) = state.registry.collector_mut() {
        collector.steer(input.steer.clamp(-1.0, 1.0) * speed, dt, half_width);
    }

    if state.difficulty.update(state.session.score) {
        state.events.push(GameEvent::LevelUp {
            level: state.difficulty.level(),
        });
    }

    state
        .spawner
        .set_throttled(state.registry.is_entity_limit_reached());

    let first_new = state.events.len();
    state
        .spawner
        .update(dt, &state.difficulty, &mut state.pools, &mut state.events);
    for event in &state.events[first_new..] {
        match *event {
            GameEvent::Spawned { id, .. } => {
                state.registry.track_spawned(id, &state.pools);
            }
            GameEvent::Retired { id, .. } => {
                state.registry.forget(id);
            }
            _ => {}
        }
    }

    let retired = state.registry.update_all(dt, &mut state.pools);
    state.events.extend(
        retired
            .iter()
            .map(|&id| GameEvent::Retired { id, kind: id.kind() }),
    );

    resolve_catches(state);
}

/// Score and deactivate every item overlapping the collector
///
/// Caught items retire on their driver's next pass.
fn resolve_catches(state: &mut GameState) {
    let Some(collector) = state.registry.collector() else {
        return;
    };
    let catches: Vec<Catch> = state
        .registry
        .active_entities(&state.pools)
        .filter_map(|item| check_catch(collector, item))
        .collect();

    for catch in catches {
        if let Some(item) = state.pools.get_mut(catch.id) {
            item.active = false;
        }
        state.events.push(GameEvent::Caught {
            id: catch.id,
            kind: catch.kind,
            points: catch.points,
        });
        if state.session.add_score(catch.points) {
            state.events.push(GameEvent::NewHighScore {
                score: state.session.high_score,
            });
        }
        log::debug!(
            "Caught {} ({:+}), score {}",
            catch.id,
            catch.points,
            state.session.score
        );
    }
}
