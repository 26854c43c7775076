//! Eco Warriors headless runner
//!
//! Plays one session with a simple autopilot steering the basket, then
//! prints the pool, spawner and difficulty stats.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use eco_warriors::GameConfig;
use eco_warriors::consts::SIM_DT;
use eco_warriors::sim::{
    Clock, EntityKind, FixedClock, GameEvent, GameState, TickInput, WallClock, tick,
};

/// Cap on ticks per frame so a slow frame can't spiral
const MAX_SUBSTEPS: u32 = 8;

/// Simulated seconds between pool health checks
const HEALTH_CHECK_INTERVAL: f32 = 1.0;

/// Fires once per `interval` of simulated time, whatever the frame rate
struct HealthCheck {
    interval: f32,
    next_at: f32,
}

impl HealthCheck {
    fn new(interval: f32) -> Self {
        Self {
            interval,
            next_at: 0.0,
        }
    }

    fn due(&mut self, elapsed: f32) -> bool {
        if elapsed < self.next_at {
            return false;
        }
        while self.next_at <= elapsed {
            self.next_at += self.interval;
        }
        true
    }
}

#[derive(Parser)]
#[command(name = "eco-warriors")]
#[command(about = "Run a headless Eco Warriors session")]
struct Args {
    /// JSON balance config (defaults are used for missing fields)
    #[arg(long)]
    config: Option<PathBuf>,

    /// RNG seed for the spawn scheduler
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Simulated seconds to play
    #[arg(long, default_value_t = 120.0)]
    seconds: f32,

    /// Frame rate of the driving clock
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Pace frames against the wall clock instead of a fixed step
    #[arg(long)]
    realtime: bool,

    /// Print final stats as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => GameConfig::default(),
    };

    let mut state = GameState::new(config, args.seed, 0);
    state.start();

    let frames = (args.seconds * args.fps.max(1) as f32).ceil() as u64;
    log::info!(
        "Eco Warriors starting: seed {}, {} frames at {} fps",
        args.seed,
        frames,
        args.fps
    );

    if args.realtime {
        let mut clock = WallClock::new();
        let frame = std::time::Duration::from_secs_f32(1.0 / args.fps.max(1) as f32);
        run(&mut state, frames, || {
            std::thread::sleep(frame);
            clock.delta()
        });
    } else {
        let mut clock = FixedClock::from_fps(args.fps);
        run(&mut state, frames, || clock.delta());
    }
    state.game_over();

    let stats = state.stats();
    if args.json {
        let json = serde_json::to_string_pretty(&stats).context("failed to serialize stats")?;
        println!("{json}");
    } else {
        println!("=== SESSION ===");
        println!("  Score:       {}", stats.session.score);
        println!("  High score:  {}", stats.session.high_score);
        println!("  Played:      {:.1}s", stats.session.elapsed);
        println!("  Level:       {}/{}", stats.difficulty.level, stats.difficulty.max_level);
        println!("  Spawn rate:  {:.2}s", stats.difficulty.spawn_rate);
        println!("  Fall speed:  {:.2}", stats.difficulty.fall_speed);
        println!("=== SPAWNER ===");
        println!("  Spawned:     {}", stats.spawner.total_spawned);
        println!(
            "  Active:      {} ({} collectibles, {} hazards)",
            stats.spawner.active, stats.spawner.collectibles, stats.spawner.hazards
        );
        println!("  Next in:     {:.2}s", stats.spawner.next_spawn_in);
        println!("=== POOLS ===");
        for (name, pool) in [
            ("collectible", stats.pools.collectible),
            ("hazard", stats.pools.hazard),
        ] {
            println!(
                "  {:<12} {} in use / {} total ({}%)",
                name, pool.in_use, pool.total, pool.utilization_percent
            );
        }
    }

    Ok(())
}

/// Drive `frames` frames, ticking at the fixed sim rate
fn run(state: &mut GameState, frames: u64, mut delta: impl FnMut() -> f32) {
    let mut accumulator = 0.0;
    let mut health = HealthCheck::new(HEALTH_CHECK_INTERVAL);
    for _ in 0..frames {
        accumulator += delta();

        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = autopilot(state);
            tick(state, &input, SIM_DT);
            accumulator -= SIM_DT;
            substeps += 1;
        }

        for event in state.drain_events() {
            match event {
                GameEvent::LevelUp { level } => log::info!("Level {} reached", level),
                GameEvent::NewHighScore { score } => log::debug!("New high score {}", score),
                _ => {}
            }
        }

        // Advisory only: grow a pool that is running hot
        if health.due(state.session.elapsed) {
            for issue in state.pools.check_pool_health() {
                log::warn!("{} ({:?})", issue.message, issue.stats);
                state.pools.expand_pool(issue.kind, 5);
            }
        }
    }
}

/// Steer toward the lowest collectible still above the basket
fn autopilot(state: &GameState) -> TickInput {
    let Some(collector) = state.registry.collector() else {
        return TickInput::default();
    };
    let target = state
        .registry
        .entities_by_kind(EntityKind::Collectible, &state.pools)
        .filter(|e| e.active && e.pos.y > collector.pos.y)
        .min_by(|a, b| a.pos.y.total_cmp(&b.pos.y));

    let steer = match target {
        Some(item) => {
            let dx = item.pos.x - collector.pos.x;
            if dx.abs() < 0.05 { 0.0 } else { dx.signum() }
        }
        None => 0.0,
    };
    TickInput {
        steer,
        ..Default::default()
    }
}
