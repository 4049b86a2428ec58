//! Arena Replay demo
//!
//! Runs a scripted session, records it, checks that parallel and
//! sequential physics agree, then plays the recording back.

use std::env;
use std::fs;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use arena_replay::{
    FIRE_KEY, TICK_DT, TICK_RATE, VERSION,
    core::{Clock, ManualClock, Vec2},
    replay::{FileRecordingStorage, ObjectClass, RecordStatus, RecordingService, ReplayTimeline},
    sim::{
        events::SimEventData,
        physics::PhysicsIntegrator,
        PlayerIntent, SimConfig, Simulation, TickContext,
    },
};

/// Ticks to simulate (20 seconds)
const DEMO_TICKS: u64 = 1200;

/// Seed shared by both runs
const DEMO_SEED: u64 = 12345;

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    info!("Arena Replay v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let config = load_config()?;
    let recording = demo_session(&config)?;
    verify_dispatch(&config);
    demo_replay(&recording);

    Ok(())
}

/// Config from the JSON file named by `ARENA_REPLAY_CONFIG`, else defaults.
fn load_config() -> anyhow::Result<SimConfig> {
    let Ok(path) = env::var("ARENA_REPLAY_CONFIG") else {
        return Ok(SimConfig::default());
    };
    let json = fs::read_to_string(&path).with_context(|| format!("reading config {}", path))?;
    let config = SimConfig::from_json_str(&json).with_context(|| format!("parsing config {}", path))?;
    info!("Loaded config from {}", path);
    Ok(config)
}

/// Scripted input: circle around, fire twice a second.
fn scripted_intent(tick: u64) -> PlayerIntent {
    let angle = tick as f32 * 0.02;
    PlayerIntent {
        movement: if (tick / 120) % 3 == 2 { Vec2::ZERO } else { Vec2::from_angle(angle) },
        fire: tick % 30 == 0,
    }
}

fn clock_ms(tick: u64) -> u64 {
    tick * 1000 / TICK_RATE as u64
}

/// Run and record the scripted session. Returns the recording path.
fn demo_session(config: &SimConfig) -> anyhow::Result<std::path::PathBuf> {
    info!("=== Recording Session ===");

    let clock = ManualClock::new(0);
    let mut recorder = RecordingService::new(FileRecordingStorage::default(), &clock);
    recorder
        .start("demo", config.bounds.width as u32, config.bounds.height as u32)
        .context("starting recording")?;

    let mut sim = Simulation::new(config.clone(), DEMO_SEED);
    sim.integrator_mut().set_profiling(true);

    let mut kills = 0usize;
    let mut resets = 0usize;
    for t in 0..DEMO_TICKS {
        clock.set(clock_ms(t));

        let intent = scripted_intent(t);
        if intent.fire {
            recorder.record_input(FIRE_KEY);
        }

        let result = sim.tick(&TickContext { dt: TICK_DT, intent });
        for event in &result.events {
            match event.data {
                SimEventData::EnemyDestroyed { .. } => kills += 1,
                SimEventData::PlayerReset { .. } => resets += 1,
                _ => {}
            }
        }

        if recorder.record_keyframe(sim.world()) == RecordStatus::Failed {
            warn!("Recording stopped at tick {}; simulation continues", t);
        }

        if t % 300 == 0 {
            info!("Tick {}: {} entities, {} kills, {} resets", t, sim.world().len(), kills, resets);
        }
    }

    if recorder.stop() == RecordStatus::Failed {
        warn!("Recording ended without an end marker");
    }
    let path = recorder
        .storage()
        .path()
        .map(|p| p.to_path_buf())
        .context("recording has no path")?;

    let profile = *sim.integrator().profile();
    match profile.average_ms() {
        Some(ms) => info!("Physics: {:.4} ms/tick over {} ticks", ms, profile.ticks()),
        None => info!("Physics: no samples"),
    }
    info!("Final State Hash: {}", hex::encode(sim.compute_hash()));
    info!("Worker shutdown: {:?}", sim.shutdown());
    info!("Recorded {} lines to {}", recorder.lines_written(), path.display());

    Ok(path)
}

/// Replay the same session with sequential physics and compare hashes.
fn verify_dispatch(config: &SimConfig) {
    info!("=== Verifying Dispatch Equivalence ===");

    let mut pooled = Simulation::new(config.clone(), DEMO_SEED);
    let mut sequential = Simulation::populated(config.clone(), DEMO_SEED, PhysicsIntegrator::sequential());

    for t in 0..DEMO_TICKS {
        let ctx = TickContext { dt: TICK_DT, intent: scripted_intent(t) };
        pooled.tick(&ctx);
        sequential.tick(&ctx);
    }

    let (a, b) = (pooled.compute_hash(), sequential.compute_hash());
    info!("Pooled Hash:     {}", hex::encode(a));
    info!("Sequential Hash: {}", hex::encode(b));
    if a == b {
        info!("DISPATCH VERIFIED: Hashes match!");
    } else {
        warn!("DISPATCH MISMATCH: Hashes differ!");
    }
    pooled.shutdown();
}

/// Play the recording back at 60 Hz for one full loop.
fn demo_replay(path: &std::path::Path) {
    info!("=== Replaying {} ===", path.display());

    let mut timeline = ReplayTimeline::load_path(path);
    if timeline.is_idle() {
        warn!("Nothing to replay");
        return;
    }
    if let Some(viewport) = timeline.viewport() {
        info!("Viewport {}x{}", viewport.width, viewport.height);
    }

    let clock = ManualClock::new(0);
    timeline.start(clock.now_ms());

    let mut frame = 0u64;
    while timeline.loops() == 0 {
        frame += 1;
        clock.set(clock_ms(frame));
        timeline.update(clock.now_ms());

        if frame % 300 == 0 {
            let drawn = timeline.visible().count();
            info!("Replay {} ms: frame {}, {} objects drawn", clock.now_ms(), timeline.current_index(), drawn);
        }
    }

    let pooled: Vec<String> = ObjectClass::ALL
        .iter()
        .map(|class| format!("{:?}={}", class, timeline.pooled(*class)))
        .collect();
    info!(
        "Replay looped after {} frames: {} constructed, pooled [{}]",
        frame,
        timeline.constructed(),
        pooled.join(", ")
    );
}
