//! End-to-end pipeline demo with a synthetic capture source.
//!
//! A fake perception oracle sweeps a "hand" through perception space, frames
//! flow through the worker channel, and the engine ticks at ~60Hz until the
//! game ends. Observables print through the bus subscription and a console
//! renderer.

use std::f32::consts::TAU;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use palm_audio::{AudioGate, UserActivation};
use palm_bus::EventBus;
use palm_channel::{Frame, RawLandmarks};
use palm_core::PipelineResult;
use palm_engine::{
    topic, Engine, EngineConfig, EngineEvent, RenderFrame, Renderer, ScopedEngine,
};

const CAPTURE_INTERVAL: Duration = Duration::from_millis(33);
const DEMO_LIMIT: Duration = Duration::from_secs(30);

/// Logs a snapshot once a second instead of drawing pixels.
struct ConsoleRenderer {
    ticks: u64,
}

impl Renderer for ConsoleRenderer {
    fn draw(&mut self, frame: &RenderFrame<'_>) {
        self.ticks += 1;
        if self.ticks % 60 != 0 {
            return;
        }
        if let Some(cursor) = frame.cursor {
            tracing::info!(
                x = cursor.x,
                y = cursor.y,
                stale = cursor.stale,
                score = frame.score,
                health = frame.health,
                targets = frame.targets.len(),
                "snapshot"
            );
        }
    }
}

/// Synthetic hand motion derived from the capture timestamp.
fn sweeping_hand(frame: &Frame) -> Option<RawLandmarks> {
    let t = frame.captured_at().as_secs_f32();
    Some(RawLandmarks {
        x: 0.5 + 0.45 * (t * 0.4 * TAU).sin(),
        y: 0.55 + 0.25 * (t * 0.17 * TAU).cos(),
        confidence: 0.9,
    })
}

fn main() -> PipelineResult<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let bus = Arc::new(EventBus::new());
    let game_over_sub = bus.subscribe(topic::GAME_OVER, |published| {
        if let EngineEvent::GameOver { final_score } = published.payload {
            tracing::info!(final_score, "game over");
        }
    });

    let engine = Engine::new(
        sweeping_hand,
        ConsoleRenderer { ticks: 0 },
        Arc::clone(&bus),
        EngineConfig::default(),
    )?;
    let mut engine = ScopedEngine::new(engine);
    engine.track_subscription(game_over_sub);

    // The user gesture that would come from a click handler.
    let mut gate = AudioGate::new();
    gate.begin_unlock(UserActivation::from_user_event());
    gate.confirm_resumed();
    tracing::info!(playback = gate.playback_allowed(), "audio unlocked");

    engine.start();

    let pool = engine.frame_pool();
    let clock = engine.clock();
    let capture_dims = EngineConfig::default().capture;
    let tick_interval = EngineConfig::default().pipeline.tick_interval;

    // Capture at ~30Hz and tick at ~60Hz on one thread; the perception
    // worker runs on its own.
    let mut next_capture = clock.now();
    loop {
        let now = clock.now();
        if now >= next_capture {
            engine.submit_frame(Frame::new(pool.acquire(), capture_dims, now));
            next_capture = next_capture + CAPTURE_INTERVAL;
        }

        engine.tick();

        if engine.world().is_game_over() {
            break;
        }
        if now.since(palm_core::Timestamp::ZERO) > DEMO_LIMIT {
            tracing::info!("time limit reached");
            break;
        }
        thread::sleep(tick_interval);
    }

    if let Some(score) = bus.latest(topic::SCORE) {
        tracing::info!(
            score = ?score.payload,
            version = score.version,
            "final score observable"
        );
    }
    let stats = engine.stats();
    tracing::info!(?stats, "engine counters");

    engine.teardown();
    Ok(())
}
