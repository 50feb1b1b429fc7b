//! The engine: state machine, tick loop, and publishing

use std::sync::mpsc;
use std::sync::Arc;

use palm_bus::{EventBus, Subscription};
use palm_channel::{sender_sink, FramePool, Inference, PerceptionChannel};
use palm_core::{
    Clock, MappedPosition, PipelineConfig, PipelineError, PipelineResult, Timestamp, Vec2,
};
use palm_geom::{map_to_game_space, Dimensions, Interpolator, ViewportGeometry};

use crate::event::{EngineEvent, InputStatus};
use crate::world::{Target, World, WorldConfig};

/// Lifecycle states. Only `Destroyed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Paused,
    Destroyed,
}

/// Engine tunables beyond the shared pipeline config.
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// Capture device resolution.
    pub capture: Dimensions,
    /// Display surface resolution at startup.
    pub display: Dimensions,
    pub pipeline: PipelineConfig,
    pub world: WorldConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            capture: Dimensions::new(640, 480),
            display: Dimensions::new(1280, 720),
            pipeline: PipelineConfig::default(),
            world: WorldConfig::default(),
        }
    }
}

/// Everything a display collaborator needs to draw one tick.
#[derive(Debug)]
pub struct RenderFrame<'a> {
    pub tick_time: Timestamp,
    pub cursor: Option<MappedPosition>,
    pub targets: &'a [Target],
    pub score: u32,
    pub health: u32,
    pub game_over: bool,
}

/// Drawing seam. Primitives are the collaborator's concern; the engine only
/// hands over the mapped cursor and the world snapshot.
pub trait Renderer {
    fn draw(&mut self, frame: &RenderFrame<'_>);
}

/// Tick and input counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub ticks: u64,
    pub samples_drained: u64,
    pub samples_out_of_order: u64,
}

/// The perception-to-action engine.
///
/// Single-threaded by construction: every method takes `&mut self` and runs
/// on the loop thread. The perception worker only ever touches the channel's
/// shared slot and the sample sender.
pub struct Engine<R: Renderer> {
    state: EngineState,
    clock: Clock,
    config: EngineConfig,
    channel: PerceptionChannel,
    pool: Arc<FramePool>,
    samples: mpsc::Receiver<palm_core::PerceptionSample>,
    interpolator: Interpolator,
    viewport: ViewportGeometry,
    world: World,
    bus: Arc<EventBus<EngineEvent>>,
    renderer: R,
    subscriptions: Vec<Subscription<EngineEvent>>,
    last_tick: Option<Timestamp>,
    last_cursor: Option<MappedPosition>,
    published_score: Option<u32>,
    published_health: Option<u32>,
    published_status: Option<InputStatus>,
    game_over_published: bool,
    stats: EngineStats,
}

impl<R: Renderer> Engine<R> {
    /// Build the pipeline: viewport geometry, perception channel, world.
    ///
    /// Fails only on degenerate display or capture dimensions.
    pub fn new<I: Inference>(
        inference: I,
        renderer: R,
        bus: Arc<EventBus<EngineEvent>>,
        config: EngineConfig,
    ) -> PipelineResult<Self> {
        let viewport = ViewportGeometry::compute(config.capture, config.display)?;

        let (tx, rx) = mpsc::channel();
        let pool = FramePool::for_dims(config.capture);
        let channel =
            PerceptionChannel::spawn(inference, sender_sink(tx), Arc::clone(&pool), &config.pipeline);

        Ok(Engine {
            state: EngineState::Idle,
            clock: Clock::new(),
            interpolator: Interpolator::new(&config.pipeline),
            world: World::new(config.world),
            config,
            channel,
            pool,
            samples: rx,
            viewport,
            bus,
            renderer,
            subscriptions: Vec::new(),
            last_tick: None,
            last_cursor: None,
            published_score: None,
            published_health: None,
            published_status: None,
            game_over_published: false,
            stats: EngineStats::default(),
        })
    }

    #[inline]
    pub fn state(&self) -> EngineState {
        self.state
    }

    #[inline]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Frame pool handle for the capture side.
    pub fn frame_pool(&self) -> Arc<FramePool> {
        Arc::clone(&self.pool)
    }

    /// Submit a captured frame to the perception worker. Consumes the frame;
    /// silently a no-op after destroy.
    pub fn submit_frame(&self, frame: palm_channel::Frame) {
        self.channel.submit_frame(frame);
    }

    /// Hand a bus subscription to the engine so destroy releases it.
    pub fn track_subscription(&mut self, subscription: Subscription<EngineEvent>) {
        if self.state == EngineState::Destroyed {
            // Destroyed engines own nothing; the subscription drops here.
            return;
        }
        self.subscriptions.push(subscription);
    }

    pub fn start(&mut self) {
        if self.state == EngineState::Idle {
            self.state = EngineState::Running;
        }
    }

    pub fn pause(&mut self) {
        if self.state == EngineState::Running {
            self.state = EngineState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == EngineState::Paused {
            self.state = EngineState::Running;
        }
    }

    /// Tear the pipeline down. Idempotent: the channel closes, tracked bus
    /// subscriptions drop, and every later call on the engine is a no-op.
    pub fn destroy(&mut self) {
        if self.state == EngineState::Destroyed {
            return;
        }
        tracing::debug!("engine destroyed");
        self.state = EngineState::Destroyed;
        self.channel.close();
        self.subscriptions.clear();
        // Drain anything the worker delivered before the close landed.
        while self.samples.try_recv().is_ok() {}
    }

    /// Recompute viewport geometry for a new display size.
    ///
    /// Degenerate dimensions keep the previous geometry and surface the
    /// error without disturbing the loop.
    pub fn resize(&mut self, width: u32, height: u32) -> PipelineResult<()> {
        if self.state == EngineState::Destroyed {
            return Ok(());
        }
        let display = Dimensions::new(width, height);
        match ViewportGeometry::compute(self.config.capture, display) {
            Ok(viewport) => {
                self.viewport = viewport;
                self.config.display = display;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(width, height, "rejected resize; keeping previous geometry");
                Err(err)
            }
        }
    }

    /// Perception health as of the last tick.
    pub fn input_status(&self) -> PipelineResult<()> {
        self.channel.status()?;
        match self.last_cursor {
            Some(cursor) if cursor.stale => Err(PipelineError::StaleInput),
            _ => Ok(()),
        }
    }

    pub fn viewport(&self) -> &ViewportGeometry {
        &self.viewport
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            samples_out_of_order: self.interpolator.dropped_out_of_order(),
            ..self.stats
        }
    }

    /// Run one tick at the current clock time.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        self.tick_at(now);
    }

    /// Run one tick at an explicit pipeline time.
    ///
    /// The loop driver calls [`tick`](Self::tick); an explicit time makes
    /// the whole pipeline deterministic under test.
    pub fn tick_at(&mut self, now: Timestamp) {
        if self.state != EngineState::Running {
            return;
        }
        self.stats.ticks += 1;

        // Atomic snapshot of everything perception delivered so far; a
        // sample landing after this loop waits for the next tick.
        while let Ok(sample) = self.samples.try_recv() {
            self.stats.samples_drained += 1;
            self.interpolator.push(sample, now);
        }

        let dt = match self.last_tick {
            Some(last) => now.since(last),
            None => self.config.pipeline.tick_interval,
        };
        self.last_tick = Some(now);

        let cursor = self.interpolator.sample_at(now).map(|point| {
            let position = map_to_game_space(point.position, &self.viewport);
            MappedPosition {
                x: position.x,
                y: position.y,
                velocity: self.map_velocity(point.velocity),
                stale: point.stale,
            }
        });
        self.last_cursor = cursor;

        let outcome = self
            .world
            .step(now, dt, cursor.map(|c| Vec2::new(c.x, c.y)));
        if outcome.just_ended {
            tracing::info!(final_score = self.world.score(), "game over");
        }

        let frame = RenderFrame {
            tick_time: now,
            cursor,
            targets: self.world.targets(),
            score: self.world.score(),
            health: self.world.health(),
            game_over: self.world.is_game_over(),
        };
        self.renderer.draw(&frame);

        self.publish_observables(cursor);
    }

    /// Velocity crosses the same affine map as position, minus translation.
    fn map_velocity(&self, velocity: Vec2) -> Vec2 {
        let crop = self.viewport.crop;
        Vec2::new(velocity.x / crop.width, velocity.y / crop.height)
    }

    fn publish_observables(&mut self, cursor: Option<MappedPosition>) {
        if let Some(cursor) = cursor {
            let event = EngineEvent::Cursor(cursor);
            self.bus.publish(event.topic(), event);
        }

        let score = self.world.score();
        if self.published_score != Some(score) {
            self.published_score = Some(score);
            let event = EngineEvent::Score(score);
            self.bus.publish(event.topic(), event);
        }

        let health = self.world.health();
        if self.published_health != Some(health) {
            self.published_health = Some(health);
            let event = EngineEvent::Health(health);
            self.bus.publish(event.topic(), event);
        }

        if self.world.is_game_over() && !self.game_over_published {
            self.game_over_published = true;
            let event = EngineEvent::GameOver {
                final_score: score,
            };
            self.bus.publish(event.topic(), event);
        }

        let status = if self.channel.status() == Err(PipelineError::PerceptionUnavailable) {
            InputStatus::Unavailable
        } else if cursor.is_some_and(|c| c.stale) {
            InputStatus::Stale
        } else {
            InputStatus::Live
        };
        if self.published_status != Some(status) {
            self.published_status = Some(status);
            let event = EngineEvent::InputStatus(status);
            self.bus.publish(event.topic(), event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::topic;
    use palm_channel::{Frame, RawLandmarks};
    use palm_core::PerceptionSample;
    use std::time::{Duration, Instant};

    /// Renderer that records the frames it was asked to draw.
    #[derive(Default)]
    struct RecordingRenderer {
        frames: Vec<(Timestamp, Option<MappedPosition>)>,
    }

    impl Renderer for RecordingRenderer {
        fn draw(&mut self, frame: &RenderFrame<'_>) {
            self.frames.push((frame.tick_time, frame.cursor));
        }
    }

    fn centered_inference() -> impl Inference {
        |_: &Frame| {
            Some(RawLandmarks {
                x: 0.5,
                y: 0.5,
                confidence: 0.9,
            })
        }
    }

    fn test_engine() -> Engine<RecordingRenderer> {
        Engine::new(
            centered_inference(),
            RecordingRenderer::default(),
            Arc::new(EventBus::new()),
            EngineConfig::default(),
        )
        .unwrap()
    }

    fn t(millis: i64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    fn sample(x: f32, y: f32, millis: i64, seq: u64) -> PerceptionSample {
        PerceptionSample::new(
            x,
            y,
            1.0,
            t(millis),
            palm_core::SampleSeq::new(seq),
        )
    }

    /// Engine whose samples are fed directly, bypassing the worker thread.
    fn engine_with_feed() -> (Engine<RecordingRenderer>, mpsc::Sender<PerceptionSample>) {
        let mut engine = test_engine();
        let (tx, rx) = mpsc::channel();
        engine.samples = rx;
        (engine, tx)
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut engine = test_engine();
        assert_eq!(engine.state(), EngineState::Idle);

        engine.start();
        assert_eq!(engine.state(), EngineState::Running);

        engine.pause();
        assert_eq!(engine.state(), EngineState::Paused);

        // start is not a resume
        engine.start();
        assert_eq!(engine.state(), EngineState::Paused);

        engine.resume();
        assert_eq!(engine.state(), EngineState::Running);

        engine.destroy();
        assert_eq!(engine.state(), EngineState::Destroyed);

        // Terminal: nothing revives a destroyed engine.
        engine.start();
        engine.resume();
        assert_eq!(engine.state(), EngineState::Destroyed);
    }

    #[test]
    fn test_tick_maps_samples_to_game_space() {
        let (mut engine, tx) = engine_with_feed();
        engine.start();

        tx.send(sample(0.5, 0.5, 0, 1)).unwrap();
        engine.tick_at(t(5));

        let cursor = engine.renderer.frames[0].1.unwrap();
        // Center of perception space maps to center of game space for any
        // centered crop.
        assert!((cursor.x - 0.5).abs() < 1e-6);
        assert!((cursor.y - 0.5).abs() < 1e-6);
        assert!(!cursor.stale);
    }

    #[test]
    fn test_tick_drains_all_pending_samples() {
        let (mut engine, tx) = engine_with_feed();
        engine.start();

        tx.send(sample(0.1, 0.1, 0, 1)).unwrap();
        tx.send(sample(0.2, 0.2, 33, 2)).unwrap();
        tx.send(sample(0.3, 0.3, 66, 3)).unwrap();
        engine.tick_at(t(66));

        assert_eq!(engine.stats().samples_drained, 3);
        // The newest pair governs the output.
        let cursor = engine.renderer.frames[0].1.unwrap();
        assert!((cursor.y - map_to_game_space(Vec2::new(0.3, 0.3), engine.viewport()).y).abs() < 1e-6);
    }

    #[test]
    fn test_paused_engine_does_not_tick() {
        let (mut engine, tx) = engine_with_feed();
        engine.start();
        engine.pause();

        tx.send(sample(0.5, 0.5, 0, 1)).unwrap();
        engine.tick_at(t(5));

        assert_eq!(engine.stats().ticks, 0);
        assert!(engine.renderer.frames.is_empty());
    }

    #[test]
    fn test_stale_input_reported_and_held() {
        let (mut engine, tx) = engine_with_feed();
        engine.start();

        tx.send(sample(0.4, 0.4, 0, 1)).unwrap();
        engine.tick_at(t(5));
        assert_eq!(engine.input_status(), Ok(()));

        // Past the 500ms stale timeout with no new sample
        engine.tick_at(t(600));
        assert_eq!(engine.input_status(), Err(PipelineError::StaleInput));

        let held = engine.renderer.frames[1].1.unwrap();
        assert!(held.stale);
        assert_eq!(held.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_input_status_published_on_change_only() {
        let bus = Arc::new(EventBus::new());
        let mut engine = Engine::new(
            centered_inference(),
            RecordingRenderer::default(),
            Arc::clone(&bus),
            EngineConfig::default(),
        )
        .unwrap();
        let (tx, rx) = mpsc::channel();
        engine.samples = rx;
        engine.start();

        tx.send(sample(0.5, 0.5, 0, 1)).unwrap();
        engine.tick_at(t(5));
        engine.tick_at(t(20));
        engine.tick_at(t(36));

        // Three live ticks, one status publish.
        let status = bus.latest(topic::INPUT_STATUS).unwrap();
        assert_eq!(status.payload, EngineEvent::InputStatus(InputStatus::Live));
        assert_eq!(status.version, 1);

        engine.tick_at(t(600));
        let status = bus.latest(topic::INPUT_STATUS).unwrap();
        assert_eq!(status.payload, EngineEvent::InputStatus(InputStatus::Stale));
        assert_eq!(status.version, 2);
    }

    #[test]
    fn test_score_and_health_publish_with_change_detection() {
        let bus = Arc::new(EventBus::new());
        let mut engine = Engine::new(
            centered_inference(),
            RecordingRenderer::default(),
            Arc::clone(&bus),
            EngineConfig::default(),
        )
        .unwrap();
        engine.start();

        engine.tick_at(t(5));
        engine.tick_at(t(21));
        engine.tick_at(t(37));

        // Initial values published once, then unchanged.
        assert_eq!(bus.latest(topic::SCORE).unwrap().version, 1);
        assert_eq!(bus.latest(topic::HEALTH).unwrap().version, 1);
        assert_eq!(
            bus.latest(topic::HEALTH).unwrap().payload,
            EngineEvent::Health(WorldConfig::default().starting_health)
        );
    }

    #[test]
    fn test_game_over_published_exactly_once() {
        let bus = Arc::new(EventBus::new());
        let mut config = EngineConfig::default();
        config.world.starting_health = 1;
        config.world.spawn_interval = Duration::from_millis(10);
        config.world.fall_speed = 10.0;
        let mut engine = Engine::new(
            centered_inference(),
            RecordingRenderer::default(),
            Arc::clone(&bus),
            config,
        )
        .unwrap();
        engine.start();

        // Fast-falling targets with no hand in sight: health drains.
        let mut now = 0i64;
        while !engine.world().is_game_over() {
            now += 16;
            engine.tick_at(t(now));
            assert!(now < 10_000, "game over never arrived");
        }
        let over_version = bus.latest(topic::GAME_OVER).unwrap().version;
        assert_eq!(over_version, 1);

        engine.tick_at(t(now + 16));
        engine.tick_at(t(now + 32));
        assert_eq!(bus.latest(topic::GAME_OVER).unwrap().version, 1);
    }

    #[test]
    fn test_resize_rejects_degenerate_dimensions() {
        let mut engine = test_engine();
        let before = *engine.viewport();

        assert_eq!(
            engine.resize(0, 720),
            Err(PipelineError::GeometryInvalid {
                width: 0,
                height: 720
            })
        );
        assert_eq!(*engine.viewport(), before);

        // A valid resize still works afterwards.
        engine.resize(1920, 1080).unwrap();
    }

    #[test]
    fn test_resize_round_trip_restores_geometry() {
        let mut engine = test_engine();
        let original = *engine.viewport();

        // 16:9 -> 4:3 -> 16:9
        engine.resize(800, 600).unwrap();
        assert_ne!(*engine.viewport(), original);

        engine
            .resize(
                EngineConfig::default().display.width,
                EngineConfig::default().display.height,
            )
            .unwrap();
        assert_eq!(*engine.viewport(), original);
    }

    #[test]
    fn test_destroy_is_idempotent_and_releases_everything() {
        let bus = Arc::new(EventBus::new());
        let mut engine = Engine::new(
            centered_inference(),
            RecordingRenderer::default(),
            Arc::clone(&bus),
            EngineConfig::default(),
        )
        .unwrap();
        engine.start();

        let sub = bus.subscribe(topic::SCORE, |_| {});
        engine.track_subscription(sub);
        assert_eq!(bus.subscription_count(), 1);

        engine.destroy();
        engine.destroy();

        assert_eq!(engine.state(), EngineState::Destroyed);
        assert_eq!(bus.subscription_count(), 0);
        assert!(engine.channel.is_closed());

        // Every later call is a silent no-op.
        engine.tick_at(t(1000));
        assert_eq!(engine.stats().ticks, 0);
        assert_eq!(engine.resize(100, 100), Ok(()));
        assert_eq!(engine.input_status(), Err(PipelineError::ChannelClosed));
    }

    #[test]
    fn test_end_to_end_through_worker_thread() {
        let mut engine = test_engine();
        engine.start();

        let pool = engine.frame_pool();
        let clock = engine.clock();
        engine.submit_frame(Frame::new(
            pool.acquire(),
            EngineConfig::default().capture,
            clock.now(),
        ));

        // Tick until the worker's sample has crossed the mpsc boundary.
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            engine.tick();
            if engine.stats().samples_drained > 0 {
                break;
            }
            assert!(Instant::now() < deadline, "sample never arrived");
            std::thread::sleep(Duration::from_millis(5));
        }

        let cursor = engine.renderer.frames.last().unwrap().1.unwrap();
        assert!((cursor.x - 0.5).abs() < 1e-6);

        engine.destroy();
    }
}
