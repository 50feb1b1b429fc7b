//! Sample interpolation - smoothing a ~30Hz source up to the tick rate
//!
//! The engine holds the last two received samples and blends between them as
//! tick time advances. Extrapolation is never performed: past the current
//! sample the position holds, and past the stale timeout the staleness flag
//! is raised so the engine can report degraded input.

use std::time::Duration;

use palm_core::{PerceptionSample, PipelineConfig, Timestamp, Vec2};

/// The interpolated perception-space position for one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InterpolatedPoint {
    /// Position in perception space, [0, 1] x [0, 1].
    pub position: Vec2,
    /// Velocity estimate in perception-space units per second.
    pub velocity: Vec2,
    /// True while the hold-last-position policy is in effect.
    pub stale: bool,
}

/// Interpolation state: the two most recent samples plus the held output.
///
/// Mutated only on sample arrival ([`push`](Interpolator::push)) and on each
/// tick ([`sample_at`](Interpolator::sample_at)); owned by the engine.
#[derive(Debug)]
pub struct Interpolator {
    stale_timeout: Duration,
    resume_blend: Duration,
    previous: Option<PerceptionSample>,
    current: Option<PerceptionSample>,
    /// Last position handed to the engine; the hold target while stale.
    last_output: Option<Vec2>,
    /// Samples rejected for arriving out of sequence.
    dropped_out_of_order: u64,
}

impl Interpolator {
    pub fn new(config: &PipelineConfig) -> Self {
        Interpolator {
            stale_timeout: config.stale_timeout,
            resume_blend: config.resume_blend,
            previous: None,
            current: None,
            last_output: None,
            dropped_out_of_order: 0,
        }
    }

    /// Accept a new sample at pipeline time `now`.
    ///
    /// Samples are ordered by sequence number, never by arrival time: a
    /// sample whose sequence does not advance past the current one is
    /// dropped. Returns whether the sample was accepted.
    ///
    /// The first sample after a stale window re-times the pair so the blend
    /// resumes from the held position over one `resume_blend` window instead
    /// of jumping.
    pub fn push(&mut self, sample: PerceptionSample, now: Timestamp) -> bool {
        let Some(cur) = self.current else {
            self.current = Some(sample);
            return true;
        };

        if sample.seq <= cur.seq {
            self.dropped_out_of_order += 1;
            return false;
        }

        if now.since(cur.timestamp) > self.stale_timeout || sample.timestamp < cur.timestamp {
            // Resuming after staleness, or a resume blend is still in
            // flight (the current sample was re-timed into the future, so
            // a fresh source timestamp sorts before it). Either way, blend
            // from the last emitted position rather than adopting a pair
            // whose timestamps would invert and snap.
            let held = self.last_output.unwrap_or_else(|| cur.position());
            self.previous = Some(PerceptionSample::new(
                held.x,
                held.y,
                sample.confidence,
                now,
                cur.seq,
            ));
            let mut resumed = sample;
            resumed.timestamp = now + self.resume_blend;
            self.current = Some(resumed);
        } else {
            self.previous = Some(cur);
            self.current = Some(sample);
        }

        true
    }

    /// Interpolated position for the tick at `tick_time`.
    ///
    /// Returns `None` until the first sample has arrived.
    pub fn sample_at(&mut self, tick_time: Timestamp) -> Option<InterpolatedPoint> {
        let cur = self.current?;

        let stale = tick_time.since(cur.timestamp) > self.stale_timeout;
        let point = if stale {
            InterpolatedPoint {
                position: self.last_output.unwrap_or_else(|| cur.position()),
                velocity: Vec2::ZERO,
                stale: true,
            }
        } else if let Some(prev) = self.previous {
            let span = cur.timestamp.since(prev.timestamp);
            let t = if span.is_zero() {
                1.0
            } else {
                tick_time.since(prev.timestamp).as_secs_f32() / span.as_secs_f32()
            };
            let velocity = if span.is_zero() {
                Vec2::ZERO
            } else {
                let secs = span.as_secs_f32();
                Vec2::new((cur.x - prev.x) / secs, (cur.y - prev.y) / secs)
            };
            InterpolatedPoint {
                position: prev.position().lerp(cur.position(), t),
                velocity,
                stale: false,
            }
        } else {
            InterpolatedPoint {
                position: cur.position(),
                velocity: Vec2::ZERO,
                stale: false,
            }
        };

        self.last_output = Some(point.position);
        Some(point)
    }

    /// Count of samples rejected for stale sequence numbers.
    pub fn dropped_out_of_order(&self) -> u64 {
        self.dropped_out_of_order
    }

    /// Sequence number of the newest accepted sample.
    pub fn latest_seq(&self) -> Option<palm_core::SampleSeq> {
        self.current.map(|s| s.seq)
    }

    /// Timestamp of the newest accepted sample.
    pub fn latest_timestamp(&self) -> Option<Timestamp> {
        self.current.map(|s| s.timestamp)
    }
}
