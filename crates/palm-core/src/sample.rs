//! Perception samples and derived positions
//!
//! A [`PerceptionSample`] is what the perception worker emits at its own
//! cadence (camera-bound, roughly 30Hz). A [`MappedPosition`] is what the
//! engine derives from the two most recent samples every render tick.

use std::fmt;

use crate::Timestamp;

/// Monotonic per-channel sample sequence number.
///
/// Consumers order and drop samples by sequence, never by arrival time.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SampleSeq(pub u64);

impl SampleSeq {
    pub const ZERO: SampleSeq = SampleSeq(0);

    #[inline]
    pub fn new(seq: u64) -> Self {
        SampleSeq(seq)
    }

    #[inline]
    pub fn next(self) -> Self {
        SampleSeq(self.0 + 1)
    }
}

impl fmt::Debug for SampleSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq#{}", self.0)
    }
}

/// A 2D vector in normalized coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    /// Linear blend toward `other`, `t` clamped to [0, 1].
    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        let t = t.clamp(0.0, 1.0);
        Vec2 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    #[inline]
    pub fn distance(self, other: Vec2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A raw hand-position sample in perception space.
///
/// `x` and `y` are normalized to [0, 1] in the capture device's own aspect;
/// coordinate-space reconciliation happens later, in the mapper.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerceptionSample {
    /// Horizontal position, [0, 1] in perception space.
    pub x: f32,
    /// Vertical position, [0, 1] in perception space.
    pub y: f32,
    /// Inference confidence, [0, 1].
    pub confidence: f32,
    /// Capture timestamp of the frame this sample was inferred from.
    pub timestamp: Timestamp,
    /// Monotonic sequence number assigned by the channel.
    pub seq: SampleSeq,
}

impl PerceptionSample {
    pub fn new(x: f32, y: f32, confidence: f32, timestamp: Timestamp, seq: SampleSeq) -> Self {
        PerceptionSample {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
            timestamp,
            seq,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// The engine-side view of the hand for one tick.
///
/// Derived, never persisted; owned by the engine for the duration of a tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MappedPosition {
    /// Horizontal position, [0, 1] in game space.
    pub x: f32,
    /// Vertical position, [0, 1] in game space.
    pub y: f32,
    /// Velocity estimate in game-space units per second.
    pub velocity: Vec2,
    /// True while the hold-last-position policy is in effect.
    pub stale: bool,
}

impl MappedPosition {
    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}
