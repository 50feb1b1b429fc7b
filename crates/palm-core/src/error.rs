//! Error types for the pipeline
//!
//! Perception and audio failures never propagate as fatal errors into the
//! render loop; they surface as status values the engine degrades around.
//! Operations on destroyed handles are silent no-ops rather than errors.

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    // Perception errors
    #[error("perception worker lost; channel rejects frames until restarted")]
    PerceptionUnavailable,

    #[error("no perception sample within the stale timeout")]
    StaleInput,

    #[error("channel closed")]
    ChannelClosed,

    // Geometry errors
    #[error("degenerate display dimensions: {width}x{height}")]
    GeometryInvalid { width: u32, height: u32 },

    // Audio errors
    #[error("audio context resume rejected; gate stays unlocking")]
    AudioUnlockFailed,
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
