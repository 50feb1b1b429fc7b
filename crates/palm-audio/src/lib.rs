//! PALM Audio - The playback unlock gate
//!
//! Platforms refuse to start audio output until a real user gesture has
//! occurred. The gate models that policy as a small state machine whose
//! unlock transition demands a [`UserActivation`] token, so code paths with
//! no user gesture in hand cannot even express the attempt.

pub mod gate;

pub use gate::*;
