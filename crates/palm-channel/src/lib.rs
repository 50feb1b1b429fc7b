//! PALM Channel - The perception worker boundary
//!
//! Captured frames cross into a worker thread by move (zero-copy, one-shot
//! transfer); perception samples cross back asynchronously through a
//! [`SampleSink`]. A single pending slot bounds latency: when the worker
//! falls behind, the oldest unprocessed frame is dropped, never queued.

pub mod channel;
pub mod frame;

pub use channel::*;
pub use frame::*;
