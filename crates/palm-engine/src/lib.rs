//! PALM Engine - The consuming half of the pipeline
//!
//! A single-threaded tick loop turns asynchronous perception samples into
//! deterministic game state. Each tick drains every sample that arrived
//! since the previous tick, interpolates, maps into game space, steps the
//! world rules, renders, and publishes changed observables to the bus. The
//! tick never blocks on the perception worker.

pub mod engine;
pub mod event;
pub mod lifecycle;
pub mod world;

pub use engine::*;
pub use event::*;
pub use lifecycle::*;
pub use world::*;
