//! PALM Core - Fundamental types for the perception-to-control pipeline
//!
//! This crate defines the types shared by every stage of the pipeline:
//! - Time primitives (Timestamp, Clock)
//! - Perception samples and mapped positions
//! - Pipeline configuration
//! - The error taxonomy

pub mod config;
pub mod error;
pub mod sample;
pub mod time;

pub use config::*;
pub use error::*;
pub use sample::*;
pub use time::*;
