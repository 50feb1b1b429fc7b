//! PALM Geometry - Aspect correction, coordinate mapping, and interpolation
//!
//! The capture device has one aspect ratio (typically 4:3); the display
//! surface has another (commonly 16:9) and can resize at any time. This crate
//! reconciles the two while preserving 1:1 relative horizontal motion, and
//! smooths the ~30Hz perception cadence up to the ~60Hz tick rate by
//! interpolating between the two most recent samples.

pub mod interp;
pub mod mapper;
pub mod viewport;

pub use interp::*;
pub use mapper::*;
pub use viewport::*;
