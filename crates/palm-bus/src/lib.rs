//! PALM Bus - Latest-value publish/subscribe
//!
//! Decouples high-frequency engine state from UI observers. Each topic
//! stores only its most recent payload with a monotonic version; delivery is
//! latest-value, not a queue. Subscribers may also ignore notifications
//! entirely and pull [`EventBus::latest`] on their own render cycle.

pub mod bus;
pub mod topic;

pub use bus::*;
pub use topic::*;
