// Core events module - what the moderation and settings logic reports outward.
// Any frontend (terminal panel, file logger, test harness) consumes these.

pub mod event_models;
pub mod event_sink;

pub use event_models::*;
pub use event_sink::*;
