// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "events/mod.rs"]
pub mod events;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "policy/mod.rs"]
pub mod policy;
