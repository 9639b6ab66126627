// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "policy/mod.rs"]
pub mod policy;

#[path = "telegram/mod.rs"]
pub mod telegram;
