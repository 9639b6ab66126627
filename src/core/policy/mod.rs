// Core policy module - the country denylist and behavior toggles.
// Following the same layout as the moderation module.

pub mod countries;
pub mod policy_models;
pub mod policy_service;

pub use countries::*;
pub use policy_models::*;
pub use policy_service::*;
