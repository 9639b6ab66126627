// Core moderation module - contains the country-based DM moderation logic.
// Following the same pattern as the policy module.

pub mod country_resolver;
pub mod dispatcher;
pub mod moderation_models;
pub mod moderation_service;
pub mod peer_gateway;

pub use dispatcher::*;
pub use moderation_models::*;
pub use moderation_service::*;
pub use peer_gateway::*;
