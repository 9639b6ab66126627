pub mod api_models;
pub mod gateway_client;

pub use gateway_client::{GatewayClient, GatewayConfig};
