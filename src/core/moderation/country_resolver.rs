// Country resolver - turns a sender id into the country of their phone number.
//
// The gateway's response shape depends on the protocol layer behind it; a
// missing or unusable country field comes back as `Unsupported` rather than
// an error so the caller can report it and keep going.

use super::moderation_models::ResolutionResult;
use super::peer_gateway::{GatewayError, PeerGateway};
use crate::core::policy::CountryCode;
use std::sync::Arc;

pub struct CountryResolver<G: PeerGateway> {
    gateway: Arc<G>,
}

impl<G: PeerGateway> CountryResolver<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Ask the gateway for the sender's phone country. Never cached.
    pub async fn resolve(&self, sender_id: u64) -> Result<ResolutionResult, GatewayError> {
        let settings = self.gateway.peer_settings(sender_id).await?;

        let Some(raw) = settings.phone_country else {
            return Ok(ResolutionResult::Unsupported);
        };

        match CountryCode::parse(&raw) {
            Ok(code) => Ok(ResolutionResult::Resolved(code)),
            Err(_) => {
                tracing::warn!(sender_id, raw = %raw, "Gateway returned an unusable phone country");
                Ok(ResolutionResult::Unsupported)
            }
        }
    }
}
