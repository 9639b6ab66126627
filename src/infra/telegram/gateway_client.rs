use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;

use super::api_models::{ApiEnvelope, ApiPeerSettingsResult, ApiUpdate, ApiUser};
use crate::core::moderation::{
    GatewayError, GatewayUpdate, PeerGateway, PeerSettings, SenderProfile,
};

/// Extra headroom on top of the long-poll timeout before reqwest gives up.
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the MTProto bridge, e.g. `http://127.0.0.1:8081`
    pub base_url: String,
    /// Bearer token of the authorized session
    pub token: String,
    pub poll_timeout: Duration,
}

/// JSON client for an MTProto bridge that holds the user session.
/// It exposes only the calls the moderation core needs.
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "User-Agent",
            HeaderValue::from_static(concat!("country_guard/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", config.token))
                .map_err(|e| GatewayError::Transport(e.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.poll_timeout + REQUEST_TIMEOUT_MARGIN)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// POST one method. `Ok(None)` when the bridge acknowledged without a result.
    async fn call_optional<T: DeserializeOwned>(
        &self,
        method: &'static str,
        payload: Value,
    ) -> Result<Option<T>, GatewayError> {
        let url = format!("{}/{}", self.base_url, method);

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let envelope: ApiEnvelope<T> = response.json().await.map_err(|e| {
            GatewayError::Decode(format!("{} returned HTTP {}: {}", method, status, e))
        })?;

        envelope.into_result(method, status)
    }

    /// POST one method whose result is required.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        payload: Value,
    ) -> Result<T, GatewayError> {
        self.call_optional(method, payload)
            .await?
            .ok_or_else(|| GatewayError::Decode(format!("{} returned no result", method)))
    }
}

#[async_trait]
impl PeerGateway for GatewayClient {
    async fn verify_session(&self) -> Result<String, GatewayError> {
        let me: ApiUser = self.call("getMe", json!({})).await?;
        Ok(me.display_name())
    }

    async fn peer_settings(&self, peer_id: u64) -> Result<PeerSettings, GatewayError> {
        let result: ApiPeerSettingsResult = self
            .call("getPeerSettings", json!({ "peer_id": peer_id }))
            .await?;
        Ok(result.into())
    }

    async fn block_user(&self, peer_id: u64) -> Result<(), GatewayError> {
        let _: Option<Value> = self
            .call_optional("blockUser", json!({ "user_id": peer_id }))
            .await?;
        Ok(())
    }

    async fn delete_history(&self, peer_id: u64) -> Result<(), GatewayError> {
        let _: Option<Value> = self
            .call_optional(
                "deleteHistory",
                json!({ "peer_id": peer_id, "max_id": 0, "revoke": true }),
            )
            .await?;
        Ok(())
    }

    async fn sender_profile(&self, peer_id: u64) -> Option<SenderProfile> {
        match self
            .call::<ApiUser>("getUser", json!({ "user_id": peer_id }))
            .await
        {
            Ok(user) => user.into_profile(),
            Err(e) => {
                tracing::debug!(peer_id, "Profile lookup failed: {}", e);
                None
            }
        }
    }

    async fn poll_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<GatewayUpdate>, GatewayError> {
        let updates: Vec<ApiUpdate> = self
            .call(
                "getUpdates",
                json!({
                    "offset": offset,
                    "timeout": timeout.as_secs(),
                    "allowed_updates": ["new_message"],
                }),
            )
            .await?;

        Ok(updates.into_iter().map(ApiUpdate::into_update).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str, token: &str) -> GatewayConfig {
        GatewayConfig {
            base_url: base_url.to_string(),
            token: token.to_string(),
            poll_timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = GatewayClient::new(&config("http://127.0.0.1:8081/", "abc")).unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:8081");
    }

    #[test]
    fn test_token_with_newline_is_rejected() {
        assert!(matches!(
            GatewayClient::new(&config("http://localhost", "bad\ntoken")),
            Err(GatewayError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to speak HTTP
        let client = GatewayClient::new(&config("http://127.0.0.1:9", "abc")).unwrap();
        assert!(matches!(
            client.peer_settings(1).await,
            Err(GatewayError::Transport(_))
        ));
        assert!(client.sender_profile(1).await.is_none());
    }
}
