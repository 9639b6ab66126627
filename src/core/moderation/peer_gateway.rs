// Peer gateway - the remote messaging capability the moderation core drives.
//
// NO wire types here. The infra layer owns the transport and maps its
// responses into the domain models.

use super::moderation_models::{GatewayUpdate, PeerSettings, SenderProfile};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Gateway rejected {method}: {description}")]
    Api {
        method: &'static str,
        description: String,
    },

    #[error("Malformed gateway response: {0}")]
    Decode(String),
}

/// Async RPC capability against the messaging account.
#[async_trait]
pub trait PeerGateway: Send + Sync {
    /// Confirm the session is authorized. Returns the account's display name.
    async fn verify_session(&self) -> Result<String, GatewayError>;

    /// Fetch the peer settings for a user, including the phone country if exposed.
    async fn peer_settings(&self, peer_id: u64) -> Result<PeerSettings, GatewayError>;

    /// Block a user. Blocking an already-blocked user succeeds.
    async fn block_user(&self, peer_id: u64) -> Result<(), GatewayError>;

    /// Delete the whole conversation with a user, revoking on both sides.
    async fn delete_history(&self, peer_id: u64) -> Result<(), GatewayError>;

    /// Best-effort profile read. Any failure yields None.
    async fn sender_profile(&self, peer_id: u64) -> Option<SenderProfile>;

    /// Long-poll for updates after `offset`.
    async fn poll_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<GatewayUpdate>, GatewayError>;
}

/// Scriptable gateway shared by the moderation tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum GatewayCall {
        PeerSettings(u64),
        Block(u64),
        Delete(u64),
        Profile(u64),
    }

    #[derive(Default)]
    pub struct ScriptedGateway {
        pub phone_country: Mutex<Option<String>>,
        pub profile: Mutex<Option<SenderProfile>>,
        pub fail_session: Mutex<bool>,
        pub fail_settings: Mutex<bool>,
        pub fail_block: Mutex<bool>,
        pub fail_delete: Mutex<bool>,
        pub updates: Mutex<VecDeque<Vec<GatewayUpdate>>>,
        calls: Mutex<Vec<GatewayCall>>,
    }

    impl ScriptedGateway {
        pub fn with_country(country: Option<&str>) -> Self {
            let gateway = Self::default();
            *gateway.phone_country.lock().unwrap() = country.map(str::to_string);
            gateway
        }

        pub fn calls(&self) -> Vec<GatewayCall> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: GatewayCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl PeerGateway for ScriptedGateway {
        async fn verify_session(&self) -> Result<String, GatewayError> {
            if *self.fail_session.lock().unwrap() {
                return Err(GatewayError::Api {
                    method: "getMe",
                    description: "AUTH_KEY_UNREGISTERED".to_string(),
                });
            }
            Ok("Test Account".to_string())
        }

        async fn peer_settings(&self, peer_id: u64) -> Result<PeerSettings, GatewayError> {
            self.record(GatewayCall::PeerSettings(peer_id));
            if *self.fail_settings.lock().unwrap() {
                return Err(GatewayError::Transport("connection reset".to_string()));
            }
            Ok(PeerSettings {
                phone_country: self.phone_country.lock().unwrap().clone(),
            })
        }

        async fn block_user(&self, peer_id: u64) -> Result<(), GatewayError> {
            self.record(GatewayCall::Block(peer_id));
            if *self.fail_block.lock().unwrap() {
                return Err(GatewayError::Api {
                    method: "blockUser",
                    description: "FLOOD_WAIT_30".to_string(),
                });
            }
            Ok(())
        }

        async fn delete_history(&self, peer_id: u64) -> Result<(), GatewayError> {
            self.record(GatewayCall::Delete(peer_id));
            if *self.fail_delete.lock().unwrap() {
                return Err(GatewayError::Api {
                    method: "deleteHistory",
                    description: "PEER_ID_INVALID".to_string(),
                });
            }
            Ok(())
        }

        async fn sender_profile(&self, peer_id: u64) -> Option<SenderProfile> {
            self.record(GatewayCall::Profile(peer_id));
            self.profile.lock().unwrap().clone()
        }

        async fn poll_updates(
            &self,
            _offset: Option<i64>,
            _timeout: Duration,
        ) -> Result<Vec<GatewayUpdate>, GatewayError> {
            let next = self.updates.lock().unwrap().pop_front();
            match next {
                Some(batch) => Ok(batch),
                None => std::future::pending().await,
            }
        }
    }
}
