// Wire types for the MTProto bridge's JSON API, plus their mapping into
// the core moderation models.

use crate::core::moderation::{
    GatewayError, GatewayUpdate, InboundMessage, PeerSettings, SenderProfile,
};
use serde::Deserialize;
use std::fmt::Display;

/// Every response is wrapped like `{ "ok": true, "result": ... }`.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiPeerSettingsResult {
    pub settings: ApiPeerSettings,
}

/// Older bridge builds omit `phone_country` entirely.
#[derive(Debug, Default, Deserialize)]
pub struct ApiPeerSettings {
    #[serde(default)]
    pub phone_country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiUser {
    pub id: u64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub premium: Option<bool>,
    /// Opaque photo object; only its presence matters
    pub photo: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ApiUpdate {
    pub update_id: i64,
    pub new_message: Option<ApiMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub is_private: bool,
    pub sender_id: Option<u64>,
    pub sender: Option<ApiUser>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap an acknowledged call. A missing or null `result` is `None`.
    pub fn into_result(
        self,
        method: &'static str,
        status: impl Display,
    ) -> Result<Option<T>, GatewayError> {
        if !self.ok {
            return Err(GatewayError::Api {
                method,
                description: self
                    .description
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            });
        }
        Ok(self.result)
    }
}

impl From<ApiPeerSettingsResult> for PeerSettings {
    fn from(api: ApiPeerSettingsResult) -> Self {
        PeerSettings {
            phone_country: api.settings.phone_country,
        }
    }
}

impl ApiUser {
    /// A user without a first name is treated as an unavailable profile.
    pub fn into_profile(self) -> Option<SenderProfile> {
        Some(SenderProfile {
            first_name: self.first_name?,
            username: self.username,
            last_name: self.last_name,
            has_premium: self.premium.unwrap_or(false),
            has_profile_photo: self.photo.is_some_and(|p| !p.is_null()),
        })
    }

    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            _ => self
                .username
                .clone()
                .unwrap_or_else(|| self.id.to_string()),
        }
    }
}

impl ApiUpdate {
    pub fn into_update(self) -> GatewayUpdate {
        let message = self.new_message.and_then(|msg| {
            // Outgoing messages and service messages have no sender id
            let sender_id = msg.sender_id.or_else(|| msg.sender.as_ref().map(|s| s.id))?;
            Some(InboundMessage {
                sender_id,
                is_private_chat: msg.is_private,
                sender: msg.sender.and_then(ApiUser::into_profile),
            })
        });

        GatewayUpdate {
            update_id: self.update_id,
            message,
        }
    }
}
