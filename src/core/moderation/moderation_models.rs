// Moderation domain models - data structures for the DM moderation flow.
//
// These are pure domain types with no gateway dependencies.
// The gateway client converts its wire types into these.

use crate::core::policy::CountryCode;

/// Best-effort public profile of a message sender.
#[derive(Debug, Clone, PartialEq)]
pub struct SenderProfile {
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub has_premium: bool,
    pub has_profile_photo: bool,
}

impl SenderProfile {
    /// First name, plus last name when present, space-joined.
    pub fn display_name(&self) -> String {
        match self.last_name.as_deref().filter(|l| !l.is_empty()) {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// One "new message" notification.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub sender_id: u64,
    /// Whether the message arrived in a 1:1 chat
    pub is_private_chat: bool,
    /// Sender entity if the notification carried one
    pub sender: Option<SenderProfile>,
}

/// Raw peer settings as returned by the gateway.
#[derive(Debug, Clone, Default)]
pub struct PeerSettings {
    /// Missing when the gateway's protocol layer does not expose the field
    pub phone_country: Option<String>,
}

/// Outcome of asking which country a sender's phone is registered in.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionResult {
    Resolved(CountryCode),
    /// The gateway response carried no usable country
    Unsupported,
}

/// Side-effecting action taken against a flagged sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Block,
    Delete,
}

/// Why a message was let through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotPrivate,
    CountryUnsupported,
    CountryAllowed,
}

/// What the engine did with one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Ignored(IgnoreReason),
    Flagged {
        country: CountryCode,
        /// Executed actions, in execution order
        actions: Vec<ModerationAction>,
    },
}

/// A polled update from the gateway's subscription.
#[derive(Debug, Clone)]
pub struct GatewayUpdate {
    pub update_id: i64,
    /// None for update types other than a new message
    pub message: Option<InboundMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(last_name: Option<&str>) -> SenderProfile {
        SenderProfile {
            username: Some("ivan".to_string()),
            first_name: "Ivan".to_string(),
            last_name: last_name.map(str::to_string),
            has_premium: false,
            has_profile_photo: true,
        }
    }

    #[test]
    fn test_display_name_joins_last_name() {
        assert_eq!(profile(Some("Petrov")).display_name(), "Ivan Petrov");
    }

    #[test]
    fn test_display_name_without_last_name() {
        assert_eq!(profile(None).display_name(), "Ivan");
        assert_eq!(profile(Some("")).display_name(), "Ivan");
    }
}
