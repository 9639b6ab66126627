// Policy domain models - country codes, toggles and the per-decision snapshot.
//
// These are pure domain types with no storage or gateway dependencies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid country code: '{0}'")]
    InvalidCountryCode(String),

    #[error("Unknown setting: '{0}'")]
    UnknownToggle(String),

    #[error("'{0}' is not a selectable country. Type 'countries' for the list.")]
    NotSelectable(String),
}

// ============================================================================
// COUNTRY CODE
// ============================================================================

/// ISO 3166-1 alpha-2 code, always stored upper-case.
///
/// Comparing two codes is therefore case-insensitive with respect to whatever
/// the user or the gateway originally typed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    pub fn parse(raw: &str) -> Result<Self, PolicyError> {
        let trimmed = raw.trim();
        if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PolicyError::InvalidCountryCode(raw.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CountryCode {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CountryCode {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// TOGGLES
// ============================================================================

/// The six boolean settings an operator can flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyToggle {
    DeleteChat,
    BlockUser,
    LogUserInfo,
    LogOnBlock,
    LogOnDelete,
    LogErrors,
}

impl PolicyToggle {
    pub const ALL: [PolicyToggle; 6] = [
        PolicyToggle::DeleteChat,
        PolicyToggle::BlockUser,
        PolicyToggle::LogUserInfo,
        PolicyToggle::LogOnBlock,
        PolicyToggle::LogOnDelete,
        PolicyToggle::LogErrors,
    ];

    /// Human-readable label used in the activity log.
    pub fn label(&self) -> &'static str {
        match self {
            PolicyToggle::DeleteChat => "Delete Chat",
            PolicyToggle::BlockUser => "Block User",
            PolicyToggle::LogUserInfo => "Log User Info",
            PolicyToggle::LogOnBlock => "Log Successful Block",
            PolicyToggle::LogOnDelete => "Log Successful Delete",
            PolicyToggle::LogErrors => "Log Errors",
        }
    }

    /// Short name typed on the settings console.
    pub fn key(&self) -> &'static str {
        match self {
            PolicyToggle::DeleteChat => "delete-chat",
            PolicyToggle::BlockUser => "block-user",
            PolicyToggle::LogUserInfo => "log-user-info",
            PolicyToggle::LogOnBlock => "log-block",
            PolicyToggle::LogOnDelete => "log-delete",
            PolicyToggle::LogErrors => "log-errors",
        }
    }

    pub fn default_value(&self) -> bool {
        matches!(self, PolicyToggle::LogOnBlock | PolicyToggle::LogOnDelete)
    }
}

impl FromStr for PolicyToggle {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        PolicyToggle::ALL
            .into_iter()
            .find(|t| t.key() == wanted)
            .ok_or_else(|| PolicyError::UnknownToggle(s.to_string()))
    }
}

impl fmt::Display for PolicyToggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Policy as read at the start of one moderation decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub denylist: BTreeSet<CountryCode>,
    pub delete_chat: bool,
    pub block_user: bool,
    pub log_user_info: bool,
    pub log_on_block: bool,
    pub log_on_delete: bool,
    pub log_errors: bool,
}

impl Default for PolicySnapshot {
    fn default() -> Self {
        Self {
            denylist: BTreeSet::new(),
            delete_chat: PolicyToggle::DeleteChat.default_value(),
            block_user: PolicyToggle::BlockUser.default_value(),
            log_user_info: PolicyToggle::LogUserInfo.default_value(),
            log_on_block: PolicyToggle::LogOnBlock.default_value(),
            log_on_delete: PolicyToggle::LogOnDelete.default_value(),
            log_errors: PolicyToggle::LogErrors.default_value(),
        }
    }
}

impl PolicySnapshot {
    pub fn is_denied(&self, code: &CountryCode) -> bool {
        self.denylist.contains(code)
    }

    pub fn toggle(&self, toggle: PolicyToggle) -> bool {
        match toggle {
            PolicyToggle::DeleteChat => self.delete_chat,
            PolicyToggle::BlockUser => self.block_user,
            PolicyToggle::LogUserInfo => self.log_user_info,
            PolicyToggle::LogOnBlock => self.log_on_block,
            PolicyToggle::LogOnDelete => self.log_on_delete,
            PolicyToggle::LogErrors => self.log_errors,
        }
    }

    pub fn set_toggle(&mut self, toggle: PolicyToggle, enabled: bool) {
        let slot = match toggle {
            PolicyToggle::DeleteChat => &mut self.delete_chat,
            PolicyToggle::BlockUser => &mut self.block_user,
            PolicyToggle::LogUserInfo => &mut self.log_user_info,
            PolicyToggle::LogOnBlock => &mut self.log_on_block,
            PolicyToggle::LogOnDelete => &mut self.log_on_delete,
            PolicyToggle::LogErrors => &mut self.log_errors,
        };
        *slot = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_code_normalizes_case_and_whitespace() {
        let code = CountryCode::parse(" ru ").unwrap();
        assert_eq!(code.as_str(), "RU");
        assert_eq!(code, CountryCode::parse("Ru").unwrap());
    }

    #[test]
    fn test_country_code_rejects_garbage() {
        for raw in ["", "R", "RUS", "1A", "é1"] {
            assert!(
                matches!(
                    CountryCode::parse(raw),
                    Err(PolicyError::InvalidCountryCode(_))
                ),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_country_code_serde_uses_plain_string() {
        let codes: Vec<CountryCode> = serde_json::from_str(r#"["cn","US"]"#).unwrap();
        assert_eq!(codes[0].as_str(), "CN");
        assert_eq!(serde_json::to_string(&codes).unwrap(), r#"["CN","US"]"#);
        assert!(serde_json::from_str::<Vec<CountryCode>>(r#"["XYZ"]"#).is_err());
    }

    #[test]
    fn test_snapshot_defaults() {
        let snapshot = PolicySnapshot::default();
        assert!(snapshot.denylist.is_empty());
        assert!(!snapshot.delete_chat);
        assert!(!snapshot.block_user);
        assert!(!snapshot.log_user_info);
        assert!(snapshot.log_on_block);
        assert!(snapshot.log_on_delete);
        assert!(!snapshot.log_errors);
    }

    #[test]
    fn test_toggle_keys_round_trip() {
        for toggle in PolicyToggle::ALL {
            assert_eq!(toggle.key().parse::<PolicyToggle>().unwrap(), toggle);
        }
        assert!("log-everything".parse::<PolicyToggle>().is_err());
    }

    #[test]
    fn test_snapshot_set_toggle() {
        let mut snapshot = PolicySnapshot::default();
        snapshot.set_toggle(PolicyToggle::BlockUser, true);
        snapshot.set_toggle(PolicyToggle::LogOnDelete, false);
        assert!(snapshot.toggle(PolicyToggle::BlockUser));
        assert!(!snapshot.toggle(PolicyToggle::LogOnDelete));
    }
}
