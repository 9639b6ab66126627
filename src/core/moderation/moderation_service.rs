// Moderation service - core business logic for country-based DM moderation.
//
// For every inbound message this service:
// - Drops anything that is not a private chat
// - Resolves the sender's phone country
// - Checks it against the current denylist
// - Reports the threat, then blocks and/or deletes as configured
//
// NO transport dependencies here - just the decision protocol and the order
// of side effects.

use super::country_resolver::CountryResolver;
use super::moderation_models::{
    Decision, IgnoreReason, InboundMessage, ModerationAction, ResolutionResult, SenderProfile,
};
use super::peer_gateway::{GatewayError, PeerGateway};
use crate::core::events::{Counter, EventSink, LogLine};
use crate::core::policy::{PolicyError, PolicyStore, PolicyToggle};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("{0}")]
    Gateway(#[from] GatewayError),

    #[error("Policy store error: {0}")]
    Policy(#[from] PolicyError),
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModerationService<G: PeerGateway, P: PolicyStore, E: EventSink> {
    gateway: Arc<G>,
    resolver: CountryResolver<G>,
    policy: Arc<P>,
    events: Arc<E>,
}

impl<G: PeerGateway, P: PolicyStore, E: EventSink> ModerationService<G, P, E> {
    pub fn new(gateway: Arc<G>, policy: Arc<P>, events: Arc<E>) -> Self {
        Self {
            resolver: CountryResolver::new(Arc::clone(&gateway)),
            gateway,
            policy,
            events,
        }
    }

    /// Outermost handler for one notification.
    ///
    /// Failures stay contained here so the subscription keeps running.
    /// Returns the decision, or None when processing failed.
    pub async fn on_message(&self, message: InboundMessage) -> Option<Decision> {
        match self.decide(&message).await {
            Ok(decision) => Some(decision),
            Err(err) => {
                self.report_failure(message.sender_id, &err).await;
                None
            }
        }
    }

    /// Run the decision protocol for one message.
    pub async fn decide(&self, message: &InboundMessage) -> Result<Decision, ModerationError> {
        if !message.is_private_chat {
            return Ok(Decision::Ignored(IgnoreReason::NotPrivate));
        }

        let sender_id = message.sender_id;
        let country = match self.resolver.resolve(sender_id).await? {
            ResolutionResult::Resolved(code) => code,
            ResolutionResult::Unsupported => {
                tracing::warn!(sender_id, "Peer settings carried no phone country");
                self.events.log(LogLine::degraded(format!(
                    "No phone country in the peer settings for UID {}. \
                     The gateway's protocol layer is likely outdated and needs an update.",
                    sender_id
                )));
                return Ok(Decision::Ignored(IgnoreReason::CountryUnsupported));
            }
        };

        let policy = self.policy.snapshot().await?;
        if !policy.is_denied(&country) {
            return Ok(Decision::Ignored(IgnoreReason::CountryAllowed));
        }

        // Flagged: from here on every enabled action is attempted in order.
        tracing::info!(sender_id, country = %country, "Threat detected");
        self.events.log(LogLine::output(format!(
            "Threat Detected (UID: {}, Country: {})",
            sender_id, country
        )));

        if policy.log_user_info {
            let profile = match &message.sender {
                Some(profile) => Some(profile.clone()),
                None => self.gateway.sender_profile(sender_id).await,
            };
            match profile {
                Some(profile) => self.events.log(LogLine::output(profile_report(&profile))),
                None => tracing::debug!(sender_id, "Sender profile unavailable, skipping"),
            }
        }

        let mut actions = Vec::new();

        if policy.block_user {
            self.gateway.block_user(sender_id).await?;
            self.events.increment(Counter::Blocked);
            if policy.log_on_block {
                self.events
                    .log(LogLine::output(format!("Blocked User (UID: {})", sender_id)));
            }
            actions.push(ModerationAction::Block);
        }

        if policy.delete_chat {
            self.gateway.delete_history(sender_id).await?;
            self.events.increment(Counter::Deleted);
            if policy.log_on_delete {
                self.events
                    .log(LogLine::output(format!("Deleted Chat (UID: {})", sender_id)));
            }
            actions.push(ModerationAction::Delete);
        }

        Ok(Decision::Flagged { country, actions })
    }

    async fn report_failure(&self, sender_id: u64, err: &ModerationError) {
        tracing::error!(sender_id, "Failed to moderate message: {}", err);

        match self.policy.get_toggle(PolicyToggle::LogErrors).await {
            Ok(true) => self.events.log(LogLine::failure(format!(
                "Failed to process message from UID {}: {}",
                sender_id, err
            ))),
            Ok(false) => {}
            Err(e) => tracing::error!("Could not read the log-errors setting: {}", e),
        }
    }
}

fn profile_report(profile: &SenderProfile) -> String {
    format!(
        "User Info\n  Username: {}\n  Nickname: {}\n  Has Premium: {}\n  Has Profile Picture: {}",
        profile.username.as_deref().unwrap_or("(none)"),
        profile.display_name(),
        profile.has_premium,
        profile.has_profile_photo
    )
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::event_sink::testing::{Recorded, RecordingSink};
    use crate::core::events::LogKind;
    use crate::core::moderation::peer_gateway::testing::{GatewayCall, ScriptedGateway};
    use crate::core::policy::{CountryCode, PolicySnapshot};
    use async_trait::async_trait;
    use dashmap::{DashMap, DashSet};
    use std::collections::BTreeSet;

    /// In-memory policy store for testing
    struct MockPolicyStore {
        denylist: DashSet<CountryCode>,
        toggles: DashMap<PolicyToggle, bool>,
    }

    impl MockPolicyStore {
        fn new(denylist: &[&str]) -> Self {
            Self {
                denylist: denylist
                    .iter()
                    .map(|c| CountryCode::parse(c).unwrap())
                    .collect(),
                toggles: DashMap::new(),
            }
        }

        fn with(self, toggle: PolicyToggle, enabled: bool) -> Self {
            self.toggles.insert(toggle, enabled);
            self
        }
    }

    #[async_trait]
    impl PolicyStore for MockPolicyStore {
        async fn snapshot(&self) -> Result<PolicySnapshot, PolicyError> {
            let mut snapshot = PolicySnapshot {
                denylist: self.get_denylist().await?,
                ..Default::default()
            };
            for entry in self.toggles.iter() {
                snapshot.set_toggle(*entry.key(), *entry.value());
            }
            Ok(snapshot)
        }

        async fn get_denylist(&self) -> Result<BTreeSet<CountryCode>, PolicyError> {
            Ok(self.denylist.iter().map(|c| c.clone()).collect())
        }

        async fn add_to_denylist(&self, codes: &[CountryCode]) -> Result<(), PolicyError> {
            for code in codes {
                self.denylist.insert(code.clone());
            }
            Ok(())
        }

        async fn remove_from_denylist(&self, codes: &[CountryCode]) -> Result<(), PolicyError> {
            for code in codes {
                self.denylist.remove(code);
            }
            Ok(())
        }

        async fn get_toggle(&self, toggle: PolicyToggle) -> Result<bool, PolicyError> {
            Ok(self
                .toggles
                .get(&toggle)
                .map(|v| *v)
                .unwrap_or_else(|| toggle.default_value()))
        }

        async fn set_toggle(&self, toggle: PolicyToggle, enabled: bool) -> Result<(), PolicyError> {
            self.toggles.insert(toggle, enabled);
            Ok(())
        }
    }

    type Engine = ModerationService<ScriptedGateway, MockPolicyStore, RecordingSink>;

    fn engine(
        gateway: ScriptedGateway,
        store: MockPolicyStore,
    ) -> (Engine, Arc<ScriptedGateway>, Arc<RecordingSink>) {
        let gateway = Arc::new(gateway);
        let sink = Arc::new(RecordingSink::new());
        let engine = ModerationService::new(Arc::clone(&gateway), Arc::new(store), Arc::clone(&sink));
        (engine, gateway, sink)
    }

    fn private_from(sender_id: u64) -> InboundMessage {
        InboundMessage {
            sender_id,
            is_private_chat: true,
            sender: None,
        }
    }

    fn ivan() -> SenderProfile {
        SenderProfile {
            username: Some("ivan_p".to_string()),
            first_name: "Ivan".to_string(),
            last_name: Some("Petrov".to_string()),
            has_premium: true,
            has_profile_photo: false,
        }
    }

    #[tokio::test]
    async fn test_group_message_is_ignored_silently() {
        let store = MockPolicyStore::new(&["RU"]).with(PolicyToggle::BlockUser, true);
        let (engine, gateway, sink) = engine(ScriptedGateway::with_country(Some("RU")), store);

        let message = InboundMessage {
            is_private_chat: false,
            ..private_from(7)
        };
        let decision = engine.on_message(message).await.unwrap();

        assert_eq!(decision, Decision::Ignored(IgnoreReason::NotPrivate));
        assert!(sink.is_empty());
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_allowed_country_is_silent() {
        let store = MockPolicyStore::new(&["RU"])
            .with(PolicyToggle::BlockUser, true)
            .with(PolicyToggle::DeleteChat, true);
        let (engine, gateway, sink) = engine(ScriptedGateway::with_country(Some("DE")), store);

        let decision = engine.on_message(private_from(7)).await.unwrap();

        assert_eq!(decision, Decision::Ignored(IgnoreReason::CountryAllowed));
        assert!(sink.is_empty());
        assert_eq!(gateway.calls(), vec![GatewayCall::PeerSettings(7)]);
    }

    #[tokio::test]
    async fn test_empty_denylist_is_silent() {
        let store = MockPolicyStore::new(&[]).with(PolicyToggle::BlockUser, true);
        let (engine, _gateway, sink) = engine(ScriptedGateway::with_country(Some("CN")), store);

        engine.on_message(private_from(1)).await.unwrap();

        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_emits_one_degraded_event() {
        let store = MockPolicyStore::new(&["RU"])
            .with(PolicyToggle::BlockUser, true)
            .with(PolicyToggle::DeleteChat, true);
        let (engine, gateway, sink) = engine(ScriptedGateway::with_country(None), store);

        let decision = engine.on_message(private_from(3)).await.unwrap();

        assert_eq!(decision, Decision::Ignored(IgnoreReason::CountryUnsupported));
        assert_eq!(sink.kinds(), vec![LogKind::Degraded]);
        assert_eq!(sink.count(Counter::Blocked), 0);
        assert_eq!(gateway.calls(), vec![GatewayCall::PeerSettings(3)]);
    }

    #[tokio::test]
    async fn test_block_only_scenario() {
        let store = MockPolicyStore::new(&["RU"]).with(PolicyToggle::BlockUser, true);
        let (engine, gateway, sink) = engine(ScriptedGateway::with_country(Some("RU")), store);

        let decision = engine.on_message(private_from(1001)).await.unwrap();

        assert_eq!(
            decision,
            Decision::Flagged {
                country: CountryCode::parse("RU").unwrap(),
                actions: vec![ModerationAction::Block],
            }
        );
        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].message, "Threat Detected (UID: 1001, Country: RU)");
        assert_eq!(lines[1].message, "Blocked User (UID: 1001)");
        assert_eq!(sink.count(Counter::Blocked), 1);
        assert_eq!(sink.count(Counter::Deleted), 0);
        assert!(!gateway.calls().contains(&GatewayCall::Delete(1001)));
    }

    #[tokio::test]
    async fn test_block_precedes_delete() {
        let store = MockPolicyStore::new(&["RU"])
            .with(PolicyToggle::BlockUser, true)
            .with(PolicyToggle::DeleteChat, true);
        let (engine, gateway, sink) = engine(ScriptedGateway::with_country(Some("ru")), store);

        engine.on_message(private_from(5)).await.unwrap();

        assert_eq!(
            gateway.calls(),
            vec![
                GatewayCall::PeerSettings(5),
                GatewayCall::Block(5),
                GatewayCall::Delete(5),
            ]
        );
        let messages: Vec<String> = sink.lines().into_iter().map(|l| l.message).collect();
        assert_eq!(
            messages,
            vec![
                "Threat Detected (UID: 5, Country: RU)",
                "Blocked User (UID: 5)",
                "Deleted Chat (UID: 5)",
            ]
        );

        // Counter increments land right after their action
        let events = sink.events();
        assert!(matches!(events[1], Recorded::Increment(Counter::Blocked)));
        assert!(matches!(events[3], Recorded::Increment(Counter::Deleted)));
    }

    #[tokio::test]
    async fn test_profile_lookup_failure_is_skipped() {
        let store = MockPolicyStore::new(&["CN"])
            .with(PolicyToggle::LogUserInfo, true)
            .with(PolicyToggle::DeleteChat, true);
        let (engine, gateway, sink) = engine(ScriptedGateway::with_country(Some("CN")), store);

        engine.on_message(private_from(8)).await.unwrap();

        let messages: Vec<String> = sink.lines().into_iter().map(|l| l.message).collect();
        assert_eq!(
            messages,
            vec!["Threat Detected (UID: 8, Country: CN)", "Deleted Chat (UID: 8)"]
        );
        assert!(gateway.calls().contains(&GatewayCall::Profile(8)));
    }

    #[tokio::test]
    async fn test_profile_from_notification_is_reported() {
        let store = MockPolicyStore::new(&["CN"]).with(PolicyToggle::LogUserInfo, true);
        let (engine, gateway, sink) = engine(ScriptedGateway::with_country(Some("CN")), store);

        let message = InboundMessage {
            sender: Some(ivan()),
            ..private_from(8)
        };
        engine.on_message(message).await.unwrap();

        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].message.contains("Username: ivan_p"));
        assert!(lines[1].message.contains("Nickname: Ivan Petrov"));
        assert!(lines[1].message.contains("Has Premium: true"));
        assert!(lines[1].message.contains("Has Profile Picture: false"));
        // No extra lookup when the notification already carried the sender
        assert!(!gateway.calls().contains(&GatewayCall::Profile(8)));
    }

    #[tokio::test]
    async fn test_profile_read_from_gateway_when_missing() {
        let store = MockPolicyStore::new(&["CN"]).with(PolicyToggle::LogUserInfo, true);
        let gateway = ScriptedGateway::with_country(Some("CN"));
        *gateway.profile.lock().unwrap() = Some(ivan());
        let (engine, _gateway, sink) = engine(gateway, store);

        engine.on_message(private_from(8)).await.unwrap();

        assert_eq!(sink.lines().len(), 2);
        assert!(sink.lines()[1].message.starts_with("User Info"));
    }

    #[tokio::test]
    async fn test_confirmation_lines_follow_log_toggles() {
        let store = MockPolicyStore::new(&["RU"])
            .with(PolicyToggle::BlockUser, true)
            .with(PolicyToggle::DeleteChat, true)
            .with(PolicyToggle::LogOnBlock, false)
            .with(PolicyToggle::LogOnDelete, false);
        let (engine, _gateway, sink) = engine(ScriptedGateway::with_country(Some("RU")), store);

        engine.on_message(private_from(2)).await.unwrap();

        assert_eq!(sink.lines().len(), 1);
        assert_eq!(sink.count(Counter::Blocked), 1);
        assert_eq!(sink.count(Counter::Deleted), 1);
    }

    #[tokio::test]
    async fn test_block_failure_stops_sequence_and_is_reported() {
        let store = MockPolicyStore::new(&["RU"])
            .with(PolicyToggle::BlockUser, true)
            .with(PolicyToggle::DeleteChat, true)
            .with(PolicyToggle::LogErrors, true);
        let gateway = ScriptedGateway::with_country(Some("RU"));
        *gateway.fail_block.lock().unwrap() = true;
        let (engine, gateway, sink) = engine(gateway, store);

        assert!(engine.on_message(private_from(4)).await.is_none());

        assert_eq!(sink.kinds(), vec![LogKind::Output, LogKind::Failure]);
        assert!(sink.lines()[1].message.contains("FLOOD_WAIT_30"));
        assert_eq!(sink.count(Counter::Blocked), 0);
        assert!(!gateway.calls().contains(&GatewayCall::Delete(4)));
    }

    #[tokio::test]
    async fn test_failure_is_dropped_when_error_logging_disabled() {
        let store = MockPolicyStore::new(&["RU"]).with(PolicyToggle::DeleteChat, true);
        let gateway = ScriptedGateway::with_country(Some("RU"));
        *gateway.fail_delete.lock().unwrap() = true;
        let (engine, _gateway, sink) = engine(gateway, store);

        assert!(engine.on_message(private_from(4)).await.is_none());

        assert_eq!(sink.kinds(), vec![LogKind::Output]);
        assert_eq!(sink.count(Counter::Deleted), 0);
    }

    #[tokio::test]
    async fn test_repeat_sender_is_flagged_every_time() {
        let store = MockPolicyStore::new(&["RU"]).with(PolicyToggle::BlockUser, true);
        let (engine, gateway, sink) = engine(ScriptedGateway::with_country(Some("RU")), store);

        for _ in 0..3 {
            let decision = engine.on_message(private_from(6)).await.unwrap();
            assert!(matches!(decision, Decision::Flagged { .. }));
        }

        assert_eq!(sink.count(Counter::Blocked), 3);
        assert_eq!(
            gateway
                .calls()
                .iter()
                .filter(|c| **c == GatewayCall::Block(6))
                .count(),
            3
        );
    }
}
