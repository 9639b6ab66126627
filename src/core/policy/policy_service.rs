// Policy service - the settings-editing surface.
//
// This service handles:
// - Per-code denylist toggles
// - Bulk "block everything but home" / "unblock everything"
// - Behavior toggle changes
//
// Every successful edit is reported to the activity log. Storage lives behind
// the PolicyStore trait so the moderation engine and this service share one
// source of truth without any global state.

use super::countries::CountryCatalog;
use super::policy_models::{CountryCode, PolicyError, PolicySnapshot, PolicyToggle};
use crate::core::events::{EventSink, LogLine};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting the denylist and toggles.
///
/// Adding a code that is already present, or removing one that is absent,
/// must be a silent no-op.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Read every field at once for a single decision.
    async fn snapshot(&self) -> Result<PolicySnapshot, PolicyError>;

    /// Current denylist.
    async fn get_denylist(&self) -> Result<BTreeSet<CountryCode>, PolicyError>;

    /// Add codes to the denylist.
    async fn add_to_denylist(&self, codes: &[CountryCode]) -> Result<(), PolicyError>;

    /// Remove codes from the denylist.
    async fn remove_from_denylist(&self, codes: &[CountryCode]) -> Result<(), PolicyError>;

    /// Read one toggle.
    async fn get_toggle(&self, toggle: PolicyToggle) -> Result<bool, PolicyError>;

    /// Write one toggle.
    async fn set_toggle(&self, toggle: PolicyToggle, enabled: bool) -> Result<(), PolicyError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct PolicyService<S: PolicyStore, E: EventSink> {
    store: Arc<S>,
    events: Arc<E>,
    catalog: CountryCatalog,
}

impl<S: PolicyStore, E: EventSink> PolicyService<S, E> {
    pub fn new(store: Arc<S>, events: Arc<E>, catalog: CountryCatalog) -> Self {
        Self {
            store,
            events,
            catalog,
        }
    }

    pub fn catalog(&self) -> &CountryCatalog {
        &self.catalog
    }

    pub async fn snapshot(&self) -> Result<PolicySnapshot, PolicyError> {
        self.store.snapshot().await
    }

    /// Add or remove a single code, logging the direction.
    ///
    /// Only catalog codes can be added, so `unblock_all` always clears what
    /// this puts in. Removing any code is allowed.
    pub async fn toggle_country(
        &self,
        code: CountryCode,
        enabled: bool,
    ) -> Result<(), PolicyError> {
        let batch = std::slice::from_ref(&code);
        if enabled {
            if !self.catalog.contains(&code) {
                return Err(PolicyError::NotSelectable(code.to_string()));
            }

            self.store.add_to_denylist(batch).await?;
            self.events.log(LogLine::region(format!(
                "Added '{}' to Blocked Countries",
                code
            )));
        } else {
            self.store.remove_from_denylist(batch).await?;
            self.events.log(LogLine::region(format!(
                "Removed '{}' from Blocked Countries",
                code
            )));
        }
        tracing::info!(country = %code, enabled, "Denylist entry toggled");
        Ok(())
    }

    /// Deny every selectable code except the home country.
    ///
    /// Returns how many codes were newly added to the denylist.
    pub async fn block_all_except_home(&self) -> Result<usize, PolicyError> {
        let before = self.store.get_denylist().await?;
        let foreign = self.catalog.foreign_codes();
        let added = foreign.iter().filter(|c| !before.contains(*c)).count();

        self.store.add_to_denylist(&foreign).await?;
        self.store
            .remove_from_denylist(std::slice::from_ref(self.catalog.home()))
            .await?;

        self.events.log(LogLine::region(format!(
            "Blocked {} Countries (Excluding: {})",
            added,
            self.catalog.home()
        )));
        tracing::info!(added, home = %self.catalog.home(), "Bulk block applied");
        Ok(added)
    }

    /// Remove every selectable code from the denylist.
    ///
    /// Returns how many codes were actually removed.
    pub async fn unblock_all(&self) -> Result<usize, PolicyError> {
        let before = self.store.get_denylist().await?;
        let removed = self
            .catalog
            .codes()
            .iter()
            .filter(|c| before.contains(*c))
            .count();

        self.store.remove_from_denylist(self.catalog.codes()).await?;

        self.events.log(LogLine::region(format!(
            "Unblocked {} Countries",
            removed
        )));
        tracing::info!(removed, "Bulk unblock applied");
        Ok(removed)
    }

    /// Flip one behavior toggle.
    pub async fn set_toggle(&self, toggle: PolicyToggle, enabled: bool) -> Result<(), PolicyError> {
        self.store.set_toggle(toggle, enabled).await?;
        self.events.log(LogLine::config(format!(
            "{} '{}'",
            if enabled { "Enabled" } else { "Disabled" },
            toggle.label()
        )));
        tracing::info!(setting = toggle.key(), enabled, "Setting changed");
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
