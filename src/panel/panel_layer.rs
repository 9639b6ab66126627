// Panel layer - the operator-facing control panel (activity log + settings).

pub mod activity_log;
pub mod settings_console;

use crate::core::events::ChannelEventSink;
use crate::core::policy::PolicyService;
use crate::infra::policy::SqlitePolicyStore;
use activity_log::ActivityLog;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Services the panel reads from and writes to.
pub struct Panel {
    pub policy: Arc<PolicyService<SqlitePolicyStore, ChannelEventSink>>,
    pub activity: Arc<ActivityLog>,
}
