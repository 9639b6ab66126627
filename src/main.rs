// This is the entry point of the country guard.
//
// **Architecture Overview:**
// - `core/` = Business logic (transport-agnostic)
// - `infra/` = Implementations of core traits (SQLite, the gateway client)
// - `panel/` = Operator-facing control panel (activity log, settings console)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Connect to the messaging gateway and start the update dispatcher
// 4. Run the control panel until the operator quits

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;
#[path = "panel/panel_layer.rs"]
mod panel;

use crate::core::events::{ChannelEventSink, EventSink, LogLine};
use crate::core::moderation::{ModerationService, PeerGateway, UpdateDispatcher};
use crate::core::policy::{
    CountryCatalog, CountryCode, PolicyService, PolicyStore, DEFAULT_HOME_COUNTRY,
};
use crate::infra::policy::SqlitePolicyStore;
use crate::infra::telegram::{GatewayClient, GatewayConfig};
use crate::panel::activity_log::{ActivityLog, DEFAULT_MAX_LINES};
use crate::panel::{settings_console, Panel};
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const DEFAULT_SETTINGS_DB: &str = "data/settings.db";
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

/// Verify the gateway session and spawn the dispatcher.
///
/// A gateway that cannot be reached or authorized is reported once on the
/// activity log and moderation does not start.
async fn start_moderation<G, P, E>(
    gateway: Arc<G>,
    policy_store: Arc<P>,
    sink: Arc<E>,
    poll_timeout: Duration,
    shutdown: watch::Receiver<bool>,
) -> Option<JoinHandle<()>>
where
    G: PeerGateway + 'static,
    P: PolicyStore + 'static,
    E: EventSink + 'static,
{
    match gateway.verify_session().await {
        Ok(account) => {
            tracing::info!(account = %account, "Gateway session verified");
            sink.log(LogLine::output(format!("Signed in as {}", account)));
        }
        Err(e) => {
            tracing::error!("Gateway session check failed: {}", e);
            sink.log(LogLine::failure(e.to_string()));
            return None;
        }
    }

    let engine = Arc::new(ModerationService::new(
        Arc::clone(&gateway),
        policy_store,
        sink,
    ));
    let dispatcher = UpdateDispatcher::new(gateway, engine, poll_timeout);

    Some(tokio::spawn(dispatcher.run(shutdown)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let gateway_url = std::env::var("GATEWAY_URL")
        .context("Missing GATEWAY_URL environment variable! Point it at your MTProto bridge.")?;
    let gateway_token = std::env::var("GATEWAY_TOKEN")
        .context("Missing GATEWAY_TOKEN environment variable! Create a .env file with your session token.")?;
    let settings_db =
        std::env::var("SETTINGS_DB").unwrap_or_else(|_| DEFAULT_SETTINGS_DB.to_string());
    let home_country = std::env::var("HOME_COUNTRY")
        .unwrap_or_else(|_| DEFAULT_HOME_COUNTRY.to_string());
    let home_country = CountryCode::parse(&home_country).context("Invalid HOME_COUNTRY")?;
    let poll_timeout = std::env::var("POLL_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_POLL_TIMEOUT_SECS);
    let max_log_lines = std::env::var("MAX_LOG_LINES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_MAX_LINES);

    // Keep the settings database in a dedicated folder so the repo root stays tidy.
    if let Some(parent) = Path::new(&settings_db).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", settings_db))
        .await
        .context("Failed to open settings DB")?;
    let policy_store = Arc::new(SqlitePolicyStore::new(pool));
    policy_store
        .migrate()
        .await
        .context("Failed to migrate settings DB")?;

    let (sink, streams) = ChannelEventSink::new();
    let sink = Arc::new(sink);

    let activity = Arc::new(ActivityLog::new(max_log_lines));
    {
        let activity = Arc::clone(&activity);
        tokio::spawn(async move { activity.run(streams).await });
    }

    let panel = Panel {
        policy: Arc::new(PolicyService::new(
            Arc::clone(&policy_store),
            Arc::clone(&sink),
            CountryCatalog::new(home_country),
        )),
        activity,
    };

    // ========================================================================
    // MODERATION
    // ========================================================================

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let gateway_config = GatewayConfig {
        base_url: gateway_url,
        token: gateway_token,
        poll_timeout: Duration::from_secs(poll_timeout),
    };
    let dispatcher = match GatewayClient::new(&gateway_config) {
        Ok(gateway) => {
            start_moderation(
                Arc::new(gateway),
                Arc::clone(&policy_store),
                Arc::clone(&sink),
                gateway_config.poll_timeout,
                shutdown_rx,
            )
            .await
        }
        Err(e) => {
            tracing::error!("Failed to create gateway client: {}", e);
            sink.log(LogLine::failure(e.to_string()));
            None
        }
    };

    // ========================================================================
    // CONTROL PANEL
    // ========================================================================

    tokio::select! {
        _ = settings_console::run(&panel) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
        }
    }

    // The dispatcher may already be gone if startup failed
    let _ = shutdown_tx.send(true);
    if let Some(handle) = dispatcher {
        if let Err(e) = handle.await {
            tracing::warn!("Dispatcher task ended abnormally: {}", e);
        }
    }

    Ok(())
}
