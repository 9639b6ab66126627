// Update dispatcher - the "new private message" subscription loop.
//
// Each message gets its own task so one slow gateway call never holds up the
// rest of the queue. The loop only stops when shutdown is signalled.

use super::moderation_service::ModerationService;
use super::peer_gateway::PeerGateway;
use crate::core::events::EventSink;
use crate::core::policy::PolicyStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Pause before polling again after a failed poll.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct UpdateDispatcher<G: PeerGateway, P: PolicyStore, E: EventSink> {
    gateway: Arc<G>,
    engine: Arc<ModerationService<G, P, E>>,
    poll_timeout: Duration,
}

impl<G, P, E> UpdateDispatcher<G, P, E>
where
    G: PeerGateway + 'static,
    P: PolicyStore + 'static,
    E: EventSink + 'static,
{
    pub fn new(
        gateway: Arc<G>,
        engine: Arc<ModerationService<G, P, E>>,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            engine,
            poll_timeout,
        }
    }

    /// Poll and dispatch until `shutdown` flips to true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut offset: Option<i64> = None;
        tracing::info!("Listening for new private messages");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let polled = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                polled = self.gateway.poll_updates(offset, self.poll_timeout) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(offset.map_or(update.update_id + 1, |o| {
                            o.max(update.update_id + 1)
                        }));

                        let Some(message) = update.message else {
                            continue;
                        };

                        let engine = Arc::clone(&self.engine);
                        tokio::spawn(async move {
                            if let Some(decision) = engine.on_message(message).await {
                                tracing::debug!(?decision, "Message handled");
                            }
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!("Polling for updates failed: {}", e);
                    tokio::select! {
                        _ = shutdown.changed() => {}
                        _ = tokio::time::sleep(POLL_RETRY_DELAY) => {}
                    }
                }
            }
        }

        tracing::info!("Update dispatcher stopped");
    }
}
