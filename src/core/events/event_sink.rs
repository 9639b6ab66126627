// Event sink - the outbound port for log lines and counter increments.
//
// Emission never blocks or fails from the caller's point of view: if nobody is
// listening anymore the event is dropped and noted in the tracing log.

use super::event_models::{Counter, LogLine};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Two-channel publisher consumed by any UI or logger.
pub trait EventSink: Send + Sync {
    /// Append a line to the activity log stream.
    fn log(&self, line: LogLine);

    /// Bump a named display counter.
    fn increment(&self, counter: Counter);
}

/// Receiving halves handed to whatever renders the activity log.
pub struct EventStreams {
    pub log_lines: UnboundedReceiver<LogLine>,
    pub counters: UnboundedReceiver<Counter>,
}

/// Sink backed by two unbounded tokio channels.
#[derive(Clone)]
pub struct ChannelEventSink {
    log_tx: UnboundedSender<LogLine>,
    counter_tx: UnboundedSender<Counter>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, EventStreams) {
        let (log_tx, log_lines) = unbounded_channel();
        let (counter_tx, counters) = unbounded_channel();
        (
            Self { log_tx, counter_tx },
            EventStreams {
                log_lines,
                counters,
            },
        )
    }
}

impl EventSink for ChannelEventSink {
    fn log(&self, line: LogLine) {
        if let Err(e) = self.log_tx.send(line) {
            tracing::debug!("Activity log receiver gone, dropping line: {}", e.0);
        }
    }

    fn increment(&self, counter: Counter) {
        if self.counter_tx.send(counter).is_err() {
            tracing::debug!(%counter, "Counter receiver gone, dropping increment");
        }
    }
}
