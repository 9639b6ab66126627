// Activity log - the "home" pane of the control panel.
//
// Drains the event streams, keeps a bounded scrollback, tallies the display
// counters and echoes each line to stdout as it arrives.

use crate::core::events::{Counter, EventStreams, LogLine};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Mutex;

pub const DEFAULT_MAX_LINES: usize = 15_000;

pub struct ActivityLog {
    lines: Mutex<VecDeque<String>>,
    max_lines: usize,
    counters: DashMap<Counter, u64>,
}

impl ActivityLog {
    pub fn new(max_lines: usize) -> Self {
        let counters = DashMap::new();
        for counter in Counter::ALL {
            counters.insert(counter, 0);
        }

        Self {
            lines: Mutex::new(VecDeque::new()),
            max_lines: max_lines.max(1),
            counters,
        }
    }

    /// Append a line, dropping the oldest once over capacity. Returns the rendered line.
    pub fn record(&self, line: &LogLine) -> String {
        let rendered = format!("{} {}", line.at.format("%H:%M:%S"), line);

        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.push_back(rendered.clone());
        while lines.len() > self.max_lines {
            lines.pop_front();
        }

        rendered
    }

    pub fn increment(&self, counter: Counter) -> u64 {
        let mut count = self.counters.entry(counter).or_insert(0);
        *count += 1;
        *count
    }

    pub fn count(&self, counter: Counter) -> u64 {
        self.counters.get(&counter).map(|c| *c).unwrap_or(0)
    }

    /// The last `n` lines, oldest first.
    pub fn recent(&self, n: usize) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.iter().skip(lines.len().saturating_sub(n)).cloned().collect()
    }

    /// Consume both streams until every sender is gone.
    pub async fn run(&self, mut streams: EventStreams) {
        let mut lines_open = true;
        let mut counters_open = true;

        while lines_open || counters_open {
            tokio::select! {
                line = streams.log_lines.recv(), if lines_open => match line {
                    Some(line) => println!("{}", self.record(&line)),
                    None => lines_open = false,
                },
                counter = streams.counters.recv(), if counters_open => match counter {
                    Some(counter) => {
                        let total = self.increment(counter);
                        tracing::debug!(%counter, total, "Counter incremented");
                    }
                    None => counters_open = false,
                },
            }
        }
    }
}
