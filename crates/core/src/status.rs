use std::sync::mpsc;

use chrono::{DateTime, Local};

use crate::interval::format_countdown;

/// Snapshot of a run, copied out whole on every publish.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatus {
    pub running: bool,
    pub click_count: u64,
    pub skipped_count: u64,
    /// Score of the most recent gate evaluation, if any ran
    pub last_similarity: Option<f64>,
    pub last_action_taken: bool,
    pub seconds_remaining: u64,
    pub randomized: bool,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub started_at: Option<DateTime<Local>>,
    pub last_action_at: Option<DateTime<Local>>,
}

impl RunStatus {
    /// One-line summary for status bars.
    pub fn summary(&self) -> String {
        if !self.running {
            return format!("Stopped | Clicks: {} | Skipped: {}", self.click_count, self.skipped_count);
        }
        let mut line = format!(
            "Running | Clicks: {} | Skipped: {} | Next: {}",
            self.click_count,
            self.skipped_count,
            format_countdown(self.seconds_remaining)
        );
        if self.randomized {
            line.push_str(" (rnd)");
        }
        line
    }
}

/// Receives a snapshot on every cycle and countdown tick.
pub trait StatusReporter: Send + Sync {
    fn publish(&self, status: &RunStatus);
}

impl<F> StatusReporter for F
where
    F: Fn(&RunStatus) + Send + Sync,
{
    fn publish(&self, status: &RunStatus) {
        self(status)
    }
}

/// Forwards snapshots over a channel. A dropped receiver is ignored.
pub struct ChannelReporter {
    tx: parking_lot::Mutex<mpsc::Sender<RunStatus>>,
}

impl ChannelReporter {
    pub fn new(tx: mpsc::Sender<RunStatus>) -> Self {
        Self { tx: parking_lot::Mutex::new(tx) }
    }

    pub fn channel() -> (Self, mpsc::Receiver<RunStatus>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }
}

impl StatusReporter for ChannelReporter {
    fn publish(&self, status: &RunStatus) {
        self.tx.lock().send(status.clone()).ok();
    }
}

/// Discards everything.
pub struct NullReporter;

impl StatusReporter for NullReporter {
    fn publish(&self, _status: &RunStatus) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_running_marks_random_runs() {
        let status = RunStatus {
            running: true,
            click_count: 3,
            skipped_count: 1,
            seconds_remaining: 75,
            randomized: true,
            ..Default::default()
        };
        assert_eq!(status.summary(), "Running | Clicks: 3 | Skipped: 1 | Next: 01:15 (rnd)");
    }

    #[test]
    fn summary_stopped() {
        let status = RunStatus { click_count: 9, ..Default::default() };
        assert_eq!(status.summary(), "Stopped | Clicks: 9 | Skipped: 0");
    }

    #[test]
    fn channel_reporter_delivers_copies() {
        let (reporter, rx) = ChannelReporter::channel();
        reporter.publish(&RunStatus { click_count: 1, ..Default::default() });
        assert_eq!(rx.recv().unwrap().click_count, 1);
        drop(rx);
        // receiver gone: must not panic
        reporter.publish(&RunStatus::default());
    }
}
