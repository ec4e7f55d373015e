//! Activity logger thread: the dashboard's session and feed transitions, as JSONL.
//!
//! A dedicated thread owns the [`JsonlWriter`]. The UI thread sends
//! [`ActivityEvent`]s over a bounded crossbeam channel with `try_send()`, so a
//! slow disk can never stall rendering or input handling.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::errors::{DashError, Result};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

/// Default bounded channel capacity for log events.
const CHANNEL_CAPACITY: usize = 256;

/// Things worth recording about a dashboard session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent {
    SessionStarted {
        version: String,
        config_hash: String,
        source: String,
    },
    SessionStopped {
        polls: u64,
        failures: u64,
        uptime_secs: u64,
    },
    /// Entered the error state, or the error message changed while in it.
    FeedFailed {
        seq: u64,
        code: String,
        message: String,
    },
    /// First success after one or more failures.
    FeedRecovered {
        seq: u64,
        after_failures: u64,
        latency_ms: u64,
    },
    /// Feed-driven page switch, 1-based on both sides.
    PageOverride {
        from: usize,
        to: usize,
    },
    AutoModeChanged {
        enabled: bool,
    },
    Error {
        code: String,
        message: String,
    },
    /// Sentinel to request graceful shutdown of the logger thread.
    Shutdown,
}

/// Cheaply-cloneable handle for sending log events. Never blocks.
#[derive(Clone)]
pub struct ActivityLoggerHandle {
    tx: Sender<ActivityEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl ActivityLoggerHandle {
    /// A handle with no logger thread behind it; every send is discarded.
    #[must_use]
    pub fn disabled() -> Self {
        let (tx, _rx) = bounded(1);
        Self {
            tx,
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queue an event. If the channel is full the event is dropped and counted.
    pub fn send(&self, event: ActivityEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Events dropped due to back-pressure and not yet reported in the log.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// A handle whose events land on the returned receiver instead of a file.
    #[cfg(test)]
    pub(crate) fn capture(capacity: usize) -> (Self, Receiver<ActivityEvent>) {
        let (tx, rx) = bounded(capacity);
        (
            Self {
                tx,
                dropped_events: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Ask the logger thread to flush and exit.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ActivityEvent::Shutdown);
    }
}

/// Spawn the logger thread. It runs until `shutdown()` or until every handle is dropped.
pub fn spawn_logger(
    config: JsonlConfig,
) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<ActivityEvent>(CHANNEL_CAPACITY);
    let dropped = Arc::new(AtomicU64::new(0));
    let thread_dropped = Arc::clone(&dropped);

    let join = thread::Builder::new()
        .name("rdash-logger".to_string())
        .spawn(move || logger_thread_main(rx, config, thread_dropped))
        .map_err(|e| DashError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((
        ActivityLoggerHandle {
            tx,
            dropped_events: dropped,
        },
        join,
    ))
}

#[allow(clippy::needless_pass_by_value)]
fn logger_thread_main(rx: Receiver<ActivityEvent>, config: JsonlConfig, dropped: Arc<AtomicU64>) {
    let mut jsonl = JsonlWriter::open(config);

    while let Ok(event) = rx.recv() {
        let lost = dropped.swap(0, Ordering::Relaxed);
        if lost > 0 {
            let mut warn = LogEntry::new(EventType::Error, Severity::Warning);
            warn.details = Some(format!("{lost} log events dropped due to back-pressure"));
            jsonl.write_entry(&warn);
        }

        if event == ActivityEvent::Shutdown {
            break;
        }
        jsonl.write_entry(&event_to_log_entry(&event));
        // Events are rare (transitions only), so every one reaches the file promptly.
        jsonl.flush();
    }

    jsonl.sync();
}

fn event_to_log_entry(event: &ActivityEvent) -> LogEntry {
    match event {
        ActivityEvent::SessionStarted {
            version,
            config_hash,
            source,
        } => {
            let mut e = LogEntry::new(EventType::SessionStart, Severity::Info);
            e.source = Some(source.clone());
            e.details = Some(format!("version={version} config_hash={config_hash}"));
            e
        }
        ActivityEvent::SessionStopped {
            polls,
            failures,
            uptime_secs,
        } => {
            let mut e = LogEntry::new(EventType::SessionStop, Severity::Info);
            e.details = Some(format!(
                "polls={polls} failures={failures} uptime_secs={uptime_secs}"
            ));
            e
        }
        ActivityEvent::FeedFailed { seq, code, message } => {
            let mut e = LogEntry::new(EventType::FeedFailed, Severity::Warning);
            e.seq = Some(*seq);
            e.ok = Some(false);
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e
        }
        ActivityEvent::FeedRecovered {
            seq,
            after_failures,
            latency_ms,
        } => {
            let mut e = LogEntry::new(EventType::FeedRecovered, Severity::Info);
            e.seq = Some(*seq);
            e.ok = Some(true);
            e.latency_ms = Some(*latency_ms);
            e.details = Some(format!("recovered after {after_failures} failed polls"));
            e
        }
        ActivityEvent::PageOverride { from, to } => {
            let mut e = LogEntry::new(EventType::PageOverride, Severity::Info);
            e.page = Some(format!("{from}->{to}"));
            e
        }
        ActivityEvent::AutoModeChanged { enabled } => {
            let severity = if *enabled {
                Severity::Warning
            } else {
                Severity::Info
            };
            let mut e = LogEntry::new(EventType::AutoModeChange, severity);
            e.auto_mode = Some(*enabled);
            e
        }
        ActivityEvent::Error { code, message } => {
            let mut e = LogEntry::new(EventType::Error, Severity::Critical);
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e
        }
        ActivityEvent::Shutdown => LogEntry::new(EventType::SessionStop, Severity::Info),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn test_config(dir: &Path) -> JsonlConfig {
        JsonlConfig {
            path: dir.join("activity.jsonl"),
            fallback_path: None,
            max_size_bytes: 1024 * 1024,
            max_rotated_files: 2,
        }
    }

    fn read_events(dir: &Path) -> Vec<serde_json::Value> {
        fs::read_to_string(dir.join("activity.jsonl"))
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn spawn_and_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, join) = spawn_logger(test_config(dir.path())).unwrap();
        handle.send(ActivityEvent::SessionStarted {
            version: "0.1.0".into(),
            config_hash: "abc".into(),
            source: "parameters.json".into(),
        });
        handle.shutdown();
        join.join().unwrap();

        let events = read_events(dir.path());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["event"], "session_start");
        assert_eq!(events[0]["source"], "parameters.json");
    }

    #[test]
    fn transitions_logged_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, join) = spawn_logger(test_config(dir.path())).unwrap();
        handle.send(ActivityEvent::FeedFailed {
            seq: 3,
            code: "RD-2002".into(),
            message: "HTTP error! status: 500".into(),
        });
        handle.send(ActivityEvent::FeedRecovered {
            seq: 4,
            after_failures: 1,
            latency_ms: 12,
        });
        handle.send(ActivityEvent::PageOverride { from: 1, to: 3 });
        handle.send(ActivityEvent::AutoModeChanged { enabled: true });
        handle.shutdown();
        join.join().unwrap();

        let events = read_events(dir.path());
        let kinds: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
        assert_eq!(
            kinds,
            vec!["feed_failed", "feed_recovered", "page_override", "auto_mode_change"]
        );
        assert_eq!(events[0]["error_code"], "RD-2002");
        assert_eq!(events[1]["latency_ms"], 12);
        assert_eq!(events[2]["page"], "1->3");
        assert_eq!(events[3]["severity"], "warning");
    }

    #[test]
    fn dropping_all_handles_ends_thread() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, join) = spawn_logger(test_config(dir.path())).unwrap();
        let clone = handle.clone();
        thread::spawn(move || clone.send(ActivityEvent::AutoModeChanged { enabled: false }))
            .join()
            .unwrap();
        drop(handle);
        join.join().unwrap();
        assert_eq!(read_events(dir.path()).len(), 1);
    }

    #[test]
    fn full_channel_counts_dropped_events() {
        let (handle, rx) = ActivityLoggerHandle::capture(1);
        handle.send(ActivityEvent::AutoModeChanged { enabled: true });
        handle.send(ActivityEvent::AutoModeChanged { enabled: false });
        handle.send(ActivityEvent::PageOverride { from: 1, to: 2 });
        assert_eq!(handle.dropped_events(), 2);
        assert_eq!(
            rx.try_recv().unwrap(),
            ActivityEvent::AutoModeChanged { enabled: true }
        );
    }

    #[test]
    fn disabled_handle_discards_silently() {
        let handle = ActivityLoggerHandle::disabled();
        for _ in 0..10 {
            handle.send(ActivityEvent::AutoModeChanged { enabled: true });
        }
        assert_eq!(handle.dropped_events(), 0);
        handle.shutdown();
    }
}
