//! Background poll loop: fetch → decode → publish, once immediately and then
//! on every tick of a fixed interval.
//!
//! Architecture: the poller thread owns the [`FeedSource`] and publishes
//! [`PollOutcome`] values over a crossbeam channel to the UI thread, which is
//! the only place model state is mutated. Cycles run serially, so a slow fetch
//! delays the next cycle rather than overlapping it.
//!
//! Cancellation is scoped: dropping (or [`PollerHandle::shutdown`]-ing) the
//! handle closes the stop channel, which wakes the thread out of its select.
//! An outcome that completes after teardown is discarded instead of published.

#![allow(missing_docs)]

use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, select, tick};

use crate::core::errors::{DashError, Result};
use crate::feed::record::{PayloadSnapshot, decode_payload};
use crate::feed::source::FeedSource;

/// Result of one poll cycle.
#[derive(Debug)]
pub struct PollOutcome {
    /// Monotonic per-poller cycle number, starting at 1.
    pub seq: u64,
    /// Wall time spent fetching and decoding.
    pub latency: Duration,
    pub result: Result<PayloadSnapshot>,
}

/// Run a single fetch + decode cycle.
pub fn poll_once(source: &mut dyn FeedSource, seq: u64) -> PollOutcome {
    let started = Instant::now();
    let result = source.fetch().and_then(|body| decode_payload(&body));
    PollOutcome {
        seq,
        latency: started.elapsed(),
        result,
    }
}

/// Owner-side handle for a running poller thread.
pub struct PollerHandle {
    stop_tx: Option<Sender<()>>,
    refresh_tx: Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    source_label: String,
}

impl PollerHandle {
    /// Ask for a cycle right now instead of waiting for the next tick.
    ///
    /// Coalesces: a request made while one is already pending is a no-op.
    pub fn refresh_now(&self) {
        // Full means a refresh is already queued; disconnected means the thread is gone.
        let _ = self.refresh_tx.try_send(());
    }

    /// Address of the source being polled.
    #[must_use]
    pub fn source_label(&self) -> &str {
        &self.source_label
    }

    /// Cancel the timer and wait for the thread to exit.
    ///
    /// Waits at most for an in-flight fetch, which is bounded by the source's
    /// own timeout.
    pub fn shutdown(mut self) {
        self.stop_tx.take();
        if let Some(join) = self.join.take()
            && join.join().is_err()
        {
            eprintln!("[RD-POLLER] poller thread panicked during shutdown");
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        // Closing the stop channel is enough to end the thread; it is not joined
        // here so dropping never blocks on a slow fetch.
        self.stop_tx.take();
    }
}

/// Spawn the poller thread. The first cycle starts immediately.
pub fn spawn_poller(
    source: Box<dyn FeedSource>,
    interval: Duration,
    events: Sender<PollOutcome>,
) -> Result<PollerHandle> {
    let (stop_tx, stop_rx) = bounded::<()>(0);
    let (refresh_tx, refresh_rx) = bounded::<()>(1);
    let source_label = source.describe();

    let join = thread::Builder::new()
        .name("rdash-poller".to_string())
        .spawn(move || {
            poller_thread_main(source, interval, &events, &stop_rx, &refresh_rx);
        })
        .map_err(|e| DashError::Runtime {
            details: format!("failed to spawn poller thread: {e}"),
        })?;

    Ok(PollerHandle {
        stop_tx: Some(stop_tx),
        refresh_tx,
        join: Some(join),
        source_label,
    })
}

#[allow(clippy::needless_pass_by_value)]
fn poller_thread_main(
    mut source: Box<dyn FeedSource>,
    interval: Duration,
    events: &Sender<PollOutcome>,
    stop_rx: &Receiver<()>,
    refresh_rx: &Receiver<()>,
) {
    let ticker = tick(interval);
    let mut seq: u64 = 0;

    loop {
        seq += 1;
        let outcome = poll_once(source.as_mut(), seq);

        // The owner may have torn down while the fetch was in flight.
        if is_stopped(stop_rx) {
            break;
        }

        select! {
            send(events, outcome) -> sent => {
                if sent.is_err() {
                    break;
                }
            }
            recv(stop_rx) -> _ => break,
        }

        select! {
            recv(stop_rx) -> _ => break,
            recv(refresh_rx) -> msg => {
                if msg.is_err() {
                    break;
                }
            }
            recv(ticker) -> _ => {}
        }
    }
}

fn is_stopped(stop_rx: &Receiver<()>) -> bool {
    matches!(stop_rx.try_recv(), Err(TryRecvError::Disconnected))
}

// ──────────────────── tests ────────────────────
