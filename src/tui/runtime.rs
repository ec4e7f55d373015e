//! Dashboard event loop: poll outcomes and terminal events in, frames out.
//!
//! The UI thread owns the model. Each loop turn drains finished poll cycles,
//! waits briefly for a terminal event, and repaints if anything changed, so a
//! state change is always on screen before the next event is handled.

#![allow(missing_docs)]

use std::io;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, bounded};
use crossterm::event::{self, Event, KeyEventKind};

use crate::core::config::Config;
use crate::core::errors::{DashError, Result};
use crate::feed::poller::{PollOutcome, PollerHandle, spawn_poller};
use crate::feed::source::open_source;
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};

use super::model::{DashboardCmd, DashboardModel, DashboardMsg};
use super::render::{build_frame, paint};
use super::terminal_guard::TerminalGuard;
use super::update::update;

/// How long one loop turn waits for keyboard input before checking the poller.
const INPUT_POLL: Duration = Duration::from_millis(25);

/// Outcomes buffered between the poller and the UI thread.
const OUTCOME_BUFFER: usize = 16;

/// Everything a dashboard session needs.
#[derive(Clone)]
pub struct DashboardRuntimeConfig {
    pub config: Config,
    pub color: bool,
    pub logger: ActivityLoggerHandle,
}

/// Counters reported once the session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub polls: u64,
    pub failures: u64,
    pub uptime: Duration,
}

/// Run the dashboard until the user quits.
///
/// Feed failures are never fatal here; only terminal I/O errors and a failure
/// to start the poller thread end the session early.
pub fn run_dashboard(runtime: &DashboardRuntimeConfig) -> Result<SessionSummary> {
    run_session(runtime, TerminalGuard::new)
}

/// Session body, parameterized over terminal setup.
///
/// The terminal is claimed before anything is logged, so a `SessionStarted`
/// event is always paired with a `SessionStopped` one.
fn run_session<G>(
    runtime: &DashboardRuntimeConfig,
    enter_terminal: impl FnOnce() -> io::Result<G>,
) -> Result<SessionSummary> {
    let started = Instant::now();
    let feed = &runtime.config.feed;

    let guard = enter_terminal().map_err(terminal_error)?;

    let (tx, rx) = bounded::<PollOutcome>(OUTCOME_BUFFER);
    let source = open_source(&feed.source, feed.fetch_timeout());
    let poller = spawn_poller(source, feed.poll_interval(), tx)?;

    let mut model = DashboardModel::from_config(&runtime.config, TerminalGuard::terminal_size());
    model.source_label = poller.source_label().to_string();

    runtime.logger.send(ActivityEvent::SessionStarted {
        version: env!("CARGO_PKG_VERSION").to_string(),
        config_hash: runtime
            .config
            .stable_hash()
            .unwrap_or_else(|_| "unknown".to_string()),
        source: model.source_label.clone(),
    });

    let loop_result = event_loop(&mut model, &rx, &poller, runtime);
    drop(guard);

    poller.shutdown();

    let summary = SessionSummary {
        polls: model.polls,
        failures: model.failures,
        uptime: started.elapsed(),
    };
    runtime.logger.send(ActivityEvent::SessionStopped {
        polls: summary.polls,
        failures: summary.failures,
        uptime_secs: summary.uptime.as_secs(),
    });
    if let Err(e) = &loop_result {
        runtime.logger.send(ActivityEvent::Error {
            code: e.code().to_string(),
            message: e.to_string(),
        });
    }

    loop_result.map(|()| summary)
}

fn event_loop(
    model: &mut DashboardModel,
    outcomes: &Receiver<PollOutcome>,
    poller: &PollerHandle,
    runtime: &DashboardRuntimeConfig,
) -> Result<()> {
    let mut stdout = io::stdout();
    let mut dirty = true;

    while !model.quit {
        for cmd in drain_outcomes(model, outcomes) {
            execute_cmd(cmd, poller, &runtime.logger);
            dirty = true;
        }

        if dirty {
            paint(&mut stdout, &build_frame(model), model.terminal_size, runtime.color)
                .map_err(terminal_error)?;
            dirty = false;
        }

        if !event::poll(INPUT_POLL).map_err(terminal_error)? {
            continue;
        }
        let msg = match event::read().map_err(terminal_error)? {
            Event::Key(key) if key.kind != KeyEventKind::Release => DashboardMsg::Key(key),
            Event::Resize(cols, rows) => DashboardMsg::Resize { cols, rows },
            _ => continue,
        };
        execute_cmd(update(model, msg), poller, &runtime.logger);
        dirty = true;
    }

    Ok(())
}

/// Apply every poll outcome that is already waiting, returning the commands
/// they produced. Never blocks.
pub fn drain_outcomes(
    model: &mut DashboardModel,
    outcomes: &Receiver<PollOutcome>,
) -> Vec<DashboardCmd> {
    outcomes
        .try_iter()
        .map(|outcome| update(model, DashboardMsg::Poll(outcome)))
        .collect()
}

fn execute_cmd(cmd: DashboardCmd, poller: &PollerHandle, logger: &ActivityLoggerHandle) {
    match cmd {
        DashboardCmd::None | DashboardCmd::Quit => {}
        DashboardCmd::ForceRefresh => poller.refresh_now(),
        DashboardCmd::Log(event) => logger.send(event),
        DashboardCmd::Batch(cmds) => {
            for cmd in cmds {
                execute_cmd(cmd, poller, logger);
            }
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
fn terminal_error(e: io::Error) -> DashError {
    DashError::Runtime {
        details: format!("terminal: {e}"),
    }
}
