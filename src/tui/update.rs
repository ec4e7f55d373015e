//! Pure update function for the dashboard.
//!
//! `update()` takes the current model and a message, mutates the model, and
//! returns a command describing any side-effects the runtime should execute.
//! This module performs zero I/O.
//!
//! Reconciliation order for a successful poll: value map, error and loading
//! flags, then the page override, then the focus override, then auto-mode.
//! Keyboard input and feed overrides touch the same indices; whichever message
//! arrives last wins.

use crate::core::errors::DashError;
use crate::feed::poller::PollOutcome;
use crate::feed::record::PayloadSnapshot;
use crate::logger::activity::ActivityEvent;

use super::input::{InputAction, resolve_key_event};
use super::model::{DashboardCmd, DashboardModel, DashboardMsg, FeedError};

/// Apply a message to the model and return the next command for the runtime.
pub fn update(model: &mut DashboardModel, msg: DashboardMsg) -> DashboardCmd {
    match msg {
        DashboardMsg::Key(key) => match resolve_key_event(&key) {
            Some(action) => apply_input_action(model, action),
            None => DashboardCmd::None,
        },
        DashboardMsg::Poll(outcome) => apply_poll(model, outcome),
        DashboardMsg::Resize { cols, rows } => {
            model.terminal_size = (cols, rows);
            DashboardCmd::None
        }
    }
}

fn apply_input_action(model: &mut DashboardModel, action: InputAction) -> DashboardCmd {
    match action {
        InputAction::FocusUp => {
            move_focus(model, -1);
            DashboardCmd::None
        }
        InputAction::FocusDown => {
            move_focus(model, 1);
            DashboardCmd::None
        }
        InputAction::PrevTab => {
            model.active_tab = wrap(model.active_tab, -1, model.tab_count());
            DashboardCmd::None
        }
        InputAction::NextTab => {
            model.active_tab = wrap(model.active_tab, 1, model.tab_count());
            DashboardCmd::None
        }
        InputAction::ForceRefresh => DashboardCmd::ForceRefresh,
        InputAction::ToggleLiveBlocks => {
            model.show_live_blocks = !model.show_live_blocks;
            DashboardCmd::None
        }
        InputAction::Quit => {
            model.quit = true;
            DashboardCmd::Quit
        }
    }
}

/// Up/Down on the active surface. Suppressed entirely while auto-mode is on.
fn move_focus(model: &mut DashboardModel, delta: isize) {
    if model.auto_mode {
        return;
    }
    let len = model.active_parameters().len();
    if let Some(surface) = model.surfaces.get_mut(model.active_tab) {
        surface.active_index = wrap(surface.active_index, delta, len);
    }
}

/// `(index + delta) mod len`, always non-negative. An empty sequence pins to 0.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn wrap(index: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let len = len as isize;
    ((index as isize + delta).rem_euclid(len)) as usize
}

fn apply_poll(model: &mut DashboardModel, outcome: PollOutcome) -> DashboardCmd {
    // Outcomes are sequenced; anything not newer than what is shown is stale.
    if outcome.seq <= model.last_seq {
        return DashboardCmd::None;
    }
    model.last_seq = outcome.seq;
    model.polls += 1;
    model.last_latency = Some(outcome.latency);
    let first_attempt = model.polls == 1;

    match outcome.result {
        Ok(snapshot) => apply_snapshot(model, outcome.seq, outcome.latency.as_millis(), snapshot),
        Err(err) => apply_failure(model, outcome.seq, first_attempt, &err),
    }
}

fn apply_snapshot(
    model: &mut DashboardModel,
    seq: u64,
    latency_ms: u128,
    snapshot: PayloadSnapshot,
) -> DashboardCmd {
    let mut cmds = Vec::new();

    if model.error.take().is_some() {
        cmds.push(DashboardCmd::Log(ActivityEvent::FeedRecovered {
            seq,
            after_failures: model.consecutive_failures,
            latency_ms: u64::try_from(latency_ms).unwrap_or(u64::MAX),
        }));
    }
    model.consecutive_failures = 0;
    model.loading = false;
    model.values = snapshot.values;
    model.records = snapshot.records;

    if let Some(page) = snapshot.page
        && let Some(cmd) = apply_page_override(model, page)
    {
        cmds.push(cmd);
    }
    if let Some(focus) = snapshot.focus {
        apply_focus_override(model, focus);
    }

    if model.auto_mode != snapshot.auto_mode {
        model.auto_mode = snapshot.auto_mode;
        cmds.push(DashboardCmd::Log(ActivityEvent::AutoModeChanged {
            enabled: snapshot.auto_mode,
        }));
    }

    DashboardCmd::from_vec(cmds)
}

/// 1-based page → tab index. Ignored when out of range or already current.
fn apply_page_override(model: &mut DashboardModel, page: i64) -> Option<DashboardCmd> {
    let target = usize::try_from(page).ok()?.checked_sub(1)?;
    if target >= model.tab_count() || target == model.active_tab {
        return None;
    }
    let from = model.active_tab;
    model.active_tab = target;
    Some(DashboardCmd::Log(ActivityEvent::PageOverride {
        from: from + 1,
        to: target + 1,
    }))
}

/// 0-based focus → every surface where it is in bounds.
///
/// The feed carries a single focus value for the whole display, so tabs with
/// enough rows all follow it and the one shown after a page override already
/// has the requested row focused.
fn apply_focus_override(model: &mut DashboardModel, focus: i64) {
    let Ok(index) = usize::try_from(focus) else {
        return;
    };
    for (surface, tab) in model.surfaces.iter_mut().zip(&model.tabs) {
        if index < tab.parameters.len() {
            surface.active_index = index;
        }
    }
}

fn apply_failure(
    model: &mut DashboardModel,
    seq: u64,
    first_attempt: bool,
    err: &DashError,
) -> DashboardCmd {
    model.failures += 1;
    model.consecutive_failures += 1;
    if first_attempt {
        model.loading = false;
    }

    let next = FeedError {
        code: err.code(),
        message: err.to_string(),
    };
    if model.error.as_ref() == Some(&next) {
        return DashboardCmd::None;
    }
    let cmd = DashboardCmd::Log(ActivityEvent::FeedFailed {
        seq,
        code: next.code.to_string(),
        message: next.message.clone(),
    });
    model.error = Some(next);
    cmd
}
