//! Elm-style state model for the parameter dashboard.
//!
//! All display state lives in [`DashboardModel`]. Input and poll results
//! arrive as [`DashboardMsg`] values; side-effects are represented as
//! [`DashboardCmd`] values returned from the update function.
//!
//! **Design invariant:** the model does no I/O, and `active_tab` and every
//! surface's `active_index` are always valid indices.

use std::time::Duration;

use crossterm::event::KeyEvent;

use crate::core::config::{Config, DisplayConfig, ParameterDescriptor, TabConfig};
use crate::feed::poller::PollOutcome;
use crate::feed::record::{ParameterRecord, ValueMap};
use crate::logger::activity::ActivityEvent;

/// Per-tab display surface state. Only the surface at `active_tab` takes input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceState {
    /// Focused row, always in `[0, parameters.len())`.
    pub active_index: usize,
}

/// The failure currently replacing the row grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedError {
    pub code: &'static str,
    pub message: String,
}

/// Complete dashboard state.
#[derive(Debug, Clone)]
pub struct DashboardModel {
    pub tabs: Vec<TabConfig>,
    pub active_tab: usize,
    /// One entry per tab, same order as `tabs`.
    pub surfaces: Vec<SurfaceState>,

    pub values: ValueMap,
    /// Records of the last successful payload, in wire order.
    pub records: Vec<ParameterRecord>,
    pub loading: bool,
    pub error: Option<FeedError>,
    pub auto_mode: bool,

    /// Highest poll sequence number applied so far.
    pub last_seq: u64,
    pub polls: u64,
    pub failures: u64,
    /// Failures since the last success; reported when the feed recovers.
    pub consecutive_failures: u64,
    pub last_latency: Option<Duration>,

    pub show_live_blocks: bool,
    pub terminal_size: (u16, u16),
    pub source_label: String,
    pub placeholder: String,
    pub loading_text: String,
    pub quit: bool,
}

impl DashboardModel {
    /// Fresh session state: first tab, row 0, loading, no error, auto-mode off.
    #[must_use]
    pub fn new(
        tabs: Vec<TabConfig>,
        display: &DisplayConfig,
        source_label: impl Into<String>,
        terminal_size: (u16, u16),
    ) -> Self {
        let surfaces = vec![SurfaceState::default(); tabs.len()];
        Self {
            tabs,
            active_tab: 0,
            surfaces,
            values: ValueMap::new(),
            records: Vec::new(),
            loading: true,
            error: None,
            auto_mode: false,
            last_seq: 0,
            polls: 0,
            failures: 0,
            consecutive_failures: 0,
            last_latency: None,
            show_live_blocks: display.show_live_blocks,
            terminal_size,
            source_label: source_label.into(),
            placeholder: display.placeholder.clone(),
            loading_text: display.loading_text.clone(),
            quit: false,
        }
    }

    /// Model for a loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config, terminal_size: (u16, u16)) -> Self {
        Self::new(
            config.tabs.clone(),
            &config.display,
            config.feed.source.clone(),
            terminal_size,
        )
    }

    #[must_use]
    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    /// Descriptors of the active tab.
    #[must_use]
    pub fn active_parameters(&self) -> &[ParameterDescriptor] {
        self.tabs
            .get(self.active_tab)
            .map_or(&[], |tab| tab.parameters.as_slice())
    }

    /// Focused row of the active tab.
    #[must_use]
    pub fn active_index(&self) -> usize {
        self.surfaces
            .get(self.active_tab)
            .map_or(0, |s| s.active_index)
    }

    /// Text shown in the value column for a descriptor key.
    #[must_use]
    pub fn display_value(&self, key: &str) -> String {
        match self.values.get(key) {
            Some(value) => value.to_string(),
            None if self.loading => self.loading_text.clone(),
            None => self.placeholder.clone(),
        }
    }
}

/// Messages that drive state transitions.
#[derive(Debug)]
pub enum DashboardMsg {
    Key(KeyEvent),
    Poll(PollOutcome),
    Resize { cols: u16, rows: u16 },
}

/// Side-effects requested by `update()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardCmd {
    None,
    /// Leave the event loop.
    Quit,
    /// Ask the poller for an immediate cycle.
    ForceRefresh,
    /// Record an activity event.
    Log(ActivityEvent),
    Batch(Vec<Self>),
}

impl DashboardCmd {
    /// Collapse a list into the smallest equivalent command.
    #[must_use]
    pub fn from_vec(mut cmds: Vec<Self>) -> Self {
        cmds.retain(|c| *c != Self::None);
        match cmds.len() {
            0 => Self::None,
            1 => cmds.remove(0),
            _ => Self::Batch(cmds),
        }
    }
}
