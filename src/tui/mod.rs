//! Terminal dashboard: Elm-style model/update/render over crossterm.

#![allow(missing_docs)]

pub mod input;
pub mod model;
pub mod render;
pub mod runtime;
pub mod terminal_guard;
pub mod update;

#[cfg(test)]
mod test_properties;

pub use runtime::{DashboardRuntimeConfig, SessionSummary, run_dashboard};
