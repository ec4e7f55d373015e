//! Key → action mapping for the dashboard.

#![allow(missing_docs)]

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    FocusUp,
    FocusDown,
    PrevTab,
    NextTab,
    ForceRefresh,
    ToggleLiveBlocks,
    Quit,
}

/// Resolve a key event. Key releases and unmapped keys produce `None`.
#[must_use]
pub fn resolve_key_event(key: &KeyEvent) -> Option<InputAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c' | 'C')).then_some(InputAction::Quit);
    }
    match key.code {
        KeyCode::Up => Some(InputAction::FocusUp),
        KeyCode::Down => Some(InputAction::FocusDown),
        KeyCode::Char('a' | 'A') => Some(InputAction::PrevTab),
        KeyCode::Char('d' | 'D') => Some(InputAction::NextTab),
        KeyCode::Char('r' | 'R') => Some(InputAction::ForceRefresh),
        KeyCode::Char('l' | 'L') => Some(InputAction::ToggleLiveBlocks),
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Some(InputAction::Quit),
        _ => None,
    }
}
