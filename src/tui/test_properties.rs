//! Property-based tests for dashboard reducer invariants.
//!
//! Arbitrary interleavings of key presses and poll outcomes must keep every
//! index in range, keep counters monotonic, and honor the focus suppression
//! and reset-on-absence rules.

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use proptest::prelude::*;

use super::model::{DashboardModel, DashboardMsg};
use super::update::update;
use crate::core::config::{DisplayConfig, ParameterDescriptor, TabConfig};
use crate::core::errors::DashError;
use crate::feed::poller::PollOutcome;
use crate::feed::record::decode_payload;

// ──────────────────── strategies ────────────────────

#[derive(Debug, Clone)]
enum Step {
    Key(KeyCode),
    Payload {
        page: Option<i64>,
        focus: Option<i64>,
        auto_mode: Option<bool>,
    },
    Failure,
}

fn arb_key_code() -> impl Strategy<Value = KeyCode> {
    prop_oneof![
        Just(KeyCode::Up),
        Just(KeyCode::Down),
        Just(KeyCode::Char('a')),
        Just(KeyCode::Char('d')),
        Just(KeyCode::Char('l')),
        Just(KeyCode::Char('r')),
        Just(KeyCode::Left),
        Just(KeyCode::Enter),
    ]
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => arb_key_code().prop_map(Step::Key),
        3 => (
            proptest::option::of(-2i64..8),
            proptest::option::of(-2i64..8),
            proptest::option::of(any::<bool>()),
        )
            .prop_map(|(page, focus, auto_mode)| Step::Payload { page, focus, auto_mode }),
        1 => Just(Step::Failure),
    ]
}

/// 1..=5 tabs of 1..=6 rows each.
fn arb_tabs() -> impl Strategy<Value = Vec<TabConfig>> {
    proptest::collection::vec(1usize..=6, 1..=5).prop_map(|sizes| {
        sizes
            .into_iter()
            .enumerate()
            .map(|(t, rows)| TabConfig {
                title: format!("Tab{t}"),
                parameters: (0..rows)
                    .map(|r| ParameterDescriptor::same(&format!("p{t}_{r}")))
                    .collect(),
            })
            .collect()
    })
}

fn payload_body(page: Option<i64>, focus: Option<i64>, auto_mode: Option<bool>) -> String {
    let mut records = vec![r#"{"name":"p0_0","value":"1"}"#.to_string()];
    if let Some(p) = page {
        records.push(format!(r#"{{"page":{p}}}"#));
    }
    if let Some(f) = focus {
        records.push(format!(r#"{{"focus":{f}}}"#));
    }
    if let Some(a) = auto_mode {
        records.push(format!(r#"{{"autoMode":{a}}}"#));
    }
    format!("[{}]", records.join(","))
}

fn apply(model: &mut DashboardModel, step: &Step) {
    let seq = model.last_seq + 1;
    let msg = match step {
        Step::Key(code) => DashboardMsg::Key(KeyEvent::new(*code, KeyModifiers::NONE)),
        Step::Payload {
            page,
            focus,
            auto_mode,
        } => DashboardMsg::Poll(PollOutcome {
            seq,
            latency: Duration::from_millis(1),
            result: decode_payload(&payload_body(*page, *focus, *auto_mode)),
        }),
        Step::Failure => DashboardMsg::Poll(PollOutcome {
            seq,
            latency: Duration::from_millis(1),
            result: Err(DashError::MalformedPayload {
                details: "truncated body".into(),
            }),
        }),
    };
    let _ = update(model, msg);
}

fn fresh(tabs: Vec<TabConfig>) -> DashboardModel {
    DashboardModel::new(tabs, &DisplayConfig::default(), "prop", (80, 24))
}

// ──────────────────── properties ────────────────────

proptest! {
    #[test]
    fn indices_always_in_range(tabs in arb_tabs(), steps in proptest::collection::vec(arb_step(), 0..60)) {
        let mut m = fresh(tabs);
        for step in &steps {
            apply(&mut m, step);
            prop_assert!(m.active_tab < m.tabs.len());
            for (surface, tab) in m.surfaces.iter().zip(&m.tabs) {
                prop_assert!(surface.active_index < tab.parameters.len());
            }
        }
    }

    #[test]
    fn counters_are_monotonic(tabs in arb_tabs(), steps in proptest::collection::vec(arb_step(), 0..60)) {
        let mut m = fresh(tabs);
        let (mut polls, mut failures) = (0, 0);
        for step in &steps {
            apply(&mut m, step);
            prop_assert!(m.polls >= polls);
            prop_assert!(m.failures >= failures);
            prop_assert!(m.failures <= m.polls);
            polls = m.polls;
            failures = m.failures;
        }
    }

    #[test]
    fn focus_keys_do_nothing_in_auto_mode(tabs in arb_tabs(), presses in proptest::collection::vec(any::<bool>(), 1..20)) {
        let mut m = fresh(tabs);
        apply(&mut m, &Step::Payload { page: None, focus: None, auto_mode: Some(true) });
        prop_assert!(m.auto_mode);
        let before = m.surfaces.clone();
        for up in presses {
            let code = if up { KeyCode::Up } else { KeyCode::Down };
            apply(&mut m, &Step::Key(code));
        }
        prop_assert_eq!(m.surfaces, before);
    }

    #[test]
    fn payload_without_auto_mode_clears_it(tabs in arb_tabs(), page in proptest::option::of(1i64..4)) {
        let mut m = fresh(tabs);
        apply(&mut m, &Step::Payload { page: None, focus: None, auto_mode: Some(true) });
        apply(&mut m, &Step::Payload { page, focus: None, auto_mode: None });
        prop_assert!(!m.auto_mode);
    }

    #[test]
    fn down_len_times_is_identity(tabs in arb_tabs(), start in 0usize..6) {
        let mut m = fresh(tabs);
        let len = m.active_parameters().len();
        let start = start % len;
        for _ in 0..start {
            apply(&mut m, &Step::Key(KeyCode::Down));
        }
        prop_assert_eq!(m.active_index(), start);
        for _ in 0..len {
            apply(&mut m, &Step::Key(KeyCode::Down));
        }
        prop_assert_eq!(m.active_index(), start);
    }

    #[test]
    fn failures_never_touch_values(tabs in arb_tabs(), n in 1usize..5) {
        let mut m = fresh(tabs);
        apply(&mut m, &Step::Payload { page: None, focus: None, auto_mode: None });
        let values = m.values.clone();
        for _ in 0..n {
            apply(&mut m, &Step::Failure);
        }
        prop_assert_eq!(&m.values, &values);
        prop_assert!(m.error.is_some());
    }
}
