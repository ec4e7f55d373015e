//! Poller + reducer against a live local HTTP feed.

mod common;

use std::time::Duration;

use crossbeam_channel::{Receiver, unbounded};

use common::serve_script;
use race_dash::core::config::{DisplayConfig, default_tabs};
use race_dash::feed::poller::{PollOutcome, spawn_poller};
use race_dash::feed::source::{FeedSource, HttpSource};
use race_dash::tui::model::{DashboardModel, DashboardMsg};
use race_dash::tui::update::update;

const TIMEOUT: Duration = Duration::from_secs(2);

fn model() -> DashboardModel {
    DashboardModel::new(default_tabs(), &DisplayConfig::default(), "http", (80, 24))
}

/// Apply outcomes one at a time until `seq` has been applied.
fn pump_until(model: &mut DashboardModel, rx: &Receiver<PollOutcome>, seq: u64) {
    while model.last_seq < seq {
        let outcome = rx
            .recv_timeout(Duration::from_secs(10))
            .unwrap_or_else(|e| panic!("timed out waiting for poll {seq}: {e}"));
        update(model, DashboardMsg::Poll(outcome));
    }
}

#[test]
fn http_source_returns_body() {
    let feed = serve_script(vec![(200, r#"[{"name":"TV_g","value":"11"}]"#)]);
    let mut source = HttpSource::new(feed.url.clone(), TIMEOUT);
    let body = source.fetch().expect("fetch");
    assert!(body.contains("TV_g"));
    assert_eq!(source.describe(), feed.url);
}

#[test]
fn http_500_is_a_status_error() {
    let feed = serve_script(vec![(500, "internal")]);
    let mut source = HttpSource::new(feed.url, TIMEOUT);
    let err = source.fetch().unwrap_err();
    assert_eq!(err.code(), "RD-2002");
    assert!(err.to_string().contains("HTTP error! status: 500"));
    assert!(err.is_retryable());
}

#[test]
fn connection_refused_is_a_transport_error() {
    // Port 9 (discard) has no listener on test machines.
    let mut source = HttpSource::new("http://127.0.0.1:9/parameters.json", TIMEOUT);
    let err = source.fetch().unwrap_err();
    assert_eq!(err.code(), "RD-2001");
    assert!(err.is_feed_error());
}

#[test]
fn page_override_then_absence_keeps_tab() {
    let feed = serve_script(vec![
        (200, r#"[{"name":"TV_g","value":"11"},{"page":2}]"#),
        (200, r#"[{"name":"TV_g","value":"12"}]"#),
    ]);
    let (tx, rx) = unbounded();
    let poller = spawn_poller(
        Box::new(HttpSource::new(feed.url, TIMEOUT)),
        Duration::from_millis(20),
        tx,
    )
    .expect("spawn poller");

    let mut m = model();
    pump_until(&mut m, &rx, 1);
    assert_eq!(m.active_tab, 1);
    assert_eq!(m.display_value("TV_g"), "11");

    pump_until(&mut m, &rx, 3);
    assert_eq!(m.active_tab, 1);
    assert_eq!(m.display_value("TV_g"), "12");
    poller.shutdown();
}

#[test]
fn failure_keeps_values_and_recovery_clears_error() {
    let feed = serve_script(vec![
        (200, r#"[{"name":"TV_g","value":"11"},{"name":"Mu","value":"1.6"}]"#),
        (500, "down"),
        (200, r#"[{"name":"Plim","value":"80"}]"#),
    ]);
    let (tx, rx) = unbounded();
    let poller = spawn_poller(
        Box::new(HttpSource::new(feed.url, TIMEOUT)),
        Duration::from_millis(20),
        tx,
    )
    .expect("spawn poller");

    let mut m = model();
    pump_until(&mut m, &rx, 2);
    assert_eq!(m.error.as_ref().map(|e| e.code), Some("RD-2002"));
    assert_eq!(m.display_value("TV_g"), "11");
    assert_eq!(m.values.len(), 2);

    pump_until(&mut m, &rx, 3);
    assert!(m.error.is_none());
    assert_eq!(m.values.len(), 1);
    assert_eq!(m.display_value("TV_g"), "---");
    assert_eq!(m.display_value("Plim"), "80");
    assert_eq!(m.polls, 3);
    assert_eq!(m.failures, 1);
    poller.shutdown();
}

#[test]
fn non_array_body_is_malformed() {
    let feed = serve_script(vec![(200, r#"{"name":"TV_g"}"#)]);
    let (tx, rx) = unbounded();
    let poller = spawn_poller(
        Box::new(HttpSource::new(feed.url, TIMEOUT)),
        Duration::from_secs(60),
        tx,
    )
    .expect("spawn poller");

    let outcome = rx.recv_timeout(Duration::from_secs(10)).expect("first outcome");
    assert_eq!(outcome.result.unwrap_err().code(), "RD-2003");
    poller.shutdown();
}

#[test]
fn forced_refresh_hits_the_server_again() {
    let feed = serve_script(vec![(200, "[]")]);
    let (tx, rx) = unbounded();
    let poller = spawn_poller(
        Box::new(HttpSource::new(feed.url.clone(), TIMEOUT)),
        Duration::from_secs(60),
        tx,
    )
    .expect("spawn poller");

    rx.recv_timeout(Duration::from_secs(10)).expect("first");
    poller.refresh_now();
    let second = rx.recv_timeout(Duration::from_secs(10)).expect("forced");
    assert_eq!(second.seq, 2);
    assert!(feed.requests.load(std::sync::atomic::Ordering::SeqCst) >= 2);
    poller.shutdown();
}
