//! State monitor behaviour against a simulated runtime.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::FakeHost;
use thinlxc_common::types::{ContainerName, ContainerState};
use thinlxc_runtime::lxc::LxcClient;
use thinlxc_runtime::monitor::{MonitorOptions, StateMonitor, WaitOutcome};

fn monitor(host: &Arc<FakeHost>, settle: Duration, timeout: Option<Duration>) -> StateMonitor {
    let options = MonitorOptions {
        poll_interval: Duration::from_millis(10),
        settle_delay: settle,
        timeout,
    };
    StateMonitor::new(LxcClient::new(host.clone()), options)
}

fn c1() -> ContainerName {
    ContainerName::new("c1").unwrap()
}

#[tokio::test]
async fn already_in_target_state_resolves_immediately() {
    let host = FakeHost::new();
    let m = monitor(&host, Duration::ZERO, Some(Duration::from_secs(2)));
    let outcome = m.watch(c1(), ContainerState::Stopped).outcome().await;
    assert_eq!(outcome, WaitOutcome::Reached(ContainerState::Stopped));
}

#[tokio::test]
async fn waits_until_state_changes() {
    let host = FakeHost::new();
    host.set_state("c1", ContainerState::Starting);
    let m = monitor(&host, Duration::ZERO, Some(Duration::from_secs(2)));
    let handle = m.watch(c1(), ContainerState::Running);

    tokio::time::sleep(Duration::from_millis(50)).await;
    host.set_state("c1", ContainerState::Running);
    assert_eq!(handle.outcome().await, WaitOutcome::Reached(ContainerState::Running));
    assert!(host.calls("lxc-info").len() > 1);
}

#[tokio::test]
async fn running_target_applies_settle_delay() {
    let host = FakeHost::new();
    host.set_state("c1", ContainerState::Running);
    let m = monitor(&host, Duration::from_millis(150), Some(Duration::from_secs(2)));

    let started = Instant::now();
    let outcome = m.watch(c1(), ContainerState::Running).outcome().await;
    assert_eq!(outcome, WaitOutcome::Reached(ContainerState::Running));
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn stopped_target_skips_settle_delay() {
    let host = FakeHost::new();
    let m = monitor(&host, Duration::from_secs(30), Some(Duration::from_secs(2)));
    let started = Instant::now();
    let outcome = m.watch(c1(), ContainerState::Stopped).outcome().await;
    assert_eq!(outcome, WaitOutcome::Reached(ContainerState::Stopped));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn unreached_state_times_out() {
    let host = FakeHost::new();
    let m = monitor(&host, Duration::ZERO, Some(Duration::from_millis(60)));
    let outcome = m.watch(c1(), ContainerState::Running).outcome().await;
    assert_eq!(outcome, WaitOutcome::TimedOut);
}

#[tokio::test]
async fn cancellation_ends_an_unbounded_watch() {
    let host = FakeHost::new();
    let m = monitor(&host, Duration::ZERO, None);
    let handle = m.watch(c1(), ContainerState::Running);
    let token = handle.cancellation_token();

    let _ = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();
    });
    assert_eq!(handle.outcome().await, WaitOutcome::Cancelled);
}

#[tokio::test]
async fn cancellation_interrupts_settle_delay() {
    let host = FakeHost::new();
    host.set_state("c1", ContainerState::Running);
    let m = monitor(&host, Duration::from_secs(30), None);
    let handle = m.watch(c1(), ContainerState::Running);
    tokio::time::sleep(Duration::from_millis(30)).await;
    handle.cancel();
    assert_eq!(handle.outcome().await, WaitOutcome::Cancelled);
}

#[tokio::test]
async fn dropping_the_handle_stops_polling() {
    let host = FakeHost::new();
    let m = monitor(&host, Duration::ZERO, None);
    drop(m.watch(c1(), ContainerState::Running));

    tokio::time::sleep(Duration::from_millis(50)).await;
    let polls = host.calls("lxc-info").len();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(host.calls("lxc-info").len(), polls);
}

#[test]
fn query_is_single_shot() {
    let host = FakeHost::new();
    host.set_state("c1", ContainerState::Stopping);
    let m = monitor(&host, Duration::ZERO, None);
    assert_eq!(m.query(&c1()), ContainerState::Stopping);
    assert_eq!(host.calls("lxc-info").len(), 1);
}
