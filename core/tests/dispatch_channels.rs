mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{Behavior, FakeExecutor};
use gpgdrive_core::api::{
    DispatchConfig, DispatchOutcome, KeyDatabaseInfo, MultiChannelDispatcher, RuntimeValues,
    StaticChannelSource,
};
use gpgdrive_core::config::{CORE_NAMESPACE, GPGCONF_PATH_KEY};
use gpgdrive_core::dispatch::{EXIT_CANCELLED, EXIT_TRANSPORT};
use pretty_assertions::assert_eq;

// Paths that do not exist are passed to gpgconf exactly as configured.
const H0: &str = "/nonexistent/gpgdrive-test/h0";
const H1: &str = "/nonexistent/gpgdrive-test/h1";
const H2: &str = "/nonexistent/gpgdrive-test/h2";

fn channels(n: usize) -> Arc<StaticChannelSource> {
    let homes = [H0, H1, H2];
    Arc::new(StaticChannelSource(
        homes
            .iter()
            .take(n)
            .enumerate()
            .map(|(i, h)| KeyDatabaseInfo::new(i as i32, format!("db{i}"), *h))
            .collect(),
    ))
}

fn runtime_with_gpgconf() -> Arc<RuntimeValues> {
    let rv = Arc::new(RuntimeValues::new());
    rv.set(CORE_NAMESPACE, GPGCONF_PATH_KEY, "/usr/bin/gpgconf");
    rv
}

fn dispatcher(
    exec: Arc<FakeExecutor>,
    n: usize,
    rv: Arc<RuntimeValues>,
) -> MultiChannelDispatcher {
    MultiChannelDispatcher::new(exec, channels(n), rv, &DispatchConfig::default())
}

struct Counted {
    calls: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<DispatchOutcome>>>,
}

impl Counted {
    fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            last: Arc::new(Mutex::new(None)),
        }
    }

    fn callback(&self) -> impl FnOnce(DispatchOutcome) + Send + 'static {
        let calls = self.calls.clone();
        let last = self.last.clone();
        move |o| {
            calls.fetch_add(1, Ordering::SeqCst);
            *last.lock().unwrap() = Some(o);
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last(&self) -> Option<DispatchOutcome> {
        self.last.lock().unwrap().clone()
    }
}

fn exit(code: i32, delay_ms: u64) -> Behavior {
    Behavior::Exit { code, delay_ms }
}

#[tokio::test]
async fn all_zero_is_success() {
    let exec = Arc::new(
        FakeExecutor::new()
            .with(H0, exit(0, 5))
            .with(H1, exit(0, 1))
            .with(H2, exit(0, 3)),
    );
    let counted = Counted::new();

    let outcome = dispatcher(exec.clone(), 3, runtime_with_gpgconf())
        .reload_components(counted.callback())
        .finished()
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.code(), 0);
    assert_eq!(counted.calls(), 1);
    assert_eq!(counted.last(), Some(outcome.clone()));
    assert_eq!(exec.call_count(), 3);

    let calls = exec.calls.lock().unwrap().clone();
    for spec in &calls {
        assert_eq!(spec.program, "/usr/bin/gpgconf");
        assert_eq!(&spec.args[0], "--homedir");
        assert_eq!(&spec.args[2..], &["--reload".to_string(), "all".to_string()]);
    }
}

#[tokio::test]
async fn one_transport_failure_fails_the_aggregate() {
    let exec = Arc::new(
        FakeExecutor::new()
            .with(H0, exit(0, 0))
            .with(H1, exit(0, 0))
            .with(H2, Behavior::SpawnFails),
    );
    let counted = Counted::new();

    let outcome = dispatcher(exec, 3, runtime_with_gpgconf())
        .launch_all(counted.callback())
        .finished()
        .await;

    assert!(!outcome.success);
    let codes: Vec<i32> = outcome.results.iter().map(|r| r.exit_code).collect();
    assert_eq!(codes, vec![0, 0, EXIT_TRANSPORT]);
    assert_eq!(counted.calls(), 1);
}

#[tokio::test]
async fn positive_exit_code_is_not_a_failure() {
    let exec = Arc::new(FakeExecutor::new().with(H0, exit(1, 0)));
    let outcome = dispatcher(exec, 1, runtime_with_gpgconf())
        .clear_password_cache(|_| {})
        .finished()
        .await;
    assert!(outcome.success);
    assert_eq!(outcome.results[0].exit_code, 1);
}

#[tokio::test]
async fn no_channels_is_immediate_success() {
    let exec = Arc::new(FakeExecutor::new());
    let counted = Counted::new();

    let handle = dispatcher(exec.clone(), 0, runtime_with_gpgconf())
        .kill_all(counted.callback());
    // Fired synchronously, before anything is awaited.
    assert_eq!(counted.calls(), 1);

    let outcome = handle.finished().await;
    assert!(outcome.success);
    assert!(outcome.results.is_empty());
    assert_eq!(exec.call_count(), 0);
}

#[tokio::test]
async fn missing_gpgconf_fails_fast() {
    let exec = Arc::new(FakeExecutor::new());
    let counted = Counted::new();

    let handle = dispatcher(exec.clone(), 3, Arc::new(RuntimeValues::new()))
        .reset_configures(counted.callback());
    assert_eq!(counted.calls(), 1);

    let outcome = handle.finished().await;
    assert!(!outcome.success);
    assert!(outcome.error.is_some());
    assert_eq!(exec.call_count(), 0);
}

#[tokio::test]
async fn restart_without_gpgconf_fails_fast() {
    let exec = Arc::new(FakeExecutor::new());
    let counted = Counted::new();

    let handle = dispatcher(exec.clone(), 3, Arc::new(RuntimeValues::new()))
        .restart_all(counted.callback());
    assert_eq!(counted.calls(), 1);

    let outcome = handle.finished().await;
    assert_eq!(outcome.operation, "restart_all");
    assert!(!outcome.success);
    assert!(outcome.error.is_some());
    assert_eq!(exec.call_count(), 0);
}

#[tokio::test]
async fn out_of_order_completion_keeps_slot_identity() {
    // Channel 2 finishes first, channel 0 last.
    let exec = Arc::new(
        FakeExecutor::new()
            .with(H0, exit(10, 60))
            .with(H1, exit(11, 30))
            .with(H2, exit(12, 0)),
    );
    let counted = Counted::new();

    let outcome = dispatcher(exec.clone(), 3, runtime_with_gpgconf())
        .reload_components(counted.callback())
        .finished()
        .await;

    assert_eq!(counted.calls(), 1);
    let got: Vec<(i32, i32)> = outcome
        .results
        .iter()
        .map(|r| (r.channel, r.exit_code))
        .collect();
    assert_eq!(got, vec![(0, 10), (1, 11), (2, 12)]);

    let ends: Vec<String> = exec
        .log()
        .into_iter()
        .filter(|l| l.starts_with("end"))
        .collect();
    assert!(ends[0].ends_with(H2));
    assert!(ends[2].ends_with(H0));
}

#[tokio::test]
async fn restart_kills_everything_before_launching() {
    common::init_tracing();
    let exec = Arc::new(
        FakeExecutor::new()
            .with(H0, exit(0, 40))
            .with(H1, Behavior::SpawnFails)
            .with(H2, exit(0, 10)),
    );
    let counted = Counted::new();

    let outcome = dispatcher(exec.clone(), 3, runtime_with_gpgconf())
        .restart_all(counted.callback())
        .finished()
        .await;

    assert_eq!(outcome.operation, "restart_all");
    assert_eq!(counted.calls(), 1);

    let log = exec.log();
    let last_kill = log
        .iter()
        .rposition(|l| l.contains("--kill all"))
        .unwrap();
    let first_launch = log
        .iter()
        .position(|l| l.contains("--launch all"))
        .unwrap();
    assert!(last_kill < first_launch, "{log:#?}");

    let launches = exec
        .calls
        .lock()
        .unwrap()
        .iter()
        .filter(|s| s.args.contains(&"--launch".to_string()))
        .count();
    assert_eq!(launches, 3);
}

#[tokio::test]
async fn cancel_records_cancelled_slots_and_fires_once() {
    common::init_tracing();
    let exec = Arc::new(
        FakeExecutor::new()
            .with(H0, exit(0, 0))
            .with(H1, Behavior::Hang)
            .with(H2, Behavior::Hang),
    );
    let counted = Counted::new();

    let handle = dispatcher(exec, 3, runtime_with_gpgconf()).launch_all(counted.callback());
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(5), handle.finished())
        .await
        .expect("cancelled dispatch must still complete");

    assert!(outcome.cancelled);
    assert!(!outcome.success);
    let codes: Vec<i32> = outcome.results.iter().map(|r| r.exit_code).collect();
    assert_eq!(codes, vec![0, EXIT_CANCELLED, EXIT_CANCELLED]);
    assert_eq!(counted.calls(), 1);
}

#[tokio::test]
async fn cancelled_restart_never_launches() {
    common::init_tracing();
    for _ in 0..10 {
        let exec = Arc::new(
            FakeExecutor::new()
                .with(H0, Behavior::Hang)
                .with(H1, Behavior::Hang)
                .with(H2, Behavior::Hang),
        );
        let counted = Counted::new();

        let handle =
            dispatcher(exec.clone(), 3, runtime_with_gpgconf()).restart_all(counted.callback());
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(5), handle.finished())
            .await
            .expect("cancelled restart must still complete");
        // Give any stray launch task a chance to run.
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(outcome.cancelled);
        assert!(!outcome.success);
        assert_eq!(outcome.operation, "restart_all");
        assert_eq!(counted.calls(), 1);
        let launches = exec
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.args.contains(&"--launch".to_string()))
            .count();
        assert_eq!(launches, 0, "{:#?}", exec.log());
    }
}
