use std::path::{Path, PathBuf};
use std::time::Duration;

use service_lifecycle::framework::mock::{CallKind, CallLog, CapturingSink, RecordingService};
use service_lifecycle::framework::{AppError, Service};
use service_lifecycle::lifecycle::{PidFile, ShutdownReason};
use service_lifecycle::{App, AppConfig};
use std::sync::Arc;
use tracing::Level;

const PROCESS_BASE: &str = "lifecycle-test";

fn config(pid_dir: &Path, sink: &CapturingSink) -> AppConfig {
    AppConfig::new()
        .with_cluster("world100")
        .with_index(1)
        .with_pid_dir(pid_dir)
        .with_process_base(PROCESS_BASE)
        .with_signal_handling(false)
        .with_sink(Arc::new(sink.clone()))
}

fn pid_path(pid_dir: &Path) -> PathBuf {
    PidFile::new(pid_dir).path_for(&format!("{PROCESS_BASE}1"))
}

async fn wait_for_file(path: &Path) {
    for _ in 0..500 {
        if path.exists() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never appeared", path.display());
}

fn boxed(services: Vec<RecordingService>) -> Vec<Box<dyn Service>> {
    services
        .into_iter()
        .map(|s| Box::new(s) as Box<dyn Service>)
        .collect()
}

/// No-op service; stop is requested once the wait phase has written the pid marker.
#[tokio::test]
async fn test_stop_signal_during_wait_runs_close_and_fini_once() {
    let dir = tempfile::tempdir().unwrap();
    let sink = CapturingSink::new();
    let log = CallLog::new();

    let mut app = App::new();
    app.init(config(dir.path(), &sink).with_signal_handling(true))
        .unwrap();
    let shutdown = app.shutdown_handle();
    let run = tokio::spawn(app.run(boxed(vec![RecordingService::new("noop", &log)])));

    let pid_file = pid_path(dir.path());
    wait_for_file(&pid_file).await;
    assert_eq!(
        PidFile::new(dir.path()).read(&format!("{PROCESS_BASE}1")).unwrap(),
        std::process::id()
    );
    assert_eq!(log.count(CallKind::Close, "noop"), 0);

    shutdown.trigger(ShutdownReason::Interrupt);
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("run should return")
        .unwrap()
        .unwrap();

    assert_eq!(log.count(CallKind::Init, "noop"), 1);
    assert_eq!(log.count(CallKind::Serve, "noop"), 1);
    assert_eq!(log.count(CallKind::Close, "noop"), 1);
    assert_eq!(log.count(CallKind::Fini, "noop"), 1);
    assert!(!pid_file.exists());
    assert!(sink.contains(Level::INFO, "[App] graceful shutdown... (interrupt)"));
}

#[tokio::test]
async fn test_second_init_failure_aborts_without_teardown() {
    let dir = tempfile::tempdir().unwrap();
    let sink = CapturingSink::new();
    let log = CallLog::new();

    let mut app = App::new();
    app.init(config(dir.path(), &sink)).unwrap();
    let err = app
        .run(boxed(vec![
            RecordingService::new("first", &log),
            RecordingService::new("second", &log).fail_init("port in use"),
        ]))
        .await
        .unwrap_err();

    match &err {
        AppError::ServiceInit { service, source } => {
            assert_eq!(service, "second");
            assert_eq!(source.to_string(), "port in use");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(log.services_for(CallKind::Init), ["first", "second"]);
    assert!(log.services_for(CallKind::Serve).is_empty());
    assert_eq!(log.count(CallKind::Close, "first"), 0);
    assert_eq!(log.count(CallKind::Fini, "first"), 0);
    assert!(!pid_path(dir.path()).exists());
}

#[tokio::test]
async fn test_init_stops_at_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    let sink = CapturingSink::new();
    let log = CallLog::new();

    let mut app = App::new();
    app.init(config(dir.path(), &sink)).unwrap();
    let result = app
        .run(boxed(vec![
            RecordingService::new("s0", &log),
            RecordingService::new("s1", &log),
            RecordingService::new("s2", &log).fail_init("boom"),
            RecordingService::new("s3", &log),
            RecordingService::new("s4", &log),
        ]))
        .await;

    assert_eq!(result.unwrap_err().service(), Some("s2"));
    assert_eq!(log.services_for(CallKind::Init), ["s0", "s1", "s2"]);
    assert!(sink.contains(Level::ERROR, "s2 init failed"));
}

#[tokio::test]
async fn test_serve_failure_leaves_started_services_running() {
    let dir = tempfile::tempdir().unwrap();
    let sink = CapturingSink::new();
    let log = CallLog::new();

    let mut app = App::new();
    app.init(config(dir.path(), &sink)).unwrap();
    let err = app
        .run(boxed(vec![
            RecordingService::new("a", &log),
            RecordingService::new("b", &log).fail_serve("cannot accept"),
            RecordingService::new("c", &log),
        ]))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ServiceServe { ref service, .. } if service == "b"));
    assert_eq!(log.services_for(CallKind::Init), ["a", "b", "c"]);
    assert_eq!(log.services_for(CallKind::Serve), ["a", "b"]);
    assert!(log.services_for(CallKind::Close).is_empty());
    assert!(log.services_for(CallKind::Fini).is_empty());
    assert!(!pid_path(dir.path()).exists());
}

#[tokio::test]
async fn test_finalize_runs_in_reverse_after_every_close() {
    let dir = tempfile::tempdir().unwrap();
    let sink = CapturingSink::new();
    let log = CallLog::new();

    let mut app = App::new();
    app.init(config(dir.path(), &sink)).unwrap();
    let services = boxed(vec![
        RecordingService::new("db", &log),
        RecordingService::new("cache", &log),
        RecordingService::new("rpc", &log).blocking(),
        RecordingService::new("http", &log).shutdown_on_serve(),
    ]);
    tokio::time::timeout(Duration::from_secs(5), app.run(services))
        .await
        .expect("run should return")
        .unwrap();

    assert_eq!(log.services_for(CallKind::Init), ["db", "cache", "rpc", "http"]);
    assert_eq!(log.services_for(CallKind::Serve), ["db", "cache", "rpc", "http"]);
    assert_eq!(log.services_for(CallKind::Close), ["http", "rpc", "cache", "db"]);
    assert_eq!(log.services_for(CallKind::Fini), ["http", "rpc", "cache", "db"]);

    let last_close = ["db", "cache", "rpc", "http"]
        .iter()
        .filter_map(|s| log.position(CallKind::Close, s))
        .max()
        .unwrap();
    let first_fini = ["db", "cache", "rpc", "http"]
        .iter()
        .filter_map(|s| log.position(CallKind::Fini, s))
        .min()
        .unwrap();
    assert!(last_close < first_fini);
}

#[tokio::test]
async fn test_concurrent_stop_requests_close_each_service_once() {
    let dir = tempfile::tempdir().unwrap();
    let sink = CapturingSink::new();
    let log = CallLog::new();

    let mut app = App::new();
    app.init(config(dir.path(), &sink)).unwrap();
    let shutdown = app.shutdown_handle();
    let run = tokio::spawn(app.run(boxed(vec![
        RecordingService::new("one", &log).blocking(),
        RecordingService::new("two", &log),
    ])));

    wait_for_file(&pid_path(dir.path())).await;
    let triggers: Vec<_> = [ShutdownReason::Interrupt, ShutdownReason::Terminate]
        .into_iter()
        .map(|reason| {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.trigger(reason) })
        })
        .collect();
    let mut fired = 0;
    for trigger in triggers {
        if trigger.await.unwrap() {
            fired += 1;
        }
    }
    assert_eq!(fired, 1);

    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("wait phase must not deadlock")
        .unwrap()
        .unwrap();

    for name in ["one", "two"] {
        assert_eq!(log.count(CallKind::Close, name), 1);
        assert_eq!(log.count(CallKind::Fini, name), 1);
    }
}

#[tokio::test]
async fn test_fini_errors_are_logged_not_returned() {
    let dir = tempfile::tempdir().unwrap();
    let sink = CapturingSink::new();
    let log = CallLog::new();

    let mut app = App::new();
    app.init(config(dir.path(), &sink)).unwrap();
    let result = app
        .run(boxed(vec![
            RecordingService::new("store", &log),
            RecordingService::new("flusher", &log)
                .fail_fini("flush failed")
                .shutdown_on_serve(),
        ]))
        .await;

    assert!(result.is_ok());
    assert_eq!(log.services_for(CallKind::Fini), ["flusher", "store"]);
    assert!(sink.contains(Level::ERROR, "[App] service flusher fini failed: flush failed"));
}

#[tokio::test]
async fn test_pid_marker_failure_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "x").unwrap();
    let sink = CapturingSink::new();
    let log = CallLog::new();

    let mut app = App::new();
    app.init(config(&blocker, &sink)).unwrap();
    let result = app
        .run(boxed(vec![
            RecordingService::new("only", &log).shutdown_on_serve()
        ]))
        .await;

    assert!(result.is_ok());
    assert_eq!(log.count(CallKind::Fini, "only"), 1);
    assert!(sink.contains(Level::WARN, "failed to write pid marker"));
}

#[test]
fn test_invalid_config_rejected_before_any_service() {
    let sink = CapturingSink::new();
    let log = CallLog::new();
    let _service = RecordingService::new("never", &log);

    for config in [
        AppConfig::new().with_cluster("").with_index(1),
        AppConfig::new().with_cluster("world").with_index(0),
        AppConfig::new().with_cluster("world").with_index(-4),
    ] {
        let mut app = App::new();
        let err = app
            .init(config.with_sink(Arc::new(sink.clone())))
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(!app.is_initialized());
    }
    assert!(log.calls().is_empty());
}

#[test]
fn test_run_blocking_with_worker_threads() {
    let dir = tempfile::tempdir().unwrap();
    let sink = CapturingSink::new();
    let log = CallLog::new();

    let mut app = App::new();
    app.init(config(dir.path(), &sink).with_worker_threads(2))
        .unwrap();
    app.register(RecordingService::new("sync", &log).shutdown_on_serve());

    app.run_blocking(Vec::new()).unwrap();
    assert_eq!(log.services_for(CallKind::Fini), ["sync"]);
    assert!(sink.contains(Level::INFO, "[App] App stopped."));
}
