//! End-to-end tests for the Surge engine against an in-process HTTP target.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use surge_core::{Check, CheckSet, EngineError, RateSchedule, RunConfig, Stage, StageConfig};
use surge_engine::{HttpExecutor, Orchestrator, RequestExecutor, RunState};

/// Spawns an always-200 target on an ephemeral port and returns its URL.
async fn spawn_target() -> String {
    let app = Router::new().route("/test", get(|| async { "ok" }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/test")
}

fn millis(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test]
async fn test_full_run_all_requests_pass() {
    let url = spawn_target().await;

    // The classic ramp profile, compressed for test time.
    let schedule = RateSchedule::new(vec![
        Stage::new(millis(150), 5),
        Stage::new(millis(150), 5),
        Stage::new(millis(100), 0),
    ])
    .unwrap();
    let executor: Arc<dyn RequestExecutor> = Arc::new(
        HttpExecutor::new(&url, surge_core::HttpMethod::Get, Duration::from_secs(1)).unwrap(),
    );
    let mut orchestrator = Orchestrator::new(
        schedule,
        executor,
        CheckSet::new().with(Check::status_is(200)),
        millis(10),
        millis(25),
    );

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(orchestrator.state(), RunState::Done);
    assert!(summary.total_requests > 0);
    assert_eq!(summary.total_errors, 0);
    assert_eq!(summary.checks.len(), 1);
    assert_eq!(summary.checks[0].name, "status is 200");
    assert!((summary.checks[0].pass_rate() - 1.0).abs() < 1e-9);
    assert!(summary.latency.max_ms > 0.0);
}

#[tokio::test]
async fn test_run_from_config_exercises_http_path() {
    let url = spawn_target().await;

    let config = RunConfig {
        target_url: url,
        think_time_secs: 0.01,
        request_timeout_secs: 1.0,
        tick_interval_secs: 0.025,
        stages: vec![StageConfig {
            duration_secs: 0.2,
            target: 4,
        }],
        ..RunConfig::default()
    };
    let checks = CheckSet::new().with(Check::status_is(200));

    let mut orchestrator = Orchestrator::from_config(&config, checks).unwrap();
    let summary = orchestrator.run().await.unwrap();

    assert!(summary.total_requests > 0);
    assert_eq!(summary.total_errors, 0);
    assert!((summary.checks[0].pass_rate() - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_unreachable_target_run_still_completes() {
    // Nothing listens on the discard port; every request must fail.
    let config = RunConfig {
        target_url: "http://127.0.0.1:9/test".to_string(),
        think_time_secs: 0.01,
        request_timeout_secs: 0.5,
        tick_interval_secs: 0.025,
        stages: vec![StageConfig {
            duration_secs: 0.2,
            target: 3,
        }],
        ..RunConfig::default()
    };
    let checks = CheckSet::new().with(Check::status_is(200));

    let mut orchestrator = Orchestrator::from_config(&config, checks).unwrap();
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(orchestrator.state(), RunState::Done);
    assert!(summary.total_requests > 0);
    assert_eq!(summary.total_errors, summary.total_requests);
    assert_eq!(summary.checks[0].passed, 0);
    assert_eq!(summary.checks[0].failed, summary.total_requests);
}

#[tokio::test]
async fn test_malformed_schedule_fails_before_any_user_spawns() {
    let config = RunConfig {
        stages: vec![StageConfig {
            duration_secs: -10.0,
            target: 10,
        }],
        ..RunConfig::default()
    };

    let err = Orchestrator::from_config(&config, CheckSet::new()).unwrap_err();
    assert!(matches!(err, EngineError::InvalidSchedule { .. }));
}
