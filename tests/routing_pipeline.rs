//! Integration tests for the routing pipeline assembled from configuration.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::TestServer;
use termrd::Pipeline;
use termrd::config::Config;
use termrd::console::{CONSOLE_SENDER, run_console};
use termrd::license::License;
use termrd_proto::{CorrelatedOutput, DEMO_APPLICATION_ID, ErrorCode, TerminalRequest};
use tokio_util::sync::CancellationToken;

fn pipeline(config: &Config) -> (Pipeline, CancellationToken) {
    let shutdown = CancellationToken::new();
    let pipeline = Pipeline::build(config, &shutdown).expect("pipeline builds");
    (pipeline, shutdown)
}

#[tokio::test]
async fn test_happy_path_observes_version_option() {
    let (pipeline, _shutdown) = pipeline(&TestServer::config());
    let output = pipeline
        .dispatcher
        .submit(TerminalRequest::new("1", "test -v"), &CancellationToken::new())
        .await;

    assert_eq!(output.request_id, "1");
    assert!(output.result.success);
    let payload = output.result.payload.unwrap();
    assert_eq!(payload["version"], termrd::handlers::builtin::VERSION);
}

#[tokio::test]
async fn test_missing_license_fails_every_request() {
    let mut config = TestServer::config();
    config.license.key = Some(String::new());
    let (pipeline, _shutdown) = pipeline(&config);

    let output = pipeline
        .dispatcher
        .submit(TerminalRequest::new("1", "test --version"), &CancellationToken::new())
        .await;
    assert_eq!(output.result.error_code(), Some(ErrorCode::InvalidLicense));
}

#[tokio::test]
async fn test_license_for_other_application_is_rejected() {
    let mut config = TestServer::config();
    let foreign = License::new("some-other-app", "acme");
    config.license.key = Some(foreign.encode().unwrap());
    let (pipeline, _shutdown) = pipeline(&config);

    let output = pipeline
        .dispatcher
        .submit(TerminalRequest::new("1", "ping"), &CancellationToken::new())
        .await;
    assert_eq!(output.result.error_code(), Some(ErrorCode::InvalidLicense));
}

#[tokio::test]
async fn test_license_file_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("license.key");
    let license = License::new(DEMO_APPLICATION_ID, "file-tenant");
    std::fs::write(&path, license.encode().unwrap()).unwrap();

    let mut config = TestServer::config();
    config.license.key = None;
    config.license.path = Some(path.display().to_string());
    let (pipeline, _shutdown) = pipeline(&config);

    let output = pipeline
        .dispatcher
        .submit(TerminalRequest::new("1", "server license info"), &CancellationToken::new())
        .await;
    assert_eq!(output.result.payload.unwrap()["tenant"], "file-tenant");
}

#[tokio::test]
async fn test_duplicate_option_scenario() {
    let (pipeline, _shutdown) = pipeline(&TestServer::config());
    let output = pipeline
        .dispatcher
        .submit(TerminalRequest::new("1", "test --opt1 a --opt1 b"), &CancellationToken::new())
        .await;
    assert_eq!(output.result.error_code(), Some(ErrorCode::DuplicateOption));
}

#[tokio::test]
async fn test_router_timeout_cancels_only_that_request() {
    let mut config = TestServer::config();
    config.router.timeout_ms = 50;
    config.router.workers = 1;
    let (pipeline, _shutdown) = pipeline(&config);

    let outputs = pipeline
        .dispatcher
        .submit_batch(
            vec![
                TerminalRequest::new("slow", "sleep 10000"),
                TerminalRequest::new("fast", "ping"),
            ],
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(outputs[0].result.error_code(), Some(ErrorCode::RequestCanceled));
    assert!(outputs[1].result.success);
}

#[tokio::test]
async fn test_cancellation_then_queue_keeps_serving() {
    let (pipeline, _shutdown) = pipeline(&TestServer::config());
    let dispatcher = Arc::clone(&pipeline.dispatcher);

    let cancel = CancellationToken::new();
    let slow = {
        let dispatcher = Arc::clone(&dispatcher);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            dispatcher
                .submit(TerminalRequest::new("1", "sleep 30000"), &cancel)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    cancel.cancel();

    let canceled = slow.await.unwrap();
    assert_eq!(canceled.result.error_code(), Some(ErrorCode::RequestCanceled));

    let next = dispatcher
        .submit(TerminalRequest::new("2", "ping"), &CancellationToken::new())
        .await;
    assert!(next.result.success);
}

#[tokio::test]
async fn test_same_sender_order_preserved() {
    let mut config = TestServer::config();
    config.router.workers = 1;
    let (pipeline, _shutdown) = pipeline(&config);

    let requests: Vec<_> = (1..=3)
        .map(|i| TerminalRequest::new(format!("r{i}"), format!("test -c {i}")).with_sender("S", "here"))
        .collect();
    let outputs = pipeline
        .dispatcher
        .submit_batch(requests, &CancellationToken::new())
        .await;

    let counts: Vec<i64> = outputs
        .iter()
        .map(|o| o.result.payload.as_ref().unwrap()["count"].as_i64().unwrap())
        .collect();
    assert_eq!(counts, [1, 2, 3]);
}

#[tokio::test]
async fn test_console_prints_one_output_per_line() {
    let (pipeline, shutdown) = pipeline(&TestServer::config());
    let input: &[u8] = b"ping\r\nserver\n\n";
    let mut output = Vec::new();

    run_console(input, &mut output, Arc::clone(&pipeline.dispatcher), 1024, shutdown)
        .await
        .unwrap();

    let lines: Vec<CorrelatedOutput> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].result.payload, Some(serde_json::json!("pong")));
    assert_eq!(lines[1].request_id, "2");
    assert_eq!(lines[2].result.error_code(), Some(ErrorCode::MissingCommand));
    assert!(lines.iter().all(|l| l.sender_id.as_deref() == Some(CONSOLE_SENDER)));
}

#[tokio::test]
async fn test_console_rejects_lines_over_message_limit() {
    let (pipeline, shutdown) = pipeline(&TestServer::config());
    let mut input = Vec::new();
    input.extend_from_slice(format!("test -o {}\n", "x".repeat(24)).as_bytes());
    // Over the character limit, and far over the line codec's byte bound
    input.extend_from_slice(format!("{}\n", "y".repeat(500)).as_bytes());
    input.extend_from_slice(b"ping\n");
    let mut output = Vec::new();

    run_console(&input[..], &mut output, Arc::clone(&pipeline.dispatcher), 16, shutdown)
        .await
        .unwrap();

    let lines: Vec<CorrelatedOutput> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].request_id, "1");
    assert_eq!(lines[0].result.error_code(), Some(ErrorCode::InvalidRequest));
    assert_eq!(lines[1].request_id, "2");
    assert_eq!(lines[1].result.error_code(), Some(ErrorCode::InvalidRequest));
    assert_eq!(lines[2].result.payload, Some(serde_json::json!("pong")));
}

#[tokio::test]
async fn test_pipeline_requires_license_source() {
    let mut config = TestServer::config();
    config.license.key = None;
    let shutdown = CancellationToken::new();
    assert!(Pipeline::build(&config, &shutdown).is_err());
}
