//! End-to-end watch tests: real client, mock Zencoder server.

use std::time::Duration;

use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zencoder_client::{ClientConfig, ClientError, ZencoderClient};
use zencoder_models::{JobId, JobSpec};
use zencoder_watch::{WatchConfig, WatchEngine, WatchError};

fn engine_for(server: &MockServer) -> WatchEngine {
    let client = ZencoderClient::new(ClientConfig::new("test-key").with_host(server.uri())).unwrap();
    let config = WatchConfig {
        tick_interval: Duration::from_millis(10),
        max_poll_failures: 3,
        ..WatchConfig::default()
    };
    WatchEngine::with_client(client, config)
}

async fn mount_progress(server: &MockServer, id: &str, state: &str, times: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path(format!("/api/v2/jobs/{}/progress.json", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": state })));
    let mock = match times {
        Some(n) => mock.up_to_n_times(n),
        None => mock,
    };
    mock.mount(server).await;
}

async fn mount_details(server: &MockServer, id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v2/jobs/{}.json", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job": {
                "id": id.parse::<u64>().unwrap(),
                "state": "finished",
                "output_media_files": [{ "url": "s3://bucket/out.mp4" }]
            }
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_watch_follows_job_to_completion() {
    let server = MockServer::start().await;
    mount_progress(&server, "77", "waiting", Some(1)).await;
    mount_progress(&server, "77", "processing", Some(1)).await;
    mount_progress(&server, "77", "finished", None).await;
    mount_details(&server, "77").await;

    let engine = engine_for(&server);
    let handle = assert_ok!(engine.watch_handle(JobId::from("77")));

    assert_eq!(engine.tick().await.requeued, 1);
    assert_eq!(engine.tick().await.requeued, 1);
    assert_eq!(engine.tick().await.completed, 1);

    let details = assert_ok!(handle.await);
    assert_eq!(details.id().as_str(), "77");
    assert_eq!(
        details.get("output_media_files").unwrap()[0]["url"],
        "s3://bucket/out.mp4"
    );
}

#[tokio::test]
async fn test_failed_job_reports_job_failed() {
    let server = MockServer::start().await;
    mount_progress(&server, "78", "failed", None).await;

    let engine = engine_for(&server);
    let handle = engine.watch_handle(JobId::from("78")).unwrap();
    engine.tick().await;

    let err = assert_err!(handle.await);
    assert!(matches!(err, WatchError::JobFailed(_)));
    assert_eq!(err.to_string(), "Job Failed");
}

#[tokio::test]
async fn test_missing_job_reports_client_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/jobs/79/progress.json"))
        .respond_with(ResponseTemplate::new(404).set_body_string("{\"errors\":[\"not found\"]}"))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let handle = engine.watch_handle(JobId::from("79")).unwrap();
    engine.tick().await;
    engine.tick().await;

    match handle.await {
        Err(WatchError::Client(ClientError::Api { code, message, .. })) => {
            assert_eq!(code, 404);
            assert!(message.contains("not found"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/jobs/80/progress.json"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_progress(&server, "80", "finished", None).await;
    mount_details(&server, "80").await;

    let engine = engine_for(&server);
    let handle = engine.watch_handle(JobId::from("80")).unwrap();
    for _ in 0..3 {
        engine.tick().await;
    }

    assert_ok!(handle.await);
}

#[tokio::test]
async fn test_rewatch_while_running_is_refused() {
    let server = MockServer::start().await;
    mount_progress(&server, "82", "processing", None).await;

    let engine = engine_for(&server);
    assert_ok!(engine.watch(JobId::from("82"), |_| {}));
    engine.tick().await;

    let err = assert_err!(engine.watch_handle(JobId::from("82")));
    assert!(matches!(err, WatchError::AlreadyWatched(_)));
}

#[tokio::test]
async fn test_create_and_watch_with_running_timer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/jobs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 81 })))
        .expect(1)
        .mount(&server)
        .await;
    mount_progress(&server, "81", "processing", Some(2)).await;
    mount_progress(&server, "81", "finished", None).await;
    mount_details(&server, "81").await;

    let engine = engine_for(&server);
    engine.start();

    let handle = engine
        .create_job_handle(&JobSpec::new("s3://bucket/in.mov"))
        .await
        .unwrap();
    assert_eq!(handle.job_id().as_str(), "81");

    let details = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("job should complete")
        .unwrap();
    assert_eq!(details.id().as_str(), "81");

    engine.stop().await;
    assert!(!engine.is_running());
}
