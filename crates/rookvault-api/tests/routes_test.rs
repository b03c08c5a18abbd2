use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use rookvault_api::setup::routes::setup_routes;
use rookvault_api::{AppState, ErrorResponse};
use rookvault_core::{ServiceConfig, TransferAck};
use rookvault_transfer::test_helpers::FakeRunner;
use rookvault_transfer::{StageKind, StageOutput, TransferPipeline, Workspace};
use std::sync::Arc;
use tempfile::TempDir;

struct TestApp {
    server: TestServer,
    runner: FakeRunner,
    work_dir: TempDir,
}

fn app() -> TestApp {
    let work_dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new();
    let config = ServiceConfig {
        work_dir: work_dir.path().to_path_buf(),
        ..ServiceConfig::default()
    };
    let pipeline = TransferPipeline::new(
        Arc::new(runner.clone()),
        Workspace::new(work_dir.path()),
    );
    let state = Arc::new(AppState::new(config.clone(), pipeline));
    let server = TestServer::new(setup_routes(&config, state)).unwrap();

    TestApp {
        server,
        runner,
        work_dir,
    }
}

#[tokio::test]
async fn banner_and_health() {
    let app = app();

    let response = app.server.get("/").await;
    response.assert_status_ok();
    response.assert_text("Hello, welcome to rookvault!");

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&serde_json::json!({ "status": "alive" }));
}

#[tokio::test]
async fn create_snapshot_runs_export_and_upload() {
    let app = app();

    let response = app
        .server
        .post("/snapshot/us-east-1/backups/cluster%2Fa/t1/replicapool/pvc-1")
        .await;

    response.assert_status_ok();
    let ack: TransferAck = response.json();
    assert_eq!(ack.object, "s3://backups/cluster/a/t1/replicapool/pvc-1");
    assert_eq!(app.runner.kinds(), vec![StageKind::Export, StageKind::Upload]);
    assert!(!app.work_dir.path().join("t1/replicapool/pvc-1").exists());
}

#[tokio::test]
async fn stage_failure_returns_500_with_output() {
    let app = app();
    app.runner.fail(
        StageKind::Export,
        "rbd: error opening image pvc-1: (2) No such file or directory",
    );

    let response = app
        .server
        .post("/snapshot/us-east-1/backups/-/t1/replicapool/pvc-1")
        .expect_failure()
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "EXPORT_FAILED");
    assert!(body.error.contains("No such file or directory"));
    assert_eq!(app.runner.count(StageKind::Upload), 0);
}

#[tokio::test]
async fn restore_runs_download_and_import() {
    let app = app();

    let response = app
        .server
        .post("/block/us-east-1/backups/-/t1/replicapool/pvc-1")
        .await;

    response.assert_status_ok();
    assert_eq!(app.runner.kinds(), vec![StageKind::Download, StageKind::Import]);
    assert_eq!(
        app.runner.calls()[0].args[2],
        "s3://backups/t1/replicapool/pvc-1"
    );
}

#[tokio::test]
async fn delete_snapshot_removes_tag_and_pool() {
    let app = app();

    let response = app
        .server
        .delete("/snapshot/us-east-1/backups/-/t1/replicapool")
        .await;

    response.assert_status_ok();
    let ack: TransferAck = response.json();
    assert_eq!(ack.object, "s3://backups/t1/replicapool");
    assert_eq!(ack.image, None);
    assert_eq!(app.runner.kinds(), vec![StageKind::Delete]);
}

#[tokio::test]
async fn list_snapshots_reads_pool_and_image() {
    let app = app();
    app.runner.respond(
        StageKind::ListObjects,
        StageOutput::success("2024-05-01 10:00:00   1048576 t1/replicapool/pvc-1\n"),
    );

    let response = app
        .server
        .get("/snapshot/us-east-1/backups/-/replicapool/pvc-1")
        .await;

    response.assert_status_ok();
    response.assert_json(&serde_json::json!(["t1"]));
}

#[tokio::test]
async fn block_listings() {
    let app = app();
    app.runner
        .respond(StageKind::ListImages, StageOutput::success(r#"["pvc-1"]"#))
        .respond(
            StageKind::ImageInfo,
            StageOutput::success(r#"{"name":"pvc-1","size":2048}"#),
        );

    let response = app.server.get("/block/replicapool").await;
    response.assert_status_ok();
    response.assert_json(&serde_json::json!(["pvc-1"]));

    let response = app.server.get("/block/replicapool/pvc-1").await;
    response.assert_status_ok();
    response.assert_json(&serde_json::json!(2048));
}

#[tokio::test]
async fn missing_image_is_404() {
    let app = app();
    app.runner.fail(
        StageKind::ImageInfo,
        "rbd: error opening image pvc-9: (2) No such file or directory",
    );

    let response = app
        .server
        .get("/block/replicapool/pvc-9")
        .expect_failure()
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unsafe_segments_are_rejected_before_any_stage() {
    let app = app();

    for path in [
        "/snapshot/us-east-1/backups/-/t1/a%2Fb/pvc-1",
        "/snapshot/us-east-1/backups/-/t1/replicapool/pvc%7C%7C1",
        "/block/us-east-1/backups/a%2F..%2Fb/t1/replicapool/pvc-1",
    ] {
        let response = app.server.post(path).expect_failure().await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "MALFORMED_IDENTIFIER", "{path}");
    }

    assert!(app.runner.calls().is_empty());
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = app();

    let response = app
        .server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("backup-42"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "backup-42");

    let response = app.server.get("/health").await;
    assert!(!response.header("x-request-id").is_empty());
}
