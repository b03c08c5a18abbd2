use rookvault_core::{AppError, BackupLocation, SnapshotId, SnapshotTag, VolumeId};
use rookvault_transfer::test_helpers::FakeRunner;
use rookvault_transfer::{StageKind, StageOutput, TransferPipeline, Workspace};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn setup() -> (TempDir, FakeRunner, TransferPipeline) {
    let tmp = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new();
    let pipeline = TransferPipeline::new(Arc::new(runner.clone()), Workspace::new(tmp.path()));
    (tmp, runner, pipeline)
}

fn location() -> BackupLocation {
    BackupLocation::new("us-east-1", "backups", "cluster-a")
}

fn snapshot(tag: &str) -> SnapshotId {
    SnapshotId::new(
        VolumeId::new("replicapool", "pvc-1"),
        SnapshotTag::parse(tag).unwrap(),
    )
}

#[tokio::test]
async fn backup_exports_then_uploads_and_cleans_up() {
    let (tmp, runner, pipeline) = setup();

    let ack = pipeline.backup(&location(), &snapshot("t1")).await.unwrap();

    assert_eq!(runner.kinds(), vec![StageKind::Export, StageKind::Upload]);
    let file = tmp.path().join("t1/replicapool/pvc-1");
    let file = file.to_string_lossy().to_string();

    let calls = runner.calls();
    assert_eq!(calls[0].args, vec!["export", "replicapool/pvc-1", file.as_str()]);
    assert_eq!(
        calls[1].args,
        vec![
            "s3",
            "cp",
            file.as_str(),
            "s3://backups/cluster-a/t1/replicapool/pvc-1",
            "--region",
            "us-east-1",
        ]
    );

    assert_eq!(ack.object, "s3://backups/cluster-a/t1/replicapool/pvc-1");
    assert_eq!(ack.image.as_deref(), Some("pvc-1"));
    assert!(!tmp.path().join("t1/replicapool/pvc-1").exists());
    assert!(tmp.path().join("t1/replicapool").is_dir());
}

#[tokio::test]
async fn upload_failure_keeps_the_export() {
    let (tmp, runner, pipeline) = setup();
    runner.fail(StageKind::Upload, "upload failed: Access Denied");

    let err = pipeline.backup(&location(), &snapshot("t1")).await.unwrap_err();

    assert!(matches!(err, AppError::UploadFailed { .. }));
    assert_eq!(err.stage_output(), Some("upload failed: Access Denied"));
    assert!(tmp.path().join("t1/replicapool/pvc-1").exists());
}

#[tokio::test]
async fn export_failure_skips_upload() {
    let (_tmp, runner, pipeline) = setup();
    runner.fail(StageKind::Export, "rbd: error opening image pvc-1");

    let err = pipeline.backup(&location(), &snapshot("t1")).await.unwrap_err();

    assert!(matches!(err, AppError::ExportFailed { .. }));
    assert_eq!(runner.count(StageKind::Upload), 0);
}

#[tokio::test]
async fn workspace_failure_runs_no_stage() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("work");
    std::fs::write(&blocker, b"file in the way").unwrap();

    let runner = FakeRunner::new();
    let pipeline = TransferPipeline::new(Arc::new(runner.clone()), Workspace::new(&blocker));

    let err = pipeline.backup(&location(), &snapshot("t1")).await.unwrap_err();

    assert!(matches!(err, AppError::Workspace { .. }));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn restore_downloads_then_imports() {
    let (tmp, runner, pipeline) = setup();

    let ack = pipeline.restore(&location(), &snapshot("t1")).await.unwrap();

    assert_eq!(runner.kinds(), vec![StageKind::Download, StageKind::Import]);
    let file = tmp.path().join("t1/replicapool/pvc-1");
    let file = file.to_string_lossy().to_string();
    let calls = runner.calls();
    assert_eq!(calls[0].args[2], "s3://backups/cluster-a/t1/replicapool/pvc-1");
    assert_eq!(calls[0].args[3], file);
    assert_eq!(calls[1].args, vec!["import", file.as_str(), "replicapool/pvc-1"]);
    assert_eq!(ack.tag, "t1");
    assert!(!tmp.path().join("t1/replicapool/pvc-1").exists());
}

#[tokio::test]
async fn download_failure_never_imports() {
    let (_tmp, runner, pipeline) = setup();
    runner.fail(StageKind::Download, "fatal error: An error occurred (404)");

    let err = pipeline.restore(&location(), &snapshot("t1")).await.unwrap_err();

    assert!(matches!(err, AppError::DownloadFailed { .. }));
    assert_eq!(runner.count(StageKind::Import), 0);
}

#[tokio::test]
async fn import_failure_keeps_the_download() {
    let (tmp, runner, pipeline) = setup();
    runner.fail(StageKind::Import, "rbd: image creation failed");

    let err = pipeline.restore(&location(), &snapshot("t1")).await.unwrap_err();

    assert!(matches!(err, AppError::ImportFailed { .. }));
    let kept = std::fs::read(tmp.path().join("t1/replicapool/pvc-1")).unwrap();
    assert_eq!(kept, b"image-bytes");
}

#[tokio::test]
async fn successful_retry_removes_the_kept_download() {
    let (tmp, runner, pipeline) = setup();
    let file = tmp.path().join("t1/replicapool/pvc-1");

    runner.fail(StageKind::Import, "rbd: image creation failed");
    pipeline.restore(&location(), &snapshot("t1")).await.unwrap_err();
    assert!(file.is_file());

    runner.respond(StageKind::Import, StageOutput::success(""));
    pipeline.restore(&location(), &snapshot("t1")).await.unwrap();

    assert!(!file.exists());
    assert_eq!(
        std::fs::read_dir(tmp.path().join("t1/replicapool")).unwrap().count(),
        0
    );
}

#[tokio::test]
async fn delete_removes_tag_and_pool_recursively() {
    let (_tmp, runner, pipeline) = setup();
    let tag = SnapshotTag::parse("t1").unwrap();

    let ack = pipeline.delete(&location(), &tag, "replicapool").await.unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, StageKind::Delete);
    assert_eq!(
        calls[0].args,
        vec![
            "s3",
            "rm",
            "s3://backups/cluster-a/t1/replicapool",
            "--recursive",
            "--region",
            "us-east-1",
        ]
    );
    assert_eq!(ack.image, None);
}

#[tokio::test]
async fn delete_failure_is_reported() {
    let (_tmp, runner, pipeline) = setup();
    runner.fail(StageKind::Delete, "delete failed");
    let tag = SnapshotTag::parse("t1").unwrap();

    let err = pipeline.delete(&location(), &tag, "replicapool").await.unwrap_err();
    assert!(matches!(err, AppError::DeleteFailed { .. }));
}

#[tokio::test]
async fn list_backups_parses_object_listing() {
    let (_tmp, runner, pipeline) = setup();
    runner.respond(
        StageKind::ListObjects,
        StageOutput::success(
            "2024-05-01 10:00:00   1048576 cluster-a/t2/replicapool/pvc-1\n\
             2024-05-01 10:00:00   1048576 cluster-a/t1/replicapool/pvc-1\n\
             2024-05-01 10:00:00   1048576 cluster-a/t1/replicapool/pvc-2\n",
        ),
    );

    let tags = pipeline
        .list_backups(&location(), &VolumeId::new("replicapool", "pvc-1"))
        .await
        .unwrap();

    assert_eq!(tags, vec!["t1", "t2"]);
    assert_eq!(runner.calls()[0].args[2], "s3://backups/cluster-a/");
}

#[tokio::test]
async fn list_backups_of_empty_prefix_is_empty() {
    let (_tmp, runner, pipeline) = setup();
    runner.respond(StageKind::ListObjects, StageOutput::failure(Some(1), ""));

    let tags = pipeline
        .list_backups(&location(), &VolumeId::new("replicapool", "pvc-1"))
        .await
        .unwrap();
    assert!(tags.is_empty());
}

#[tokio::test]
async fn list_images_and_size() {
    let (_tmp, runner, pipeline) = setup();
    runner
        .respond(StageKind::ListImages, StageOutput::success(r#"["pvc-1","pvc-2"]"#))
        .respond(
            StageKind::ImageInfo,
            StageOutput::success(r#"{"name":"pvc-1","size":1073741824}"#),
        );

    let images = pipeline.list_images("replicapool").await.unwrap();
    assert_eq!(images, vec!["pvc-1", "pvc-2"]);

    let size = pipeline
        .image_size(&VolumeId::new("replicapool", "pvc-1"))
        .await
        .unwrap();
    assert_eq!(size, 1_073_741_824);
    assert_eq!(
        runner.calls()[1].args,
        vec!["info", "replicapool/pvc-1", "--format", "json"]
    );
}

#[tokio::test]
async fn image_info_failures() {
    let (_tmp, runner, pipeline) = setup();
    runner.fail(
        StageKind::ImageInfo,
        "rbd: error opening image pvc-9: (2) No such file or directory",
    );

    let err = pipeline
        .image_size(&VolumeId::new("replicapool", "pvc-9"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    runner.fail(StageKind::ImageInfo, "rbd: couldn't connect to the cluster!");
    let err = pipeline
        .image_size(&VolumeId::new("replicapool", "pvc-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ListFailed { .. }));
}

#[tokio::test]
async fn unsafe_segments_are_rejected_before_any_stage() {
    let (_tmp, runner, pipeline) = setup();
    let bad = SnapshotId::new(
        VolumeId::new("..", "pvc-1"),
        SnapshotTag::parse("t1").unwrap(),
    );

    let err = pipeline.backup(&location(), &bad).await.unwrap_err();
    assert!(matches!(err, AppError::MalformedIdentifier(_)));

    let err = pipeline.list_images("a/b").await.unwrap_err();
    assert!(matches!(err, AppError::MalformedIdentifier(_)));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn same_key_operations_never_overlap() {
    let (_tmp, runner, pipeline) = setup();
    runner.with_delay(Duration::from_millis(20));

    let a = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.backup(&location(), &snapshot("t1")).await })
    };
    let b = {
        let pipeline = pipeline.clone();
        let other_image = SnapshotId::new(
            VolumeId::new("replicapool", "pvc-2"),
            SnapshotTag::parse("t1").unwrap(),
        );
        tokio::spawn(async move { pipeline.backup(&location(), &other_image).await })
    };

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert_eq!(runner.calls().len(), 4);
    assert_eq!(runner.max_in_flight(), 1);
}

#[tokio::test]
async fn different_keys_run_in_parallel() {
    let (_tmp, runner, pipeline) = setup();
    runner.with_delay(Duration::from_millis(100));

    let (loc, first, second) = (location(), snapshot("t1"), snapshot("t2"));
    let (a, b) = tokio::join!(
        pipeline.backup(&loc, &first),
        pipeline.backup(&loc, &second),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(runner.max_in_flight(), 2);
}

#[tokio::test]
async fn bootstrap_failure_is_an_error() {
    let (_tmp, runner, pipeline) = setup();
    pipeline.bootstrap().await.unwrap();

    runner.fail(StageKind::Bootstrap, "toolbox: no monitors");
    let err = pipeline.bootstrap().await.unwrap_err();
    assert!(err.detailed_message().contains("no monitors"));
}
