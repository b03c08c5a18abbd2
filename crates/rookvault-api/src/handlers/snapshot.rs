//! Snapshot routes: export and upload, delete from cold storage, list stored tags.

use crate::error::HttpAppError;
use crate::handlers::{snapshot_from_segments, volume_from_segments};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use rookvault_core::{validate_segment, BackupLocation, SnapshotTag, TransferAck};
use std::sync::Arc;

/// POST /snapshot/{region}/{bucket}/{prefix}/{tag}/{pool}/{image}
///
/// Answers once the image is exported and uploaded.
#[tracing::instrument(skip(state), fields(operation = "create_snapshot"))]
pub async fn create_snapshot(
    State(state): State<Arc<AppState>>,
    Path((region, bucket, prefix, tag, pool, image)): Path<(
        String,
        String,
        String,
        String,
        String,
        String,
    )>,
) -> Result<Json<TransferAck>, HttpAppError> {
    let location = BackupLocation::from_path_segments(&region, &bucket, &prefix)?;
    let snapshot = snapshot_from_segments(&tag, &pool, &image)?;

    let ack = state.pipeline.backup(&location, &snapshot).await?;
    Ok(Json(ack))
}

/// DELETE /snapshot/{region}/{bucket}/{prefix}/{tag}/{pool}
#[tracing::instrument(skip(state), fields(operation = "delete_snapshot"))]
pub async fn delete_snapshot(
    State(state): State<Arc<AppState>>,
    Path((region, bucket, prefix, tag, pool)): Path<(String, String, String, String, String)>,
) -> Result<Json<TransferAck>, HttpAppError> {
    let location = BackupLocation::from_path_segments(&region, &bucket, &prefix)?;
    let tag = SnapshotTag::parse(&tag)?;
    validate_segment("pool", &pool)?;

    let ack = state.pipeline.delete(&location, &tag, &pool).await?;
    Ok(Json(ack))
}

/// GET /snapshot/{region}/{bucket}/{prefix}/{pool}/{image}
#[tracing::instrument(skip(state), fields(operation = "list_snapshots"))]
pub async fn list_snapshots(
    State(state): State<Arc<AppState>>,
    Path((region, bucket, prefix, pool, image)): Path<(String, String, String, String, String)>,
) -> Result<Json<Vec<String>>, HttpAppError> {
    let location = BackupLocation::from_path_segments(&region, &bucket, &prefix)?;
    let volume = volume_from_segments(&pool, &image)?;

    let tags = state.pipeline.list_backups(&location, &volume).await?;
    Ok(Json(tags))
}
