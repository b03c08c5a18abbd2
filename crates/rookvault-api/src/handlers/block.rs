//! Block routes: restore into the cluster, list images, image size.

use crate::error::HttpAppError;
use crate::handlers::{snapshot_from_segments, volume_from_segments};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use rookvault_core::{validate_segment, BackupLocation, TransferAck};
use std::sync::Arc;

/// POST /block/{region}/{bucket}/{prefix}/{tag}/{pool}/{image}
///
/// Answers once the image is downloaded and imported.
#[tracing::instrument(skip(state), fields(operation = "restore_volume"))]
pub async fn restore_volume(
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

    let ack = state.pipeline.restore(&location, &snapshot).await?;
    Ok(Json(ack))
}

/// GET /block/{pool}
#[tracing::instrument(skip(state))]
pub async fn list_images(
    State(state): State<Arc<AppState>>,
    Path(pool): Path<String>,
) -> Result<Json<Vec<String>>, HttpAppError> {
    validate_segment("pool", &pool)?;
    let images = state.pipeline.list_images(&pool).await?;
    Ok(Json(images))
}

/// GET /block/{pool}/{image}
#[tracing::instrument(skip(state))]
pub async fn image_size(
    State(state): State<Arc<AppState>>,
    Path((pool, image)): Path<(String, String)>,
) -> Result<Json<u64>, HttpAppError> {
    let volume = volume_from_segments(&pool, &image)?;
    let size = state.pipeline.image_size(&volume).await?;
    Ok(Json(size))
}
