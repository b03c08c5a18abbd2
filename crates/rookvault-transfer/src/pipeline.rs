//! Backup and restore pipeline
//!
//! Backup: ensure working dir -> `rbd export` -> upload -> remove local file.
//! Restore: ensure working dir -> download -> `rbd import` -> remove local file.
//!
//! Each stage runs only after the previous one succeeded. A failed stage stops the pipeline and
//! leaves whatever is on disk in place, so an operator can retry the failed step by hand. There
//! are no automatic retries.
//!
//! Every operation on a `{tag}/{pool}` working directory holds that key in [`KeyedLocks`] for
//! its whole duration, and runs in its own task: dropping the caller's future does not cancel an
//! export or import that already started.

use crate::locks::KeyedLocks;
use crate::runner::{StageKind, StageOutput, StageRunner};
use crate::workspace::Workspace;
use rookvault_core::{
    validate_segment, AppError, BackupLocation, IdentityError, SnapshotId, SnapshotTag,
    TransferAck, VolumeId,
};
use std::collections::BTreeSet;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// ENOENT as reported by `rbd` when opening an image that does not exist.
const MISSING_IMAGE_MARKER: &str = "(2) No such file or directory";

#[derive(Clone)]
pub struct TransferPipeline {
    runner: Arc<dyn StageRunner>,
    workspace: Workspace,
    locks: KeyedLocks,
}

impl TransferPipeline {
    pub fn new(runner: Arc<dyn StageRunner>, workspace: Workspace) -> Self {
        Self {
            runner,
            workspace,
            locks: KeyedLocks::new(),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Export `snapshot`'s image from the cluster and upload it to cold storage.
    ///
    /// Returns only after the upload finished.
    pub async fn backup(
        &self,
        location: &BackupLocation,
        snapshot: &SnapshotId,
    ) -> Result<TransferAck, AppError> {
        validate_snapshot(snapshot)?;
        let (pipeline, location, snapshot) = (self.clone(), location.clone(), snapshot.clone());
        detach(async move { pipeline.run_backup(&location, &snapshot).await }).await
    }

    /// Download `snapshot`'s exported image and import it into the cluster as `pool/image`.
    pub async fn restore(
        &self,
        location: &BackupLocation,
        snapshot: &SnapshotId,
    ) -> Result<TransferAck, AppError> {
        validate_snapshot(snapshot)?;
        let (pipeline, location, snapshot) = (self.clone(), location.clone(), snapshot.clone());
        detach(async move { pipeline.run_restore(&location, &snapshot).await }).await
    }

    /// Remove every exported image of `tag` in `pool` from cold storage. The cluster is not
    /// touched.
    pub async fn delete(
        &self,
        location: &BackupLocation,
        tag: &SnapshotTag,
        pool: &str,
    ) -> Result<TransferAck, AppError> {
        validate_segment("pool", pool)?;
        let (pipeline, location, tag, pool) =
            (self.clone(), location.clone(), tag.clone(), pool.to_string());
        detach(async move { pipeline.run_delete(&location, &tag, &pool).await }).await
    }

    /// Tags of every stored backup of `volume`, sorted.
    #[tracing::instrument(skip(self, location), fields(pool = %volume.pool, image = %volume.image))]
    pub async fn list_backups(
        &self,
        location: &BackupLocation,
        volume: &VolumeId,
    ) -> Result<Vec<String>, AppError> {
        validate_volume(volume)?;
        let url = location.prefix_url();
        let args = vec![
            "s3".to_string(),
            "ls".to_string(),
            url.clone(),
            "--recursive".to_string(),
            "--region".to_string(),
            location.region.clone(),
        ];

        let output = self.runner.run(StageKind::ListObjects, &args).await?;
        if !output.is_success() {
            // `s3 ls` exits 1 without output when nothing matches the prefix.
            if output.exit_code == Some(1) && output.output.trim().is_empty() {
                return Ok(Vec::new());
            }
            return Err(AppError::ListFailed {
                target: url,
                output: output.output,
            });
        }

        Ok(parse_object_listing(
            &output.output,
            location,
            &volume.pool,
            &volume.image,
        ))
    }

    /// Image names in `pool`.
    #[tracing::instrument(skip(self))]
    pub async fn list_images(&self, pool: &str) -> Result<Vec<String>, AppError> {
        validate_segment("pool", pool)?;
        let args = vec![
            "ls".to_string(),
            pool.to_string(),
            "--format".to_string(),
            "json".to_string(),
        ];

        let output = self.runner.run(StageKind::ListImages, &args).await?;
        let output = require_success(output, |output| AppError::ListFailed {
            target: pool.to_string(),
            output,
        })?;

        parse_json_output(&output, pool)
    }

    /// Provisioned size of `volume` in bytes.
    #[tracing::instrument(skip(self), fields(pool = %volume.pool, image = %volume.image))]
    pub async fn image_size(&self, volume: &VolumeId) -> Result<u64, AppError> {
        validate_volume(volume)?;
        let target = format!("{}/{}", volume.pool, volume.image);
        let args = vec![
            "info".to_string(),
            target.clone(),
            "--format".to_string(),
            "json".to_string(),
        ];

        let output = self.runner.run(StageKind::ImageInfo, &args).await?;
        let output = require_success(output, |output| {
            if output.contains(MISSING_IMAGE_MARKER) {
                AppError::NotFound(format!("image {}", target))
            } else {
                AppError::ListFailed {
                    target: target.clone(),
                    output,
                }
            }
        })?;

        let info: ImageInfo = parse_json_output(&output, &target)?;
        Ok(info.size)
    }

    /// Run the cluster session bootstrap script once.
    pub async fn bootstrap(&self) -> Result<(), AppError> {
        let output = self.runner.run(StageKind::Bootstrap, &[]).await?;
        require_success(output, |output| {
            AppError::Internal(format!("cluster bootstrap failed: {}", output))
        })?;
        Ok(())
    }

    async fn run_backup(
        &self,
        location: &BackupLocation,
        snapshot: &SnapshotId,
    ) -> Result<TransferAck, AppError> {
        let (tag, pool, image) = (snapshot.tag.as_str(), snapshot.pool(), snapshot.image());
        let _guard = self.locks.acquire(lock_key(tag, pool)).await;
        let start = Instant::now();

        self.workspace.ensure_dir(tag, pool).await?;
        let file = self.workspace.file(tag, pool, image);
        let file_arg = path_arg(&file);
        let volume = format!("{}/{}", pool, image);

        let export = self
            .stage(
                StageKind::Export,
                vec!["export".to_string(), volume.clone(), file_arg.clone()],
            )
            .await?;
        require_success(export, |output| AppError::ExportFailed {
            target: volume.clone(),
            output,
        })?;

        let object = location.object_url(&snapshot.tag, pool, image);
        let upload = self
            .stage(
                StageKind::Upload,
                vec![
                    "s3".to_string(),
                    "cp".to_string(),
                    file_arg,
                    object.clone(),
                    "--region".to_string(),
                    location.region.clone(),
                ],
            )
            .await?;
        require_success(upload, |output| AppError::UploadFailed {
            target: object.clone(),
            output,
        })?;

        self.workspace.remove_file(&file).await?;

        tracing::info!(
            tag,
            pool,
            image,
            object = %object,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Snapshot exported and uploaded"
        );

        Ok(TransferAck {
            tag: tag.to_string(),
            pool: pool.to_string(),
            image: Some(image.to_string()),
            object,
        })
    }

    async fn run_restore(
        &self,
        location: &BackupLocation,
        snapshot: &SnapshotId,
    ) -> Result<TransferAck, AppError> {
        let (tag, pool, image) = (snapshot.tag.as_str(), snapshot.pool(), snapshot.image());
        let _guard = self.locks.acquire(lock_key(tag, pool)).await;
        let start = Instant::now();

        self.workspace.ensure_dir(tag, pool).await?;
        let file = self.workspace.file(tag, pool, image);
        let file_arg = path_arg(&file);
        let object = location.object_url(&snapshot.tag, pool, image);

        let download = self
            .stage(
                StageKind::Download,
                vec![
                    "s3".to_string(),
                    "cp".to_string(),
                    object.clone(),
                    file_arg.clone(),
                    "--region".to_string(),
                    location.region.clone(),
                ],
            )
            .await?;
        require_success(download, |output| AppError::DownloadFailed {
            target: object.clone(),
            output,
        })?;

        let volume = format!("{}/{}", pool, image);
        let import = self
            .stage(
                StageKind::Import,
                vec!["import".to_string(), file_arg, volume.clone()],
            )
            .await?;
        require_success(import, |output| AppError::ImportFailed {
            target: volume.clone(),
            output,
        })?;

        self.workspace.remove_file(&file).await?;

        tracing::info!(
            tag,
            pool,
            image,
            object = %object,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Snapshot downloaded and imported"
        );

        Ok(TransferAck {
            tag: tag.to_string(),
            pool: pool.to_string(),
            image: Some(image.to_string()),
            object,
        })
    }

    async fn run_delete(
        &self,
        location: &BackupLocation,
        tag: &SnapshotTag,
        pool: &str,
    ) -> Result<TransferAck, AppError> {
        let _guard = self.locks.acquire(lock_key(tag.as_str(), pool)).await;

        let object = location.snapshot_url(tag, pool);
        let delete = self
            .stage(
                StageKind::Delete,
                vec![
                    "s3".to_string(),
                    "rm".to_string(),
                    object.clone(),
                    "--recursive".to_string(),
                    "--region".to_string(),
                    location.region.clone(),
                ],
            )
            .await?;
        require_success(delete, |output| AppError::DeleteFailed {
            target: object.clone(),
            output,
        })?;

        tracing::info!(tag = %tag, pool, object = %object, "Snapshot deleted from cold storage");

        Ok(TransferAck {
            tag: tag.to_string(),
            pool: pool.to_string(),
            image: None,
            object,
        })
    }

    async fn stage(&self, kind: StageKind, args: Vec<String>) -> Result<StageOutput, AppError> {
        let start = Instant::now();
        let output = self.runner.run(kind, &args).await?;

        if output.is_success() {
            tracing::debug!(
                stage = %kind,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Stage completed"
            );
        } else {
            tracing::warn!(
                stage = %kind,
                exit_code = ?output.exit_code,
                output = %output.output,
                "Stage failed"
            );
        }

        Ok(output)
    }
}

#[derive(Debug, serde::Deserialize)]
struct ImageInfo {
    size: u64,
}

/// Run `fut` in its own task and wait for it.
async fn detach<T, F>(fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(fut)
        .await
        .map_err(|e| AppError::Internal(format!("transfer task failed: {}", e)))?
}

fn lock_key(tag: &str, pool: &str) -> String {
    format!("{}/{}", tag, pool)
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn require_success(
    output: StageOutput,
    on_failure: impl FnOnce(String) -> AppError,
) -> Result<String, AppError> {
    if output.is_success() {
        Ok(output.output)
    } else {
        Err(on_failure(output.output))
    }
}

fn parse_json_output<T: serde::de::DeserializeOwned>(
    output: &str,
    target: &str,
) -> Result<T, AppError> {
    serde_json::from_str(output.trim()).map_err(|e| AppError::ListFailed {
        target: target.to_string(),
        output: format!("unexpected output ({}): {}", e, output),
    })
}

fn validate_volume(volume: &VolumeId) -> Result<(), IdentityError> {
    validate_segment("pool", &volume.pool)?;
    validate_segment("image", &volume.image)
}

fn validate_snapshot(snapshot: &SnapshotId) -> Result<(), IdentityError> {
    validate_volume(&snapshot.volume)?;
    validate_segment("snapshot tag", snapshot.tag.as_str())
}

/// Extract the tags of `pool/image` from `s3 ls --recursive` output.
///
/// Lines look like `2024-05-01 10:00:00   1048576 prefix/tag/pool/image`; the key is the last
/// field.
fn parse_object_listing(
    listing: &str,
    location: &BackupLocation,
    pool: &str,
    image: &str,
) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().last())
        .filter_map(|key| location.tag_from_key(key, pool, image))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
