//! Domain methods for the Transfer Service client.
//!
//! Routes:
//! - `POST   /snapshot/{region}/{bucket}/{prefix}/{tag}/{pool}/{image}`: export and upload
//! - `POST   /block/{region}/{bucket}/{prefix}/{tag}/{pool}/{image}`: download and import
//! - `DELETE /snapshot/{region}/{bucket}/{prefix}/{tag}/{pool}`: remove from cold storage
//! - `GET    /snapshot/{region}/{bucket}/{prefix}/{pool}/{image}`: stored tags
//! - `GET    /block/{pool}` and `/block/{pool}/{image}`: images and image size

use crate::{ClientError, TransferClient};
use rookvault_core::{BackupLocation, SnapshotId, SnapshotTag, TransferAck, VolumeId};

impl TransferClient {
    /// Export the snapshot's image and upload it. Returns once the upload finished.
    pub async fn create_backup(
        &self,
        location: &BackupLocation,
        snapshot: &SnapshotId,
    ) -> Result<TransferAck, ClientError> {
        self.post(&[
            "snapshot",
            &location.region,
            &location.bucket,
            location.prefix_segment(),
            snapshot.tag.as_str(),
            snapshot.pool(),
            snapshot.image(),
        ])
        .await
    }

    /// Download the snapshot's image and import it as `pool/image`.
    pub async fn restore_volume(
        &self,
        location: &BackupLocation,
        snapshot: &SnapshotId,
    ) -> Result<TransferAck, ClientError> {
        self.post(&[
            "block",
            &location.region,
            &location.bucket,
            location.prefix_segment(),
            snapshot.tag.as_str(),
            snapshot.pool(),
            snapshot.image(),
        ])
        .await
    }

    pub async fn delete_backup(
        &self,
        location: &BackupLocation,
        tag: &SnapshotTag,
        pool: &str,
    ) -> Result<TransferAck, ClientError> {
        self.delete(&[
            "snapshot",
            &location.region,
            &location.bucket,
            location.prefix_segment(),
            tag.as_str(),
            pool,
        ])
        .await
    }

    /// Tags of every stored backup of `volume`.
    pub async fn list_backups(
        &self,
        location: &BackupLocation,
        volume: &VolumeId,
    ) -> Result<Vec<String>, ClientError> {
        self.get(&[
            "snapshot",
            &location.region,
            &location.bucket,
            location.prefix_segment(),
            &volume.pool,
            &volume.image,
        ])
        .await
    }

    pub async fn list_images(&self, pool: &str) -> Result<Vec<String>, ClientError> {
        self.get(&["block", pool]).await
    }

    /// Image size in bytes.
    pub async fn image_size(&self, volume: &VolumeId) -> Result<u64, ClientError> {
        self.get(&["block", &volume.pool, &volume.image]).await
    }
}
