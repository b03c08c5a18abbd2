//! Orchestrator-facing volume and snapshot lifecycle
//!
//! [`RookBlockStore`] turns each call into one request against the Transfer Service. The
//! service answers a snapshot or restore request only after the whole pipeline finished, so a
//! returned snapshot identifier always names an image that is already in cold storage.

use crate::config::BlockStoreConfig;
use crate::error::BlockStoreError;
use crate::metadata;
use async_trait::async_trait;
use rookvault_api_client::TransferClient;
use rookvault_core::{
    decode_snapshot_id, decode_volume_id, BackupLocation, SnapshotId, SnapshotTag, VolumeId,
};
use serde_json::Value;
use std::collections::HashMap;

/// Volume type reported for every volume managed by this adapter.
pub const VOLUME_TYPE: &str = "rook";

/// Tag filters understood by [`BlockStore::list_snapshots`].
pub const POOL_FILTER: &str = "pool";
pub const IMAGE_FILTER: &str = "image";

/// Block-storage plugin contract of the backup orchestrator.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Validate and store the plugin configuration. Must be called before any other method.
    async fn init(&mut self, config: &HashMap<String, String>) -> Result<(), BlockStoreError>;

    /// Restore a snapshot into a volume and return the new volume identifier.
    async fn create_volume_from_snapshot(
        &self,
        snapshot_id: &str,
        volume_type: &str,
        availability_zone: &str,
        iops: Option<i64>,
    ) -> Result<String, BlockStoreError>;

    /// Back up a volume and return the snapshot identifier.
    async fn create_snapshot(
        &self,
        volume_id: &str,
        availability_zone: &str,
        tags: &HashMap<String, String>,
    ) -> Result<String, BlockStoreError>;

    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), BlockStoreError>;

    async fn get_volume_info(
        &self,
        volume_id: &str,
        availability_zone: &str,
    ) -> Result<(String, Option<i64>), BlockStoreError>;

    async fn is_volume_ready(
        &self,
        volume_id: &str,
        availability_zone: &str,
    ) -> Result<bool, BlockStoreError>;

    async fn list_snapshots(
        &self,
        tag_filters: &HashMap<String, String>,
    ) -> Result<Vec<String>, BlockStoreError>;

    /// Volume identifier recorded in persisted volume metadata, if any.
    fn get_volume_id(&self, metadata: &Value) -> Result<Option<String>, BlockStoreError>;

    /// Write `volume_id` into persisted volume metadata.
    fn set_volume_id(&self, metadata: Value, volume_id: &str) -> Result<Value, BlockStoreError>;
}

#[derive(Debug, Clone)]
struct Connected {
    location: BackupLocation,
    client: TransferClient,
}

/// [`BlockStore`] backed by the rookvault Transfer Service.
#[derive(Debug, Clone, Default)]
pub struct RookBlockStore {
    connected: Option<Connected>,
}

impl RookBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn location(&self) -> Option<&BackupLocation> {
        self.connected.as_ref().map(|c| &c.location)
    }

    fn connected(&self) -> Result<&Connected, BlockStoreError> {
        self.connected.as_ref().ok_or(BlockStoreError::NotInitialized)
    }
}

#[async_trait]
impl BlockStore for RookBlockStore {
    async fn init(&mut self, config: &HashMap<String, String>) -> Result<(), BlockStoreError> {
        let config = BlockStoreConfig::from_map(config)?;
        let client = TransferClient::new(&config.rest_api_url)
            .map_err(|e| BlockStoreError::InvalidConfiguration(e.to_string()))?;

        tracing::info!(
            url = %config.rest_api_url,
            bucket = %config.location.bucket,
            region = %config.location.region,
            prefix = %config.location.prefix,
            "Block store initialized"
        );

        self.connected = Some(Connected {
            location: config.location,
            client,
        });
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(snapshot_id = %snapshot_id))]
    async fn create_volume_from_snapshot(
        &self,
        snapshot_id: &str,
        _volume_type: &str,
        _availability_zone: &str,
        _iops: Option<i64>,
    ) -> Result<String, BlockStoreError> {
        let connected = self.connected()?;
        let snapshot = decode_snapshot_id(snapshot_id)?;

        connected
            .client
            .restore_volume(&connected.location, &snapshot)
            .await
            .map_err(BlockStoreError::transfer("restore"))?;

        Ok(snapshot.volume.to_string())
    }

    #[tracing::instrument(skip_all, fields(volume_id = %volume_id))]
    async fn create_snapshot(
        &self,
        volume_id: &str,
        _availability_zone: &str,
        _tags: &HashMap<String, String>,
    ) -> Result<String, BlockStoreError> {
        let connected = self.connected()?;
        let volume = decode_volume_id(volume_id)?;
        let snapshot = SnapshotId::new(volume, SnapshotTag::generate());

        connected
            .client
            .create_backup(&connected.location, &snapshot)
            .await
            .map_err(BlockStoreError::transfer("snapshot"))?;

        tracing::info!(snapshot_id = %snapshot, "Snapshot created");
        Ok(snapshot.to_string())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), BlockStoreError> {
        let connected = self.connected()?;
        let snapshot = decode_snapshot_id(snapshot_id)?;

        match connected
            .client
            .delete_backup(&connected.location, &snapshot.tag, snapshot.pool())
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::debug!("Snapshot already gone");
                Ok(())
            }
            Err(e) => Err(BlockStoreError::transfer("delete snapshot")(e)),
        }
    }

    async fn get_volume_info(
        &self,
        volume_id: &str,
        _availability_zone: &str,
    ) -> Result<(String, Option<i64>), BlockStoreError> {
        self.connected()?;
        decode_volume_id(volume_id)?;
        Ok((VOLUME_TYPE.to_string(), None))
    }

    async fn is_volume_ready(
        &self,
        volume_id: &str,
        _availability_zone: &str,
    ) -> Result<bool, BlockStoreError> {
        let connected = self.connected()?;
        let volume = decode_volume_id(volume_id)?;

        match connected.client.image_size(&volume).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(BlockStoreError::transfer("volume lookup")(e)),
        }
    }

    async fn list_snapshots(
        &self,
        tag_filters: &HashMap<String, String>,
    ) -> Result<Vec<String>, BlockStoreError> {
        let connected = self.connected()?;
        let (Some(pool), Some(image)) =
            (tag_filters.get(POOL_FILTER), tag_filters.get(IMAGE_FILTER))
        else {
            return Ok(Vec::new());
        };
        let volume = VolumeId::new(pool.as_str(), image.as_str());

        let tags = connected
            .client
            .list_backups(&connected.location, &volume)
            .await
            .map_err(BlockStoreError::transfer("list snapshots"))?;

        tags.iter()
            .map(|tag| -> Result<String, BlockStoreError> {
                let tag = SnapshotTag::parse(tag)?;
                Ok(SnapshotId::new(volume.clone(), tag).to_string())
            })
            .collect()
    }

    fn get_volume_id(&self, metadata: &Value) -> Result<Option<String>, BlockStoreError> {
        self.connected()?;
        Ok(metadata::read_volume(metadata)?.map(|volume| volume.to_string()))
    }

    fn set_volume_id(&self, metadata: Value, volume_id: &str) -> Result<Value, BlockStoreError> {
        self.connected()?;
        let volume = decode_volume_id(volume_id)?;
        metadata::write_volume(metadata, &volume)
    }
}
