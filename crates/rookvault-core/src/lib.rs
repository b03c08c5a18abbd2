//! Rookvault Core Library
//!
//! This crate provides the identity codec, the cold-storage location model, error types and
//! configuration shared by the Transfer Service, its HTTP client and the block-store adapter.

pub mod config;
pub mod error;
pub mod ids;
pub mod location;
pub mod models;

// Re-export commonly used types
pub use config::ServiceConfig;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use ids::{
    decode_snapshot_id, decode_volume_id, encode_snapshot_id, encode_volume_id,
    validate_segment, IdentityError, SnapshotId, SnapshotTag, VolumeId, DELIMITER,
};
pub use location::{BackupLocation, EMPTY_PREFIX_SEGMENT};
pub use models::TransferAck;
