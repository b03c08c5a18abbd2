//! Volume and snapshot identifiers
//!
//! The orchestrator treats volume and snapshot IDs as opaque strings. We pack the cluster
//! coordinates into them with a reserved delimiter:
//!
//! - **Volume**: `{pool}||{image}`
//! - **Snapshot**: `{pool}||{image}||{tag}`
//!
//! The delimiter is part of the wire format and already persisted in volume metadata, so it
//! must never change. Decoding is arity-checked: volume call sites use [`decode_volume_id`]
//! and snapshot call sites use [`decode_snapshot_id`]. There is deliberately no generic
//! splitter.
//!
//! Pool and image names are not checked for the delimiter on encode. Ceph naming rules keep
//! `|` out of pool and image names in practice; a name that contains `||` would not decode.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Reserved delimiter between identifier fields.
pub const DELIMITER: &str = "||";

/// Identifier decoding and path-segment validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("malformed identifier {id:?}: expected {expected} fields, found {found}")]
    Malformed {
        id: String,
        expected: usize,
        found: usize,
    },

    #[error("malformed identifier {id:?}: field {position} is empty")]
    EmptyField { id: String, position: usize },

    #[error("invalid {field} {value:?}: {reason}")]
    InvalidSegment {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// A cluster image, addressed by pool and image name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct VolumeId {
    pub pool: String,
    pub image: String,
}

impl VolumeId {
    pub fn new(pool: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            pool: pool.into(),
            image: image.into(),
        }
    }
}

impl Display for VolumeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&encode_volume_id(&self.pool, &self.image))
    }
}

impl FromStr for VolumeId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_volume_id(s)
    }
}

/// Unique token naming one point-in-time copy of an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SnapshotTag(String);

impl SnapshotTag {
    /// Generate a fresh tag. Tags are never reused; they namespace the exported object in
    /// cold storage and the local working directory.
    pub fn generate() -> Self {
        SnapshotTag(Uuid::new_v4().to_string())
    }

    /// Accept an existing tag, e.g. one recovered from a snapshot identifier.
    pub fn parse(value: &str) -> Result<Self, IdentityError> {
        validate_segment("snapshot tag", value)?;
        Ok(SnapshotTag(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SnapshotTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// A snapshot of a volume: the source volume plus the tag generated at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotId {
    pub volume: VolumeId,
    pub tag: SnapshotTag,
}

impl SnapshotId {
    pub fn new(volume: VolumeId, tag: SnapshotTag) -> Self {
        Self { volume, tag }
    }

    pub fn pool(&self) -> &str {
        &self.volume.pool
    }

    pub fn image(&self) -> &str {
        &self.volume.image
    }
}

impl Display for SnapshotId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&encode_snapshot_id(
            &self.volume.to_string(),
            self.tag.as_str(),
        ))
    }
}

impl FromStr for SnapshotId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_snapshot_id(s)
    }
}

/// Encode a volume identifier: `{pool}||{image}`.
pub fn encode_volume_id(pool: &str, image: &str) -> String {
    format!("{}{}{}", pool, DELIMITER, image)
}

/// Encode a snapshot identifier from an already-encoded volume identifier: `{volume_id}||{tag}`.
pub fn encode_snapshot_id(volume_id: &str, tag: &str) -> String {
    format!("{}{}{}", volume_id, DELIMITER, tag)
}

/// Decode a volume identifier. Exactly two non-empty fields are accepted.
pub fn decode_volume_id(id: &str) -> Result<VolumeId, IdentityError> {
    let [pool, image] = split_exact::<2>(id)?;
    Ok(VolumeId::new(pool, image))
}

/// Decode a snapshot identifier. Exactly three non-empty fields are accepted.
pub fn decode_snapshot_id(id: &str) -> Result<SnapshotId, IdentityError> {
    let [pool, image, tag] = split_exact::<3>(id)?;
    Ok(SnapshotId::new(
        VolumeId::new(pool, image),
        SnapshotTag(tag.to_string()),
    ))
}

fn split_exact<const N: usize>(id: &str) -> Result<[&str; N], IdentityError> {
    let fields: Vec<&str> = id.split(DELIMITER).collect();
    let fields: [&str; N] = fields
        .as_slice()
        .try_into()
        .map_err(|_| IdentityError::Malformed {
            id: id.to_string(),
            expected: N,
            found: fields.len(),
        })?;

    if let Some(position) = fields.iter().position(|f| f.is_empty()) {
        return Err(IdentityError::EmptyField {
            id: id.to_string(),
            position,
        });
    }

    Ok(fields)
}

/// Validate a value that becomes one path component, both in URLs and on local disk.
///
/// Rejects empty values, the identifier delimiter, path separators and dot segments.
pub fn validate_segment(field: &'static str, value: &str) -> Result<(), IdentityError> {
    let reason = if value.is_empty() {
        Some("must not be empty")
    } else if value.contains(DELIMITER) {
        Some("must not contain the identifier delimiter")
    } else if value.contains('/') || value.contains('\\') {
        Some("must not contain path separators")
    } else if value == "." || value == ".." {
        Some("must not be a relative path component")
    } else if value.chars().any(char::is_control) {
        Some("must not contain control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(IdentityError::InvalidSegment {
            field,
            value: value.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
