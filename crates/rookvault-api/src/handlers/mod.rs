pub mod block;
pub mod health;
pub mod snapshot;

use rookvault_core::{validate_segment, IdentityError, SnapshotId, SnapshotTag, VolumeId};

/// Volume from raw `{pool}/{image}` path segments.
pub(crate) fn volume_from_segments(pool: &str, image: &str) -> Result<VolumeId, IdentityError> {
    validate_segment("pool", pool)?;
    validate_segment("image", image)?;
    Ok(VolumeId::new(pool, image))
}

/// Snapshot from raw `{tag}/{pool}/{image}` path segments.
pub(crate) fn snapshot_from_segments(
    tag: &str,
    pool: &str,
    image: &str,
) -> Result<SnapshotId, IdentityError> {
    let volume = volume_from_segments(pool, image)?;
    Ok(SnapshotId::new(volume, SnapshotTag::parse(tag)?))
}
