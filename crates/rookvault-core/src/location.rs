//! Cold-storage location of exported images
//!
//! Object key layout: `{bucket}/{prefix}/{tag}/{pool}/{image}`. An empty prefix contributes no
//! key segment. All snapshots of one tag and pool live under `{bucket}/{prefix}/{tag}/{pool}`,
//! which is what a snapshot delete removes.

use crate::ids::{validate_segment, IdentityError, SnapshotTag};

/// Path segment standing in for an empty prefix. An empty segment would collapse the route.
pub const EMPTY_PREFIX_SEGMENT: &str = "-";

const OBJECT_SCHEME: &str = "s3://";

/// Where exported snapshot images live in the object store.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BackupLocation {
    pub region: String,
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
}

impl BackupLocation {
    pub fn new(
        region: impl Into<String>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            bucket: bucket.into(),
            prefix: normalize_prefix(&prefix.into()),
        }
    }

    /// Rebuild a location from the three leading path segments of a transfer route.
    pub fn from_path_segments(
        region: &str,
        bucket: &str,
        prefix_segment: &str,
    ) -> Result<Self, IdentityError> {
        validate_segment("region", region)?;
        validate_segment("bucket", bucket)?;

        let prefix = if prefix_segment == EMPTY_PREFIX_SEGMENT {
            String::new()
        } else {
            normalize_prefix(prefix_segment)
        };
        if prefix.split('/').any(|part| part == "..") {
            return Err(IdentityError::InvalidSegment {
                field: "prefix",
                value: prefix_segment.to_string(),
                reason: "must not contain relative path components",
            });
        }

        Ok(Self {
            region: region.to_string(),
            bucket: bucket.to_string(),
            prefix,
        })
    }

    /// Prefix as sent in a URL path segment.
    pub fn prefix_segment(&self) -> &str {
        if self.prefix.is_empty() {
            EMPTY_PREFIX_SEGMENT
        } else {
            &self.prefix
        }
    }

    /// Key of the exported image inside the bucket: `{prefix}/{tag}/{pool}/{image}`.
    pub fn object_key(&self, tag: &SnapshotTag, pool: &str, image: &str) -> String {
        self.join_key(&[tag.as_str(), pool, image])
    }

    /// Full object URL of one exported image.
    pub fn object_url(&self, tag: &SnapshotTag, pool: &str, image: &str) -> String {
        format!(
            "{}{}/{}",
            OBJECT_SCHEME,
            self.bucket,
            self.object_key(tag, pool, image)
        )
    }

    /// Object URL covering every image exported under one tag and pool.
    pub fn snapshot_url(&self, tag: &SnapshotTag, pool: &str) -> String {
        format!(
            "{}{}/{}",
            OBJECT_SCHEME,
            self.bucket,
            self.join_key(&[tag.as_str(), pool])
        )
    }

    /// Object URL of the prefix root, used for listings. Always ends with `/`.
    pub fn prefix_url(&self) -> String {
        if self.prefix.is_empty() {
            format!("{}{}/", OBJECT_SCHEME, self.bucket)
        } else {
            format!("{}{}/{}/", OBJECT_SCHEME, self.bucket, self.prefix)
        }
    }

    /// Extract the tag from an object key shaped `{prefix}/{tag}/{pool}/{image}`.
    ///
    /// Returns `None` for keys outside the prefix or belonging to another pool or image.
    pub fn tag_from_key(&self, key: &str, pool: &str, image: &str) -> Option<String> {
        let rest = if self.prefix.is_empty() {
            key
        } else {
            key.strip_prefix(&self.prefix)?.strip_prefix('/')?
        };

        let mut parts = rest.split('/');
        let (tag, key_pool, key_image) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || tag.is_empty() || key_pool != pool || key_image != image {
            return None;
        }
        Some(tag.to_string())
    }

    fn join_key(&self, parts: &[&str]) -> String {
        let tail = parts.join("/");
        if self.prefix.is_empty() {
            tail
        } else {
            format!("{}/{}", self.prefix, tail)
        }
    }
}

fn normalize_prefix(prefix: &str) -> String {
    prefix.trim_matches('/').to_string()
}
