//! Adapter configuration, as handed over by the orchestrator at init.

use crate::error::BlockStoreError;
use rookvault_core::{BackupLocation, EMPTY_PREFIX_SEGMENT};
use std::collections::HashMap;

pub const REST_API_URL_KEY: &str = "rookRestAPIURL";
pub const BUCKET_KEY: &str = "bucket";
pub const REGION_KEY: &str = "region";
pub const PREFIX_KEY: &str = "prefix";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockStoreConfig {
    /// Base URL of the Transfer Service.
    pub rest_api_url: String,
    pub location: BackupLocation,
}

impl BlockStoreConfig {
    /// Read the configuration map. `rookRestAPIURL`, `bucket` and `region` are required and must
    /// be non-empty; `prefix` defaults to empty and cannot be the empty-prefix placeholder `-`.
    pub fn from_map(config: &HashMap<String, String>) -> Result<Self, BlockStoreError> {
        let rest_api_url = required(config, REST_API_URL_KEY)?;
        let bucket = required(config, BUCKET_KEY)?;
        let region = required(config, REGION_KEY)?;
        let prefix = config
            .get(PREFIX_KEY)
            .map(|p| p.trim().to_string())
            .unwrap_or_default();

        let location = BackupLocation::new(region, bucket, prefix);
        if location.prefix == EMPTY_PREFIX_SEGMENT {
            return Err(BlockStoreError::InvalidConfiguration(format!(
                "{PREFIX_KEY} cannot be '{EMPTY_PREFIX_SEGMENT}', it is reserved for the empty prefix"
            )));
        }

        Ok(Self {
            rest_api_url,
            location,
        })
    }
}

fn required(config: &HashMap<String, String>, key: &str) -> Result<String, BlockStoreError> {
    config
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| BlockStoreError::MissingConfiguration(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn prefix_is_optional() {
        let config = BlockStoreConfig::from_map(&map(&[
            ("rookRestAPIURL", "http://rook-rest-api:9080"),
            ("bucket", "backups"),
            ("region", "us-east-1"),
        ]))
        .unwrap();
        assert_eq!(config.location.prefix, "");
        assert_eq!(config.location.bucket, "backups");
    }

    #[test]
    fn placeholder_prefix_is_rejected() {
        for prefix in ["-", " -", "/-/"] {
            let result = BlockStoreConfig::from_map(&map(&[
                ("rookRestAPIURL", "http://rook-rest-api:9080"),
                ("bucket", "backups"),
                ("region", "us-east-1"),
                ("prefix", prefix),
            ]));
            assert!(
                matches!(result, Err(BlockStoreError::InvalidConfiguration(_))),
                "{prefix:?}"
            );
        }

        let config = BlockStoreConfig::from_map(&map(&[
            ("rookRestAPIURL", "http://rook-rest-api:9080"),
            ("bucket", "backups"),
            ("region", "us-east-1"),
            ("prefix", "-nightly"),
        ]))
        .unwrap();
        assert_eq!(config.location.prefix, "-nightly");
    }

    #[test]
    fn every_required_key_is_named() {
        let full = [
            ("rookRestAPIURL", "http://rook-rest-api:9080"),
            ("bucket", "backups"),
            ("region", "us-east-1"),
        ];

        for (missing, _) in full {
            let partial: Vec<_> = full.iter().copied().filter(|(k, _)| *k != missing).collect();
            match BlockStoreConfig::from_map(&map(&partial)) {
                Err(BlockStoreError::MissingConfiguration(key)) => assert_eq!(key, missing),
                other => panic!("expected missing {missing}, got {other:?}"),
            }

            let mut blank = map(&full);
            blank.insert(missing.to_string(), "  ".to_string());
            assert!(matches!(
                BlockStoreConfig::from_map(&blank),
                Err(BlockStoreError::MissingConfiguration(_))
            ));
        }
    }
}
