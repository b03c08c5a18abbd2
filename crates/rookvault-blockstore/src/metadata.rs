//! Volume identity inside the orchestrator's persisted volume metadata.
//!
//! The metadata is arbitrary JSON. Only `spec.flexVolume.options.pool` and
//! `spec.flexVolume.options.image` are read or written; everything else is left untouched.

use crate::error::BlockStoreError;
use rookvault_core::VolumeId;
use serde_json::Value;

const OPTIONS_POINTER: &str = "/spec/flexVolume/options";
const OPTIONS_PATH: &str = "spec.flexVolume.options";

/// Pool and image recorded in `metadata`, or `None` when either is absent.
pub fn read_volume(metadata: &Value) -> Result<Option<VolumeId>, BlockStoreError> {
    let Some(options) = metadata.pointer(OPTIONS_POINTER) else {
        return Ok(None);
    };

    match (string_field(options, "pool")?, string_field(options, "image")?) {
        (Some(pool), Some(image)) => Ok(Some(VolumeId::new(pool, image))),
        _ => Ok(None),
    }
}

/// Record `volume` in `metadata`. The options object must already exist.
pub fn write_volume(mut metadata: Value, volume: &VolumeId) -> Result<Value, BlockStoreError> {
    let options = metadata
        .pointer_mut(OPTIONS_POINTER)
        .and_then(Value::as_object_mut)
        .ok_or_else(|| BlockStoreError::MissingField(OPTIONS_PATH.to_string()))?;

    options.insert("pool".to_string(), Value::String(volume.pool.clone()));
    options.insert("image".to_string(), Value::String(volume.image.clone()));
    Ok(metadata)
}

fn string_field<'a>(options: &'a Value, name: &str) -> Result<Option<&'a str>, BlockStoreError> {
    match options.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(BlockStoreError::InvalidField(format!(
            "{}.{}",
            OPTIONS_PATH, name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_pool_and_image() {
        let metadata = json!({
            "metadata": {"name": "pv-1"},
            "spec": {"flexVolume": {"driver": "ceph.rook.io/rook", "options": {
                "pool": "replicapool", "image": "pvc-1", "clusterNamespace": "rook-ceph"
            }}}
        });
        assert_eq!(
            read_volume(&metadata).unwrap(),
            Some(VolumeId::new("replicapool", "pvc-1"))
        );
    }

    #[test]
    fn absent_fields_are_not_an_error() {
        assert_eq!(read_volume(&json!({})).unwrap(), None);
        assert_eq!(read_volume(&json!({"spec": {"csi": {}}})).unwrap(), None);
        assert_eq!(
            read_volume(&json!({"spec": {"flexVolume": {"options": {"pool": "p"}}}})).unwrap(),
            None
        );
    }

    #[test]
    fn non_string_field_is_invalid() {
        let metadata = json!({"spec": {"flexVolume": {"options": {"pool": 7, "image": "i"}}}});
        assert!(matches!(
            read_volume(&metadata),
            Err(BlockStoreError::InvalidField(field)) if field == "spec.flexVolume.options.pool"
        ));
    }

    #[test]
    fn write_keeps_other_fields() {
        let metadata = json!({
            "spec": {"capacity": {"storage": "1Gi"},
                     "flexVolume": {"options": {"pool": "old", "image": "old", "fsType": "ext4"}}}
        });
        let updated = write_volume(metadata, &VolumeId::new("replicapool", "pvc-2")).unwrap();

        assert_eq!(updated["spec"]["flexVolume"]["options"]["pool"], "replicapool");
        assert_eq!(updated["spec"]["flexVolume"]["options"]["image"], "pvc-2");
        assert_eq!(updated["spec"]["flexVolume"]["options"]["fsType"], "ext4");
        assert_eq!(updated["spec"]["capacity"]["storage"], "1Gi");
    }

    #[test]
    fn write_requires_options_object() {
        let err = write_volume(json!({"spec": {}}), &VolumeId::new("p", "i")).unwrap_err();
        assert!(matches!(err, BlockStoreError::MissingField(_)));
    }
}
