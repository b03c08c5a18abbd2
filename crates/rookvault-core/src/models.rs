//! Wire types shared by the Transfer Service and its client.

use serde::{Deserialize, Serialize};

/// Acknowledgement returned once a backup, restore or delete finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAck {
    pub tag: String,
    pub pool: String,
    /// Absent for deletes, which cover every image of the tag and pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Object URL that was written, read or removed.
    pub object: String,
}
