//! Rookvault Transfer Library
//!
//! The backup/restore pipeline behind the Transfer Service: external stage execution, per-key
//! serialization and the local working area.

pub mod locks;
pub mod pipeline;
pub mod runner;
pub mod workspace;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use locks::{KeyGuard, KeyedLocks};
pub use pipeline::TransferPipeline;
pub use runner::{ProcessRunner, ProcessRunnerConfig, StageKind, StageOutput, StageRunner};
pub use workspace::Workspace;

use rookvault_core::ServiceConfig;

impl From<&ServiceConfig> for ProcessRunnerConfig {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            rbd_path: config.rbd_path.clone(),
            object_store_cli: config.object_store_cli.clone(),
            toolbox_path: config.toolbox_path.clone(),
        }
    }
}
