//! Application state shared by all handlers.

use rookvault_core::ServiceConfig;
use rookvault_transfer::TransferPipeline;

#[derive(Clone)]
pub struct AppState {
    pub config: ServiceConfig,
    pub pipeline: TransferPipeline,
}

impl AppState {
    pub fn new(config: ServiceConfig, pipeline: TransferPipeline) -> Self {
        Self { config, pipeline }
    }
}
