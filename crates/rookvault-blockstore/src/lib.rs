//! Rookvault block-store adapter
//!
//! Implements the backup orchestrator's block-storage plugin contract on top of the Transfer
//! Service. Volume identifiers are `{pool}||{image}`, snapshot identifiers
//! `{pool}||{image}||{tag}`.

pub mod config;
pub mod error;
pub mod metadata;
pub mod store;

pub use config::BlockStoreConfig;
pub use error::BlockStoreError;
pub use store::{BlockStore, RookBlockStore, VOLUME_TYPE};
