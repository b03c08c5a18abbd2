//! Telemetry initialization
//!
//! Console tracing only: compact human-readable output in development, JSON lines in
//! production so log shippers can pick up the structured fields.

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry, DEFAULT_FILTER};
