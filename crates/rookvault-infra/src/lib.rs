//! Rookvault Infrastructure Library
//!
//! Shared infrastructure for the Transfer Service:
//! - Telemetry initialization (tracing subscriber)
//! - Middleware (request ID)
//! - Error response body

#[cfg(feature = "middleware")]
pub mod middleware;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod error;

// Re-export commonly used types
#[cfg(feature = "middleware")]
pub use middleware::{get_request_id, request_id_middleware, RequestId, REQUEST_ID_HEADER};

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry, DEFAULT_FILTER};

pub use error::ErrorResponse;
