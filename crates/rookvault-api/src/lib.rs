//! Rookvault API Library
//!
//! The Transfer Service HTTP surface: handlers, state, error mapping and application setup.

mod handlers;

pub mod error;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
