//! Error types module
//!
//! All Transfer Service failures are unified under [`AppError`]. Pipeline stage variants carry
//! the captured output of the external command that failed, so the caller sees the same
//! diagnostic text the operator would see in a shell.

use crate::ids::IdentityError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like malformed requests
    Debug,
    /// Warning level - for failures caused by the environment
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "EXPORT_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same request can succeed without operator action
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    MalformedIdentifier(#[from] IdentityError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Workspace error at {path}: {message}")]
    Workspace { path: String, message: String },

    #[error("Export of {target} failed: {output}")]
    ExportFailed { target: String, output: String },

    #[error("Upload of {target} failed: {output}")]
    UploadFailed { target: String, output: String },

    #[error("Download of {target} failed: {output}")]
    DownloadFailed { target: String, output: String },

    #[error("Import of {target} failed: {output}")]
    ImportFailed { target: String, output: String },

    #[error("Delete of {target} failed: {output}")]
    DeleteFailed { target: String, output: String },

    #[error("Listing {target} failed: {output}")]
    ListFailed { target: String, output: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (u16, &'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        AppError::MalformedIdentifier(_) => (
            400,
            "MALFORMED_IDENTIFIER",
            false,
            Some("Check the volume or snapshot identifier"),
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            None,
            LogLevel::Debug,
        ),
        AppError::Workspace { .. } => (
            500,
            "WORKSPACE_ERROR",
            false,
            Some("Check free space and permissions of the working directory"),
            LogLevel::Error,
        ),
        AppError::ExportFailed { .. } => (
            500,
            "EXPORT_FAILED",
            false,
            Some("Verify the image exists in the cluster"),
            LogLevel::Error,
        ),
        AppError::UploadFailed { .. } => (
            500,
            "UPLOAD_FAILED",
            false,
            Some("The export is kept locally; fix object store access and retry the upload"),
            LogLevel::Error,
        ),
        AppError::DownloadFailed { .. } => (
            500,
            "DOWNLOAD_FAILED",
            false,
            Some("Verify the snapshot exists in the bucket"),
            LogLevel::Error,
        ),
        AppError::ImportFailed { .. } => (
            500,
            "IMPORT_FAILED",
            false,
            Some("The download is kept locally; check the target pool and image name"),
            LogLevel::Error,
        ),
        AppError::DeleteFailed { .. } => (
            500,
            "DELETE_FAILED",
            false,
            Some("Check object store access"),
            LogLevel::Error,
        ),
        AppError::ListFailed { .. } => (
            500,
            "LIST_FAILED",
            false,
            None,
            LogLevel::Warn,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::MalformedIdentifier(_) => "MalformedIdentifier",
            AppError::NotFound(_) => "NotFound",
            AppError::Workspace { .. } => "WorkspaceError",
            AppError::ExportFailed { .. } => "ExportFailure",
            AppError::UploadFailed { .. } => "UploadFailure",
            AppError::DownloadFailed { .. } => "DownloadFailure",
            AppError::ImportFailed { .. } => "ImportFailure",
            AppError::DeleteFailed { .. } => "DeleteFailure",
            AppError::ListFailed { .. } => "ListFailure",
            AppError::Internal(_) => "Internal",
        }
    }

    /// Captured output of the failing external command, if this is a stage failure.
    pub fn stage_output(&self) -> Option<&str> {
        match self {
            AppError::ExportFailed { output, .. }
            | AppError::UploadFailed { output, .. }
            | AppError::DownloadFailed { output, .. }
            | AppError::ImportFailed { output, .. }
            | AppError::DeleteFailed { output, .. }
            | AppError::ListFailed { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Internal(_) => "Internal server error".to_string(),
            // Stage failures and caller errors are reported verbatim: the captured command
            // output is the only diagnostic the orchestrator gets.
            other => other.to_string(),
        }
    }
}
