use rookvault_api_client::ClientError;
use rookvault_core::IdentityError;

#[derive(Debug, thiserror::Error)]
pub enum BlockStoreError {
    #[error("missing required configuration key {0:?}")]
    MissingConfiguration(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("block store is not initialized")]
    NotInitialized,

    #[error(transparent)]
    MalformedIdentifier(#[from] IdentityError),

    /// The Transfer Service answered non-2xx or could not be reached.
    #[error("{operation} failed: {source}")]
    TransferFailure {
        operation: &'static str,
        #[source]
        source: ClientError,
    },

    #[error("volume metadata is missing {0}")]
    MissingField(String),

    #[error("volume metadata field {0} is not a string")]
    InvalidField(String),
}

impl BlockStoreError {
    pub(crate) fn transfer(operation: &'static str) -> impl FnOnce(ClientError) -> Self {
        move |source| BlockStoreError::TransferFailure { operation, source }
    }
}
