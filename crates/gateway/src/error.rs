//! Gateway error types.

use store::StoreError;
use thiserror::Error;

use crate::remote::{Operation, TransportError};

/// Errors that can occur during gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The provider answered but did not report success.
    #[error("{operation} rejected: {message}")]
    ProviderRejected { operation: Operation, message: String },

    /// The provider could not be reached or its answer was unusable.
    #[error("{operation} transport fault: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: TransportError,
    },

    /// A caller asked for an operation the session does not allow.
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    /// Persisting the session failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl GatewayError {
    pub fn transport(operation: Operation, source: TransportError) -> Self {
        GatewayError::Transport { operation, source }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport { .. })
    }
}
