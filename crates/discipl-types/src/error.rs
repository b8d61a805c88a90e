/// Errors raised by the Discipl core and its connectors.
///
/// Absent data (a missing claim, an attestation that was never made) is not
/// an error: those surface as `None`.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("malformed address: {0}")]
    MalformedAddress(String),

    #[error("no connector registered or loadable for '{0}'")]
    UnknownConnector(String),

    #[error("The '{operation}' method is not supported for the '{connector}' connector")]
    UnsupportedCapability { operation: String, connector: String },

    #[error("Observe without did or connector is not supported")]
    UnsupportedObservation,

    #[error("connector '{connector}' failed: {reason}")]
    Backend { connector: String, reason: String },

    #[error("invalid linked data: {0}")]
    InvalidLinkedData(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Capability error for an optional connector operation.
    pub fn unsupported(operation: &str, connector: &str) -> Self {
        Self::UnsupportedCapability {
            operation: operation.to_string(),
            connector: connector.to_string(),
        }
    }

    /// Failure reported by a backend.
    pub fn backend(connector: &str, reason: impl Into<String>) -> Self {
        Self::Backend {
            connector: connector.to_string(),
            reason: reason.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
