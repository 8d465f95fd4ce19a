//! Error types for the inventory client layer.

use thiserror::Error;

/// Errors that can occur during inventory operations.
///
/// The first five variants are the faults the management endpoint raises for
/// `AddVirtualNic` and property retrieval. They are passed through to the
/// caller as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// The host rejected the network configuration.
    #[error("Host configuration fault: {0}")]
    HostConfig(String),

    /// An object with the same identity already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The target is in a state that does not allow the operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A requested property path does not exist on the object.
    #[error("Invalid property: {0}")]
    InvalidProperty(String),

    /// Any other fault raised by the endpoint.
    #[error("Runtime fault: {0}")]
    Runtime(String),

    /// A managed object or property was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failed to reach the endpoint.
    #[error("Failed to connect to management endpoint: {0}")]
    ConnectionFailed(String),

    /// The endpoint refused the credentials.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The endpoint answered with something that is not a valid vim25 message.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl InventoryError {
    /// Whether this error is a fault raised by the endpoint itself.
    pub fn is_remote_fault(&self) -> bool {
        matches!(
            self,
            Self::HostConfig(_)
                | Self::AlreadyExists(_)
                | Self::InvalidState(_)
                | Self::InvalidProperty(_)
                | Self::Runtime(_)
        )
    }
}

/// Result type alias for inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;
