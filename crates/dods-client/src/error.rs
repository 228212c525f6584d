//! Error types for the DAP2 client.

use dap_wire::TransportError;
use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, DodsError>;

/// Errors raised while opening or reading a DAP2 dataset.
///
/// Several variants are also used as recorded diagnostics: problems that are
/// recovered during `open()` or inside a read batch are logged and appended
/// to the dataset's diagnostic list instead of being returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DodsError {
    /// The transport failed; fatal to the operation in flight.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The dataset URL uses a scheme the client cannot reach.
    #[error("invalid dataset location: {0}")]
    InvalidLocation(String),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A wire declaration that has no typed representation.
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    /// An attribute table matched no declaration and was attached globally.
    #[error("attribute table matches no variable: {0}")]
    AttributeResolutionMiss(String),

    /// A requested entity had no counterpart in the data response.
    #[error("no counterpart in data response for: {0}")]
    CorrelationMiss(String),

    /// Unlimited or extra dimension declarations that could not be used.
    #[error("malformed reserved attribute: {0}")]
    MalformedReservedAttribute(String),

    /// Response values could not be shaped into the entity's array.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// A constraint expression could not be built or parsed.
    #[error("invalid constraint expression: {0}")]
    InvalidConstraint(String),

    /// The operation was cancelled through its cancel flag.
    #[error("operation cancelled")]
    Cancelled,

    /// No entity with the given name.
    #[error("not found: {0}")]
    NotFound(String),
}

impl DodsError {
    /// Create an UnsupportedConstruct error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedConstruct(msg.into())
    }

    /// Create a Conversion error.
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    /// Create an InvalidConstraint error.
    pub fn invalid_constraint(msg: impl Into<String>) -> Self {
        Self::InvalidConstraint(msg.into())
    }

    /// Create a MalformedReservedAttribute error.
    pub fn malformed_reserved(msg: impl Into<String>) -> Self {
        Self::MalformedReservedAttribute(msg.into())
    }
}
