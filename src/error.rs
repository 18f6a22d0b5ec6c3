//! Error types for zero-bolt.

use thiserror::Error;

/// Result type for zero-bolt operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Category of a server-reported failure, derived from its status code.
///
/// Status codes have the shape `Neo.<Classification>.<Category>.<Title>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The request was malformed or violated a constraint.
    ClientError,
    /// The request may succeed if retried (deadlock, contention, ...).
    TransientError,
    /// The server failed internally. Also used for unknown codes.
    DatabaseError,
}

impl Classification {
    /// Classify a status code such as `Neo.ClientError.Statement.SyntaxError`.
    pub fn from_code(code: &str) -> Self {
        match code.split('.').nth(1) {
            Some("ClientError") => Classification::ClientError,
            Some("TransientError") => Classification::TransientError,
            _ => Classification::DatabaseError,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Classification::ClientError => "Client",
            Classification::TransientError => "Transient",
            Classification::DatabaseError => "Database",
        }
    }
}

/// Failure reported by the server in a FAILURE response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    /// Status code, e.g. `Neo.ClientError.Statement.SyntaxError`
    pub code: String,
    /// Human readable message
    pub message: String,
}

impl ServerError {
    /// Create a new server error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Classification derived from the status code.
    pub fn classification(&self) -> Classification {
        Classification::from_code(&self.code)
    }
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} error: {} ({})",
            self.classification().as_str(),
            self.message,
            self.code
        )
    }
}

/// Error type for zero-bolt.
#[derive(Debug, Error)]
pub enum Error {
    /// FAILURE response from the server
    #[error("{0}")]
    Server(ServerError),

    /// Protocol error (unexpected response, broken request/response ordering, etc.)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// I/O error from the transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection is closed and cannot be used
    #[error("Connection is broken")]
    ConnectionBroken,

    /// Invalid usage (e.g., empty statement)
    #[error("Invalid usage: {0}")]
    InvalidUsage(String),

    /// A reset was issued while an earlier statement still had unconsumed results,
    /// and draining those results failed.
    #[error(
        "An error has occurred due to the cancellation of executing a previous statement. \
         The result of a statement that was later reset on this connection was not consumed \
         before the reset: {0}"
    )]
    ResetBeforeConsumed(#[source] Box<Error>),
}

impl Error {
    /// Returns true if the connection stays usable after acknowledging this error.
    ///
    /// Only client and transient server failures are recoverable.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Server(err) => matches!(
                err.classification(),
                Classification::ClientError | Classification::TransientError
            ),
            _ => false,
        }
    }

    /// Returns true if the error indicates the connection is broken and cannot be reused.
    pub fn is_connection_broken(&self) -> bool {
        match self {
            Error::Io(_) | Error::ConnectionBroken | Error::Protocol(_) => true,
            Error::Server(err) => err.classification() == Classification::DatabaseError,
            Error::ResetBeforeConsumed(cause) => cause.is_connection_broken(),
            Error::InvalidUsage(_) => false,
        }
    }

    /// Get the status code if this is a server error.
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Server(err) => Some(&err.code),
            Error::ResetBeforeConsumed(cause) => cause.code(),
            _ => None,
        }
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

impl From<ServerError> for Error {
    fn from(err: ServerError) -> Self {
        Error::Server(err)
    }
}
