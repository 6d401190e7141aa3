//! Error types for chronolog-client.
//!
//! The taxonomy is closed: every fault raised by the transport, the codec or
//! the handshake is folded into one of the variants below before it leaves
//! the crate.

use thiserror::Error;

/// Main error type for all client operations.
#[derive(Debug, Error)]
pub enum ChronologError {
    /// The server address could not be parsed, looked up or reached.
    ///
    /// Raised only while constructing a client.
    #[error("cannot resolve endpoint `{address}`: {reason}")]
    Resolution {
        /// Address as supplied by the caller.
        address: String,
        /// Why resolution failed.
        reason: String,
    },

    /// A procedure name is not offered by the server.
    ///
    /// Raised only while constructing a client.
    #[error("cannot bind procedure `{name}`: {reason}")]
    Binding {
        /// Procedure name that failed to bind.
        name: String,
        /// Why binding failed.
        reason: String,
    },

    /// Connection lost, send/receive failure, server-side fault or timeout.
    #[error("transport fault: {0}")]
    Transport(String),

    /// Request or response payload does not match the expected shape.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Well-formed response carrying a non-zero application status.
    #[error("server returned status {status}")]
    Server {
        /// Status code produced by the server.
        status: i32,
    },
}

impl ChronologError {
    /// Build a resolution error for `address`.
    pub fn resolution(address: impl Into<String>, reason: impl ToString) -> Self {
        Self::Resolution {
            address: address.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a binding error for procedure `name`.
    pub fn binding(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Binding {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that abort client construction.
    pub fn is_construction_error(&self) -> bool {
        matches!(self, Self::Resolution { .. } | Self::Binding { .. })
    }

    /// True for errors raised by an individual call.
    pub fn is_call_error(&self) -> bool {
        !self.is_construction_error()
    }

    /// Server status carried by this error, if it is a [`ChronologError::Server`].
    pub fn server_status(&self) -> Option<i32> {
        match self {
            Self::Server { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ChronologError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for ChronologError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for ChronologError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for ChronologError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using ChronologError.
pub type Result<T> = std::result::Result<T, ChronologError>;
