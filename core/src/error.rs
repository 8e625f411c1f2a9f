//! Error types for request dispatch and response classification.
//!
//! # Design
//! Every per-request failure ends up inside a failure response as a
//! `NetworkError`; nothing here is returned across the `request` boundary.
//! The leaf enums keep the origin of a failure visible: the payload codec
//! (`ParsingError`), a registered fake (`FakeError`), the transport
//! (`TransportError`) or the caller (`CancellationError`).

use thiserror::Error;

/// Failures of the payload codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsingError {
    /// The bytes are not valid JSON.
    #[error("malformed JSON payload: {0}")]
    Malformed(String),

    /// The structure is neither a mapping nor a sequence of mappings.
    #[error("unserializable JSON structure: {0}")]
    Unserializable(String),
}

/// Failures of a registered fake, raised when the fake is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FakeError {
    /// The bundle could not resolve the registered file name.
    #[error("fake file not found: {name}")]
    FileNotFound { name: String },

    /// The file exists but could not be read.
    #[error("fake file {name} could not be read: {message}")]
    Unreadable { name: String, message: String },
}

/// Network or protocol failures reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("request timeout")]
    Timeout,

    #[error("invalid request: {0}")]
    Build(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_builder() {
            TransportError::Build(err.to_string())
        } else if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// The caller cancelled the request before it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("request cancelled")]
pub struct CancellationError;

/// Error carried by every failure response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// The server (or a fake) answered with a status outside 200..=299.
    #[error("HTTP error ({status})")]
    Status { status: u16 },

    #[error(transparent)]
    Parsing(#[from] ParsingError),

    #[error(transparent)]
    Fake(#[from] FakeError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Cancelled(#[from] CancellationError),

    /// The body of an image request is not a decodable image.
    #[error("image decoding failed: {0}")]
    ImageDecoding(String),

    /// Base URL and path do not form a valid URL.
    #[error("invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// The parameter type cannot be used with the verb, or the parameters
    /// cannot be encoded.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

/// Failures while constructing a `Networking` client.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No runtime handle was given and none is current.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl NetworkError {
    /// HTTP status code behind the failure, if the failure came from one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            NetworkError::Status { status } => Some(*status),
            _ => None,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, NetworkError::Cancelled(_))
    }
}
