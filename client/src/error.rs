//! Client Errors

use thiserror::Error;

/// API client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, TLS, or protocol failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with an error envelope.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The server answered 2xx but the body did not match the envelope.
    #[error("unexpected response shape")]
    UnexpectedResponse,
}
