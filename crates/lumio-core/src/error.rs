//! Error types for lumio-core.
//!
//! Each protocol layer has its own error enum: the handshake, the session
//! cipher, and the request path. Transport implementations report
//! [`TransportError`], which the higher layers fold into their own variants.

use thiserror::Error;

/// Errors raised while driving the two-round handshake.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// A handshake round failed at the transport level: connection error,
    /// timeout, a non-success status on round 1, or a malformed round-1 body.
    #[error("handshake transport failure: {0}")]
    TransportFailure(String),

    /// The device rejected the round-2 authentication proof, most commonly
    /// because the credential does not match what the device has enrolled.
    #[error("handshake authentication failure: {0}")]
    AuthFailure(String),
}

/// Errors raised when opening a sealed message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// The sealed payload is shorter than a tag plus one cipher block, or
    /// its ciphertext is not a multiple of the block size.
    #[error("sealed message has invalid length ({0} bytes)")]
    InvalidLength(usize),

    /// The decrypted plaintext does not end in valid PKCS#7 padding.
    #[error("malformed padding in decrypted message")]
    MalformedPadding,

    /// The received authentication tag does not match the tag recomputed
    /// over the ciphertext and sequence number.
    #[error("authentication tag mismatch")]
    TagMismatch,
}

/// Errors raised while sending an encrypted request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request failed at the transport level or the device returned a
    /// non-success status. The session sequence has already advanced, so
    /// retrying re-seals under a new sequence number.
    #[error("request transport failure: {0}")]
    TransportFailure(String),

    /// The response body failed tag verification or decryption.
    #[error("failed to decrypt response: {0}")]
    DecryptFailure(String),

    /// The device reported an error code in its response envelope.
    #[error("device error: {0}")]
    DeviceError(String),

    /// The decrypted response could not be parsed into the expected shape.
    #[error("failed to parse response: {0}")]
    ParseError(String),
}

impl From<CipherError> for RequestError {
    fn from(err: CipherError) -> Self {
        RequestError::DecryptFailure(err.to_string())
    }
}

/// Errors raised by a [`Transport`](crate::transport::Transport)
/// implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connecting to the device failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A transport operation timed out.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The device sent a response the transport could not parse.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
