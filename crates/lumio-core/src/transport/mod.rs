//! Transport layer for device communication.
//!
//! The protocol core is transport-agnostic: it needs a way to POST bytes to
//! a device endpoint and read back the status, headers, and body. The
//! [`Transport`] trait captures that contract and [`HttpTransport`] is the
//! stock implementation speaking HTTP/1.1 over a raw TCP socket.

pub mod http;

#[cfg(test)]
pub(crate) mod mock;

pub use http::HttpTransport;

use async_trait::async_trait;

use crate::error::TransportError;

/// Response to a transport POST.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers in receive order.
    pub headers: Vec<(String, String)>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup; returns the first matching value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// One blocking POST round-trip to the device.
///
/// Implementations must expose response headers by name (the handshake
/// reads `Set-Cookie`) and must return the complete response body even when
/// it arrives across multiple reads.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POSTs `body` to `url` with the given extra request headers.
    async fn post(
        &self,
        url: &str,
        body: &[u8],
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn post(
        &self,
        url: &str,
        body: &[u8],
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        (**self).post(url, body, headers).await
    }
}
