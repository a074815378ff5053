//! HTTP/1.1 transport over raw TCP sockets.
//!
//! Devices in this family run a non-compliant HTTP server that rejects
//! requests carrying lowercase header names. Mainstream HTTP clients
//! (reqwest, hyper, ureq) lowercase all headers following HTTP/2
//! conventions, so requests are assembled by hand with title-case headers
//! and written straight to a TCP socket. Each POST opens a fresh
//! connection.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::error::TransportError;
use crate::transport::{HttpResponse, Transport};

/// HTTP transport using one TCP connection per request.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport with the given connect/read/write timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn read_raw_response(&self, stream: &mut TcpStream) -> Result<Vec<u8>, TransportError> {
        let mut raw = Vec::with_capacity(1024);
        let mut buf = [0u8; 4096];

        loop {
            let n = self.read_some(stream, &mut buf).await?;
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);

            // Once the headers are complete, keep reading until the body
            // reaches the announced Content-Length.
            if let Some(header_end) = header_end(&raw) {
                let header_text = String::from_utf8_lossy(&raw[..header_end]).into_owned();
                let body_start = header_end + 4;
                if let Some(expected) = content_length(&header_text) {
                    while raw.len() - body_start < expected {
                        let n = self.read_some(stream, &mut buf).await?;
                        if n == 0 {
                            break;
                        }
                        raw.extend_from_slice(&buf[..n]);
                    }
                }
                break;
            }
        }

        Ok(raw)
    }

    async fn read_some(
        &self,
        stream: &mut TcpStream,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        timeout(self.timeout, stream.read(buf))
            .await
            .map_err(|_| TransportError::Timeout("read timed out".into()))?
            .map_err(|e| TransportError::ConnectionFailed(format!("read failed: {}", e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        url: &str,
        body: &[u8],
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        let target = Target::parse(url)?;
        debug!(host = %target.host, port = target.port, path = %target.path, bytes = body.len(), "POST");

        let mut request = format!(
            "POST {} HTTP/1.1\r\n\
             Host: {}:{}\r\n\
             Content-Type: application/octet-stream\r\n\
             Content-Length: {}\r\n\
             Accept: */*\r\n",
            target.path,
            target.host,
            target.port,
            body.len()
        );
        for (name, value) in headers {
            request.push_str(name);
            request.push_str(": ");
            request.push_str(value);
            request.push_str("\r\n");
        }
        request.push_str("\r\n");

        let addr = format!("{}:{}", target.host, target.port);
        let mut stream = timeout(self.timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| TransportError::Timeout("connection timed out".into()))?
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        let mut message = request.into_bytes();
        message.extend_from_slice(body);
        timeout(self.timeout, stream.write_all(&message))
            .await
            .map_err(|_| TransportError::Timeout("write timed out".into()))?
            .map_err(|e| TransportError::ConnectionFailed(format!("write failed: {}", e)))?;

        let raw = self.read_raw_response(&mut stream).await?;
        let response = parse_response(&raw)?;
        debug!(status = response.status, bytes = response.body.len(), "response");
        Ok(response)
    }
}

struct Target {
    host: String,
    port: u16,
    path: String,
}

impl Target {
    fn parse(url: &str) -> Result<Self, TransportError> {
        let rest = url.strip_prefix("http://").ok_or_else(|| {
            TransportError::ConnectionFailed(format!("only http:// URLs are supported: {}", url))
        })?;
        let (authority, path) = match rest.find('/') {
            Some(index) => (&rest[..index], &rest[index..]),
            None => (rest, "/"),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    TransportError::ConnectionFailed(format!("invalid port in URL: {}", url))
                })?;
                (host, port)
            }
            None => (authority, 80),
        };
        if host.is_empty() {
            return Err(TransportError::ConnectionFailed(format!(
                "missing host in URL: {}",
                url
            )));
        }
        Ok(Self {
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }
}

/// Position of the `\r\n\r\n` header terminator.
fn header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(headers: &str) -> Option<usize> {
    headers.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

fn parse_response(raw: &[u8]) -> Result<HttpResponse, TransportError> {
    let header_end = header_end(raw)
        .ok_or_else(|| TransportError::InvalidResponse("missing header terminator".into()))?;
    let header_text = String::from_utf8_lossy(&raw[..header_end]);
    let mut lines = header_text.lines();

    let status_line = lines
        .next()
        .ok_or_else(|| TransportError::InvalidResponse("empty response".into()))?;
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| {
            TransportError::InvalidResponse(format!("bad status line: {}", status_line))
        })?;

    let headers = lines
        .filter_map(|line| {
            line.split_once(':')
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        })
        .collect();

    Ok(HttpResponse {
        status,
        headers,
        body: raw[header_end + 4..].to_vec(),
    })
}
