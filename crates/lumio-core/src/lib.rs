//! Core library for controlling KLAP-style smart lights over an
//! authenticated, encrypted session.
//!
//! The device speaks a small challenge-response protocol over HTTP: one
//! handshake authenticates the operator, and every command afterwards is
//! carried inside an encrypted, integrity-tagged message bound to a
//! per-session sequence counter.
//!
//! # Protocol Overview
//!
//! 1. **Handshake 1**: the client POSTs 16 random bytes to
//!    `<base>/handshake1`. The device answers with its own 16-byte seed and
//!    a session cookie.
//! 2. **Handshake 2**: the client POSTs
//!    `SHA256(remote_seed + local_seed + credential)` to
//!    `<base>/handshake2` with the cookie attached. A success status means
//!    the credential matched.
//! 3. **Key derivation**: both sides expand
//!    `local_seed + remote_seed + credential` into an AES-128 key, an
//!    authentication key, a base IV, and an initial sequence counter by
//!    hashing the secret under short ASCII tags.
//! 4. **Requests**: each command is PKCS#7-padded, AES-128-CBC encrypted
//!    under an IV of `base_iv + sequence`, prefixed with a SHA-256 tag over
//!    the authentication key, sequence, and ciphertext, and POSTed to
//!    `<base>/request?seq=<sequence>`. The response body is a sealed
//!    message under the same sequence number.
//!
//! # Example
//!
//! ```no_run
//! use lumio_core::{ClientConfig, Credentials, Light};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new(
//!         "http://192.168.1.10/app",
//!         Credentials::new("user@example.com", "password"),
//!     );
//!     let mut light = Light::connect(config).await?;
//!
//!     let info = light.device_info().await?;
//!     println!("on: {}, brightness: {}", info.device_on, info.brightness);
//!
//!     light.set_power(true).await?;
//!     light.set_brightness(60).await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

pub mod client;
pub mod commands;
pub mod credentials;
pub mod crypto;
pub mod error;
pub mod handshake;
pub mod response;
pub mod transport;

pub use client::{ClientConfig, Light, RetryPolicy};
pub use credentials::Credentials;
pub use crypto::{derive_session_keys, CipherSession, SessionKeys};
pub use error::{CipherError, HandshakeError, RequestError, TransportError};
pub use response::{DeviceInfo, DeviceResponse};

/// The version of the lumio-core library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default connection and I/O timeout for transport operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
