//! Cryptographic pieces of the encrypted session protocol.
//!
//! - [`kdf`]: expands the handshake secret into the per-session key material
//! - [`session`]: the per-message seal/open transform bound to the session
//!   sequence counter

pub mod kdf;
pub mod session;

pub use kdf::{derive_session_keys, SessionKeys};
pub use session::CipherSession;
