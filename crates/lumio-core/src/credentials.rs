//! Long-term credential material for device authentication.
//!
//! The handshake never transmits the credential itself; it is mixed into
//! digests on both sides. Devices enroll a credential derived from the
//! owner's username and password, each hashed individually with SHA-256 and
//! concatenated. A credential can also be supplied as precomputed opaque
//! bytes, for callers that store the derived material instead of the
//! password (for example a credentials file hashed once at startup).
//!
//! # Security
//!
//! Passwords are held in a [`SecretString`] from the `secrecy` crate so they
//! cannot leak through accidental logging, and `Debug` output is redacted.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

/// Long-term credential used to authenticate the handshake.
///
/// # Example
///
/// ```
/// use lumio_core::Credentials;
///
/// let creds = Credentials::new("user@example.com", "password123");
/// // 32 bytes for the username digest, 32 for the password digest
/// assert_eq!(creds.auth_hash().len(), 64);
/// ```
#[derive(Clone)]
pub struct Credentials {
    inner: Inner,
}

#[derive(Clone)]
enum Inner {
    /// Username and password as enrolled on the device.
    UserPass {
        username: String,
        password: SecretString,
    },
    /// Precomputed credential bytes.
    Hash(Vec<u8>),
}

impl Credentials {
    /// Creates credentials from the username and password enrolled on the
    /// device.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            inner: Inner::UserPass {
                username: username.into(),
                password: SecretString::from(password.into()),
            },
        }
    }

    /// Creates credentials from precomputed credential bytes.
    ///
    /// The bytes are used as-is in every handshake digest. Use this when the
    /// derived material is stored instead of the password itself.
    pub fn from_hash(hash: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: Inner::Hash(hash.into()),
        }
    }

    /// Creates credentials by hashing raw credential material, such as the
    /// contents of a credentials file, with SHA-256.
    pub fn from_material(material: &[u8]) -> Self {
        Self::from_hash(Sha256::digest(material).to_vec())
    }

    /// Returns the opaque credential bytes mixed into the handshake.
    ///
    /// For username/password credentials this is
    /// `SHA256(username) + SHA256(password)`.
    pub fn auth_hash(&self) -> Vec<u8> {
        match &self.inner {
            Inner::UserPass { username, password } => {
                let mut hash = Vec::with_capacity(64);
                hash.extend_from_slice(&Sha256::digest(username.as_bytes()));
                hash.extend_from_slice(&Sha256::digest(password.expose_secret().as_bytes()));
                hash
            }
            Inner::Hash(hash) => hash.clone(),
        }
    }
}

impl PartialEq for Credentials {
    fn eq(&self, other: &Self) -> bool {
        self.auth_hash() == other.auth_hash()
    }
}

impl Eq for Credentials {}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::UserPass { username, .. } => f
                .debug_struct("Credentials")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Inner::Hash(_) => f
                .debug_struct("Credentials")
                .field("hash", &"[REDACTED]")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_hash_is_concatenated_digests() {
        let creds = Credentials::new("user", "pass");
        let hash = creds.auth_hash();
        assert_eq!(hash.len(), 64);
        assert_eq!(&hash[..32], Sha256::digest(b"user").as_slice());
        assert_eq!(&hash[32..], Sha256::digest(b"pass").as_slice());
    }

    #[test]
    fn test_from_hash_passes_bytes_through() {
        let creds = Credentials::from_hash(vec![0xAB; 32]);
        assert_eq!(creds.auth_hash(), vec![0xAB; 32]);
    }

    #[test]
    fn test_from_material_hashes_once() {
        let creds = Credentials::from_material(b"raw file bytes");
        assert_eq!(
            creds.auth_hash(),
            Sha256::digest(b"raw file bytes").to_vec()
        );
    }

    #[test]
    fn test_equality_compares_derived_material() {
        let a = Credentials::new("user", "pass");
        let b = Credentials::new("user", "pass");
        let c = Credentials::new("user", "other");
        let d = Credentials::from_hash(a.auth_hash());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, d);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new("user@example.com", "secret123");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("user@example.com"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret123"));

        let hashed = Credentials::from_hash(vec![0x42; 32]);
        assert!(format!("{:?}", hashed).contains("[REDACTED]"));
    }
}
