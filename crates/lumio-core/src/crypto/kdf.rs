//! Session key derivation.
//!
//! A single handshake secret (the local hash) is expanded into four session
//! artifacts by hashing a short ASCII tag together with the secret and
//! truncating the digest. The `"iv"` digest does double duty: its first 12
//! bytes are the base IV and its last 4 bytes, read big-endian, are the
//! initial sequence counter. The device derives the same values, so the
//! tags, truncation lengths, and the shared IV/sequence digest are fixed by
//! the wire protocol.

use sha2::{Digest, Sha256};

/// Tag for the 16-byte encryption key.
const KEY_TAG: &[u8] = b"lsk";

/// Tag for the 28-byte authentication key.
const SIG_TAG: &[u8] = b"ldk";

/// Tag for the digest that yields both the base IV and the initial sequence.
const IV_TAG: &[u8] = b"iv";

/// Key material derived from the handshake local hash.
///
/// `key`, `sig`, and `iv` stay fixed for the life of the session; `seq` is
/// the starting point of the per-message sequence counter.
#[derive(Clone)]
pub struct SessionKeys {
    /// AES-128 encryption key.
    pub key: [u8; 16],
    /// Authentication key mixed into every message tag.
    pub sig: [u8; 28],
    /// Base IV; each message appends the sequence number to form the full IV.
    pub iv: [u8; 12],
    /// Initial sequence counter.
    pub seq: u32,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("key", &"[REDACTED]")
            .field("sig", &"[REDACTED]")
            .field("iv", &"[REDACTED]")
            .field("seq", &self.seq)
            .finish()
    }
}

/// Derives the session key material from the handshake local hash.
///
/// Deterministic: the same local hash always yields the same keys.
pub fn derive_session_keys(local_hash: &[u8]) -> SessionKeys {
    let key_digest = tagged_digest(KEY_TAG, local_hash);
    let sig_digest = tagged_digest(SIG_TAG, local_hash);
    let iv_digest = tagged_digest(IV_TAG, local_hash);

    let mut key = [0u8; 16];
    key.copy_from_slice(&key_digest[..16]);

    let mut sig = [0u8; 28];
    sig.copy_from_slice(&sig_digest[..28]);

    let mut iv = [0u8; 12];
    iv.copy_from_slice(&iv_digest[..12]);

    let seq = u32::from_be_bytes([iv_digest[28], iv_digest[29], iv_digest[30], iv_digest[31]]);

    SessionKeys { key, sig, iv, seq }
}

fn tagged_digest(tag: &[u8], local_hash: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    hasher.update(local_hash);
    hasher.finalize().into()
}
