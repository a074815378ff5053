//! Two-round challenge-response handshake.
//!
//! Round 1 POSTs a fresh 16-byte random seed to the device, which answers
//! with its own seed in the first 16 body bytes and a session cookie in a
//! `Set-Cookie` header. Round 2 proves possession of the credential by
//! POSTing `SHA256(remote_seed + local_seed + credential)` with the cookie
//! attached. On success the retained secret is
//! `local_seed + remote_seed + credential`. The seed ordering differs from
//! the wire proof, and both orderings must be kept exactly as they are or
//! the derived session keys will not match the device's.
//!
//! A failed round invalidates the whole attempt: seeds and cookie are
//! per-attempt, so recovery is a fresh handshake, never a partial retry.

use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::credentials::Credentials;
use crate::error::HandshakeError;
use crate::transport::Transport;

/// Seed length in bytes for both parties.
pub const SEED_LEN: usize = 16;

/// Result of a successful handshake.
pub struct HandshakeOutcome {
    /// Session cookie to attach to every subsequent request.
    pub cookie: String,
    /// Root secret for session key derivation. Never transmitted.
    pub local_hash: Vec<u8>,
}

impl std::fmt::Debug for HandshakeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeOutcome")
            .field("cookie", &self.cookie)
            .field("local_hash", &"[REDACTED]")
            .finish()
    }
}

/// Runs one complete handshake attempt against the device at `base_url`.
pub async fn perform_handshake<T: Transport + ?Sized>(
    transport: &T,
    base_url: &str,
    credentials: &Credentials,
) -> Result<HandshakeOutcome, HandshakeError> {
    let auth_hash = credentials.auth_hash();

    let mut local_seed = [0u8; SEED_LEN];
    rand::rng().fill_bytes(&mut local_seed);
    debug!(local_seed = %hex::encode(local_seed), "starting handshake");

    // Round 1: exchange seeds, capture the session cookie.
    let url = format!("{}/handshake1", base_url);
    let response = transport
        .post(&url, &local_seed, &[])
        .await
        .map_err(|e| HandshakeError::TransportFailure(e.to_string()))?;
    if !response.is_success() {
        return Err(HandshakeError::TransportFailure(format!(
            "handshake1 returned status {}",
            response.status
        )));
    }
    if response.body.len() < SEED_LEN {
        return Err(HandshakeError::TransportFailure(format!(
            "handshake1 body too short: {} bytes",
            response.body.len()
        )));
    }
    let mut remote_seed = [0u8; SEED_LEN];
    remote_seed.copy_from_slice(&response.body[..SEED_LEN]);

    let cookie = response
        .header("Set-Cookie")
        .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
        .unwrap_or_default();
    debug!(
        remote_seed = %hex::encode(remote_seed),
        cookie = %if cookie.is_empty() { "<none>" } else { &cookie },
        "handshake1 completed"
    );

    // Round 2: prove credential possession. The wire digest hashes the
    // remote seed first.
    let proof = round2_digest(&remote_seed, &local_seed, &auth_hash);
    let url = format!("{}/handshake2", base_url);
    let mut headers: Vec<(&str, &str)> = Vec::new();
    if !cookie.is_empty() {
        headers.push(("Cookie", cookie.as_str()));
    }
    let response = transport
        .post(&url, &proof, &headers)
        .await
        .map_err(|e| HandshakeError::TransportFailure(e.to_string()))?;
    if !response.is_success() {
        return Err(HandshakeError::AuthFailure(format!(
            "handshake2 returned status {}",
            response.status
        )));
    }
    debug!("handshake2 completed");

    // The retained secret concatenates the local seed first.
    let mut local_hash = Vec::with_capacity(2 * SEED_LEN + auth_hash.len());
    local_hash.extend_from_slice(&local_seed);
    local_hash.extend_from_slice(&remote_seed);
    local_hash.extend_from_slice(&auth_hash);

    Ok(HandshakeOutcome { cookie, local_hash })
}

fn round2_digest(remote_seed: &[u8], local_seed: &[u8], auth_hash: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(remote_seed);
    hasher.update(local_seed);
    hasher.update(auth_hash);
    hasher.finalize().into()
}
