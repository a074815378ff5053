//! Scripted in-memory device for handshake and client tests.

use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::crypto::{derive_session_keys, CipherSession};
use crate::error::TransportError;
use crate::transport::{HttpResponse, Transport};

/// In-memory device implementing the server side of the protocol.
///
/// Verifies the round-2 digest against its enrolled credential, issues a
/// fresh cookie per handshake attempt, and answers sealed requests by
/// decrypting them and sealing a canned reply under the same sequence
/// number, the way a real light does.
pub(crate) struct MockDevice {
    auth_hash: Vec<u8>,
    remote_seed: [u8; 16],
    /// Plaintext reply sealed for every successfully decrypted request.
    pub reply: Vec<u8>,
    /// Handshake1 calls answered with HTTP 500 before the device recovers.
    pub fail_handshakes: u32,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    handshake_attempts: u32,
    local_seed: Option<[u8; 16]>,
    cookie: Option<String>,
    local_hash: Option<Vec<u8>>,
    request_seqs: Vec<u32>,
    request_plaintexts: Vec<Vec<u8>>,
}

impl MockDevice {
    pub fn new(auth_hash: Vec<u8>) -> Self {
        let mut remote_seed = [0u8; 16];
        for (i, byte) in remote_seed.iter_mut().enumerate() {
            *byte = 0x10 + i as u8;
        }
        Self {
            auth_hash,
            remote_seed,
            reply: br#"{"error_code":0,"result":{"device_on":true,"brightness":50,"hue":120,"saturation":80,"color_temp":0}}"#.to_vec(),
            fail_handshakes: 0,
            state: Mutex::new(State::default()),
        }
    }

    pub fn handshake_attempts(&self) -> u32 {
        self.state.lock().unwrap().handshake_attempts
    }

    pub fn cookie(&self) -> Option<String> {
        self.state.lock().unwrap().cookie.clone()
    }

    pub fn request_seqs(&self) -> Vec<u32> {
        self.state.lock().unwrap().request_seqs.clone()
    }

    pub fn request_plaintexts(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().request_plaintexts.clone()
    }

    fn handshake1(&self, body: &[u8]) -> HttpResponse {
        let mut state = self.state.lock().unwrap();
        state.handshake_attempts += 1;
        if state.handshake_attempts <= self.fail_handshakes {
            return status(500);
        }

        let mut local_seed = [0u8; 16];
        local_seed.copy_from_slice(&body[..16]);
        state.local_seed = Some(local_seed);
        state.local_hash = None;

        let cookie = format!("SESSIONID={:08x}", state.handshake_attempts);
        state.cookie = Some(cookie.clone());

        // Real devices send more than the seed; only the first 16 bytes of
        // the body are the seed.
        let mut body = self.remote_seed.to_vec();
        body.extend_from_slice(b"trailing");

        HttpResponse {
            status: 200,
            headers: vec![("Set-Cookie".into(), format!("{};TIMEOUT=86400", cookie))],
            body,
        }
    }

    fn handshake2(&self, body: &[u8], headers: &[(&str, &str)]) -> HttpResponse {
        let mut state = self.state.lock().unwrap();
        let Some(local_seed) = state.local_seed else {
            return status(400);
        };
        if !cookie_matches(headers, state.cookie.as_deref()) {
            return status(401);
        }

        let mut hasher = Sha256::new();
        hasher.update(self.remote_seed);
        hasher.update(local_seed);
        hasher.update(&self.auth_hash);
        if hasher.finalize().as_slice() != body {
            return status(403);
        }

        let mut local_hash = local_seed.to_vec();
        local_hash.extend_from_slice(&self.remote_seed);
        local_hash.extend_from_slice(&self.auth_hash);
        state.local_hash = Some(local_hash);
        status(200)
    }

    fn request(&self, url: &str, body: &[u8], headers: &[(&str, &str)]) -> HttpResponse {
        let mut state = self.state.lock().unwrap();
        if !cookie_matches(headers, state.cookie.as_deref()) {
            return status(401);
        }
        let Some(local_hash) = state.local_hash.clone() else {
            return status(400);
        };
        let Some(seq) = url
            .split("seq=")
            .nth(1)
            .and_then(|seq| seq.parse::<u32>().ok())
        else {
            return status(400);
        };

        let mut keys = derive_session_keys(&local_hash);
        keys.seq = seq;
        let session = CipherSession::new(keys.clone());
        let Ok(plaintext) = session.open(body) else {
            return status(400);
        };
        state.request_seqs.push(seq);
        state.request_plaintexts.push(plaintext);

        // Seal the reply so it lands on the request's sequence number.
        keys.seq = seq.wrapping_sub(1);
        let mut session = CipherSession::new(keys);
        HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: session.seal(&self.reply),
        }
    }
}

#[async_trait]
impl Transport for MockDevice {
    async fn post(
        &self,
        url: &str,
        body: &[u8],
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        if url.contains("/handshake1") {
            Ok(self.handshake1(body))
        } else if url.contains("/handshake2") {
            Ok(self.handshake2(body, headers))
        } else if url.contains("/request") {
            Ok(self.request(url, body, headers))
        } else {
            Ok(status(404))
        }
    }
}

/// Transport whose connections always fail.
pub(crate) struct DeadTransport;

#[async_trait]
impl Transport for DeadTransport {
    async fn post(
        &self,
        _url: &str,
        _body: &[u8],
        _headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        Err(TransportError::ConnectionFailed(
            "connection refused".into(),
        ))
    }
}

fn status(status: u16) -> HttpResponse {
    HttpResponse {
        status,
        headers: Vec::new(),
        body: Vec::new(),
    }
}

fn cookie_matches(headers: &[(&str, &str)], expected: Option<&str>) -> bool {
    let sent = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("Cookie"))
        .map(|(_, value)| *value);
    match expected {
        Some(expected) => sent == Some(expected),
        None => sent.is_none(),
    }
}
