//! High-level device client.
//!
//! [`Light`] ties the pieces together: it drives the handshake (under a
//! bounded retry policy), derives the session keys, and exposes encrypted
//! request methods. Every request method takes `&mut self` because the
//! session sequence counter and cookie are single-writer state; for
//! concurrent control, connect one client per task.

use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use crate::commands;
use crate::credentials::Credentials;
use crate::crypto::{derive_session_keys, CipherSession};
use crate::error::{HandshakeError, RequestError};
use crate::handshake::perform_handshake;
use crate::response::{DeviceInfo, DeviceResponse};
use crate::transport::{HttpTransport, Transport};
use crate::DEFAULT_TIMEOUT;

/// Retry policy for the handshake at connect time.
///
/// Delays double per failed attempt, starting at `initial_delay` and capped
/// at `max_delay`. The default keeps the 15-second spacing devices are used
/// to, but stops after four attempts instead of retrying forever.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total handshake attempts before giving up.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Upper bound for the backoff.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and initial delay.
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay: initial_delay.saturating_mul(8),
        }
    }

    /// Delay to wait after `failed_attempts` attempts have failed.
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(16);
        self.initial_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_secs(15),
            max_delay: Duration::from_secs(120),
        }
    }
}

/// Configuration for connecting to a device.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the device's app endpoint, e.g. `http://192.168.1.10/app`.
    pub base_url: String,
    /// Long-term credential enrolled on the device.
    pub credentials: Credentials,
    /// Connection and I/O timeout per transport call.
    pub timeout: Duration,
    /// Handshake retry policy.
    pub retry: RetryPolicy,
}

impl ClientConfig {
    /// Creates a configuration with default timeout and retry policy.
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the transport timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the handshake retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Client for one smart light with an established encrypted session.
///
/// # Example
///
/// ```no_run
/// use lumio_core::{ClientConfig, Credentials, Light};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ClientConfig::new(
///         "http://192.168.1.10/app",
///         Credentials::new("user@example.com", "password"),
///     );
///     let mut light = Light::connect(config).await?;
///
///     let info = light.device_info().await?;
///     light.set_power(!info.device_on).await?;
///     Ok(())
/// }
/// ```
pub struct Light {
    base_url: String,
    cookie: String,
    session: CipherSession,
    transport: Box<dyn Transport>,
    credentials: Credentials,
}

impl Light {
    /// Connects over the stock HTTP transport and establishes a session.
    ///
    /// The handshake is retried per `config.retry`; the last handshake
    /// error is returned once the attempt budget is spent.
    pub async fn connect(config: ClientConfig) -> Result<Self, HandshakeError> {
        let transport = HttpTransport::new(config.timeout);
        Self::connect_with_transport(config, Box::new(transport)).await
    }

    /// Connects over a caller-supplied transport.
    pub async fn connect_with_transport(
        config: ClientConfig,
        transport: Box<dyn Transport>,
    ) -> Result<Self, HandshakeError> {
        let mut last_error = None;

        for attempt in 1..=config.retry.max_attempts {
            match perform_handshake(
                transport.as_ref(),
                &config.base_url,
                &config.credentials,
            )
            .await
            {
                Ok(outcome) => {
                    let keys = derive_session_keys(&outcome.local_hash);
                    debug!(attempt, seq = keys.seq, "session established");
                    return Ok(Self {
                        base_url: config.base_url,
                        cookie: outcome.cookie,
                        session: CipherSession::new(keys),
                        transport,
                        credentials: config.credentials,
                    });
                }
                Err(e) => {
                    warn!(attempt, error = %e, "handshake attempt failed");
                    last_error = Some(e);
                    if attempt < config.retry.max_attempts {
                        tokio::time::sleep(config.retry.delay_for(attempt)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            HandshakeError::TransportFailure("retry policy allows no attempts".into())
        }))
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current session sequence counter.
    pub fn seq(&self) -> u32 {
        self.session.seq()
    }

    /// Credential the session was established with.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Seals a JSON command, sends it, and opens the response.
    pub async fn send_request(&mut self, command: &str) -> Result<String, RequestError> {
        let plaintext = self.send_raw(command.as_bytes()).await?;
        String::from_utf8(plaintext)
            .map_err(|e| RequestError::DecryptFailure(format!("response is not UTF-8: {}", e)))
    }

    /// Seals an opaque payload, sends it, and opens the response.
    ///
    /// The sequence advances as part of sealing, before the request is
    /// transmitted, so a transport failure still consumes a sequence number.
    pub async fn send_raw(&mut self, payload: &[u8]) -> Result<Vec<u8>, RequestError> {
        let sealed = self.session.seal(payload);
        let url = format!("{}/request?seq={}", self.base_url, self.session.seq());
        debug!(seq = self.session.seq(), bytes = sealed.len(), "sending request");

        let mut headers: Vec<(&str, &str)> = Vec::new();
        if !self.cookie.is_empty() {
            headers.push(("Cookie", self.cookie.as_str()));
        }
        let response = self
            .transport
            .post(&url, &sealed, &headers)
            .await
            .map_err(|e| RequestError::TransportFailure(e.to_string()))?;
        if !response.is_success() {
            return Err(RequestError::TransportFailure(format!(
                "request returned status {}",
                response.status
            )));
        }

        let plaintext = self.session.open(&response.body)?;
        Ok(plaintext)
    }

    /// Queries the device state.
    pub async fn device_info(&mut self) -> Result<DeviceInfo, RequestError> {
        let response = self.send_request(commands::GET_DEVICE_INFO).await?;
        let parsed: DeviceResponse<DeviceInfo> = serde_json::from_str(&response)
            .map_err(|e| RequestError::ParseError(e.to_string()))?;
        parsed.into_result()
    }

    /// Turns the light on or off.
    pub async fn set_power(&mut self, on: bool) -> Result<(), RequestError> {
        self.ack(&commands::set_power(on)).await
    }

    /// Flips the power state and returns the new state.
    pub async fn toggle(&mut self) -> Result<bool, RequestError> {
        let info = self.device_info().await?;
        let target = !info.device_on;
        self.set_power(target).await?;
        Ok(target)
    }

    /// Sets brightness as a percentage (1-100).
    pub async fn set_brightness(&mut self, level: u8) -> Result<(), RequestError> {
        self.ack(&commands::set_brightness(level)).await
    }

    /// Sets color by hue (0-360) and saturation (0-100).
    pub async fn set_color(&mut self, hue: u16, saturation: u8) -> Result<(), RequestError> {
        self.ack(&commands::set_color(hue, saturation)).await
    }

    /// Sets white color temperature in kelvin.
    pub async fn set_color_temp(&mut self, kelvin: u16) -> Result<(), RequestError> {
        self.ack(&commands::set_color_temp(kelvin)).await
    }

    async fn ack(&mut self, command: &str) -> Result<(), RequestError> {
        let response = self.send_request(command).await?;
        let parsed: DeviceResponse<serde_json::Value> = serde_json::from_str(&response)
            .map_err(|e| RequestError::ParseError(e.to_string()))?;
        parsed.into_ack()
    }
}

impl fmt::Debug for Light {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Light")
            .field("base_url", &self.base_url)
            .field("cookie", &"[REDACTED]")
            .field("session", &self.session)
            .finish()
    }
}
