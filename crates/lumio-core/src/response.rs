//! Typed device response structures.
//!
//! Every decrypted response is a JSON envelope of the form
//! `{"error_code":0,"result":{...}}`. A nonzero `error_code` means the
//! device rejected the command even though the transport and cipher layers
//! succeeded.

use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// Response envelope wrapping every device reply.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceResponse<T> {
    /// Zero on success; device-specific error code otherwise.
    #[serde(default)]
    pub error_code: i32,
    /// Method result, present on success for query methods.
    pub result: Option<T>,
}

impl<T> DeviceResponse<T> {
    /// Extracts the result payload, turning a device-reported error code
    /// into a typed failure.
    pub fn into_result(self) -> Result<T, RequestError> {
        if self.error_code != 0 {
            return Err(RequestError::DeviceError(format!(
                "error_code {}",
                self.error_code
            )));
        }
        self.result
            .ok_or_else(|| RequestError::ParseError("response has no result".into()))
    }

    /// Checks the error code for set-style methods that return no result.
    pub fn into_ack(self) -> Result<(), RequestError> {
        if self.error_code != 0 {
            return Err(RequestError::DeviceError(format!(
                "error_code {}",
                self.error_code
            )));
        }
        Ok(())
    }
}

/// State reported by `get_device_info`.
///
/// Fields default to zero values because devices omit the ones that do not
/// apply to their current mode (a light in color mode omits `color_temp`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeviceInfo {
    /// Whether the light is on.
    #[serde(default)]
    pub device_on: bool,
    /// Brightness percentage (1-100).
    #[serde(default)]
    pub brightness: u8,
    /// Hue in degrees (0-360).
    #[serde(default)]
    pub hue: u16,
    /// Saturation percentage (0-100).
    #[serde(default)]
    pub saturation: u8,
    /// White color temperature in kelvin; 0 when in color mode.
    #[serde(default)]
    pub color_temp: u16,
}
