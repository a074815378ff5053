//! JSON command construction for device requests.
//!
//! Commands are plain JSON strings sealed by the session cipher before
//! transmission. The constants and builders here cover the device-info and
//! state-setting methods a light accepts; anything else can be sent with
//! [`Light::send_request`](crate::client::Light::send_request) directly.

/// Query the device state: power, brightness, hue, saturation, color
/// temperature, and assorted metadata.
pub const GET_DEVICE_INFO: &str = r#"{"method":"get_device_info"}"#;

/// Turn the light on or off.
pub fn set_power(on: bool) -> String {
    format!(
        r#"{{"method":"set_device_info","params":{{"device_on":{}}}}}"#,
        on
    )
}

/// Set brightness as a percentage (1-100).
pub fn set_brightness(level: u8) -> String {
    format!(
        r#"{{"method":"set_device_info","params":{{"brightness":{}}}}}"#,
        level
    )
}

/// Set color by hue (0-360 degrees) and saturation (0-100).
///
/// Setting a hue also takes the light out of color-temperature mode.
pub fn set_color(hue: u16, saturation: u8) -> String {
    format!(
        r#"{{"method":"set_device_info","params":{{"hue":{},"saturation":{}}}}}"#,
        hue, saturation
    )
}

/// Set white color temperature in kelvin (typically 2500-6500).
pub fn set_color_temp(kelvin: u16) -> String {
    format!(
        r#"{{"method":"set_device_info","params":{{"color_temp":{}}}}}"#,
        kelvin
    )
}
