//! Conversion of raw sensor codes into physical units.
//!
//! The sensor reports SHT1x codes: a measurement response such as `80 04 19 24 04 ca 9c dc`
//! carries the temperature code big-endian and signed at offsets 2..4 and the humidity code
//! big-endian and unsigned at offsets 4..6. The remaining bytes are not used.
//! See <https://github.com/edorfaus/TEMPered/wiki/SHT1x> for the formulas.

/// Size of every command frame and response frame exchanged with the sensor.
pub const FRAME_LEN: usize = 8;

const TEMP_OFFSET: usize = 2;
const HUMIDITY_OFFSET: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature_celsius: f32,
    pub relative_humidity_pct: f32,
}

impl Reading {
    /// Decodes a measurement response frame.
    pub fn from_response(response: &[u8; FRAME_LEN]) -> Self {
        let raw_temp = i16::from_be_bytes([response[TEMP_OFFSET], response[TEMP_OFFSET + 1]]);
        let raw_rh = u16::from_be_bytes([response[HUMIDITY_OFFSET], response[HUMIDITY_OFFSET + 1]]);

        let temperature_celsius = decode_temperature(raw_temp);
        let relative_humidity_pct = decode_humidity(raw_rh, temperature_celsius);
        Self {
            temperature_celsius,
            relative_humidity_pct,
        }
    }
}

pub fn decode_temperature(raw: i16) -> f32 {
    (-39.7 + 0.01 * f64::from(raw)) as f32
}

/// Temperature compensated relative humidity, saturated to 0..=100 %.
pub fn decode_humidity(raw: u16, temperature_celsius: f32) -> f32 {
    let rh = f64::from(raw);
    let linear = -2.0468 + 0.0367 * rh - 1.5955e-6 * rh * rh;
    let compensated = (f64::from(temperature_celsius) - 25.0) * (0.01 + 0.00008 * rh) + linear;
    clamp_humidity(compensated) as f32
}

/// Anything above 99 % is reported as 100 %, not 99 %.
pub fn clamp_humidity(rh: f64) -> f64 {
    if rh <= 0.0 {
        0.0
    } else if rh > 99.0 {
        100.0
    } else {
        rh
    }
}

/// Linear user correction applied to the temperature. Humidity is never adjusted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub scale: f32,
    pub offset: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
        }
    }
}

impl Calibration {
    pub fn with_offset(offset: f32) -> Self {
        Self {
            offset,
            ..Default::default()
        }
    }

    pub fn apply(&self, reading: Reading) -> Reading {
        Reading {
            temperature_celsius: reading.temperature_celsius * self.scale + self.offset,
            ..reading
        }
    }
}
