//! One-shot temperature/humidity readings.
//!
//! The lab is wired to a DHT11 on a single GPIO pin. Reads are blocking
//! and fail often, callers should run them on a blocking thread and
//! report failures instead of retrying.

use std::fmt;

#[cfg(feature = "hardware")]
pub use crate::dht11::Dht11;

/// A single successful sensor read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[cfg_attr(not(feature = "hardware"), allow(dead_code))]
    #[error("gpio error: {0}")]
    Gpio(Box<dyn std::error::Error + Send + Sync>),
    #[error("no response from sensor while waiting for {0}")]
    NoResponse(&'static str),
    #[error("checksum mismatch: sensor sent {sent:#04x}, frame sums to {computed:#04x}")]
    Checksum { sent: u8, computed: u8 },
    #[error("sensor sent an empty frame")]
    EmptyFrame,
    #[error("no sensor attached to this build")]
    Unavailable,
}

pub trait Sensor: Send + Sync + fmt::Debug {
    fn read(&self) -> Result<Reading, SensorError>;
}

/// Stands in for the sensor on machines without GPIO, every read fails.
#[cfg_attr(feature = "hardware", allow(dead_code))]
#[derive(Debug)]
pub struct Disconnected;

impl Sensor for Disconnected {
    fn read(&self) -> Result<Reading, SensorError> {
        Err(SensorError::Unavailable)
    }
}

/// Always reports the same reading, for developing the lab pages without hardware.
#[derive(Debug)]
pub struct Simulated(pub Reading);

impl Default for Simulated {
    fn default() -> Self {
        Simulated(Reading {
            temperature: 22.0,
            humidity: 45.0,
        })
    }
}

impl Sensor for Simulated {
    fn read(&self) -> Result<Reading, SensorError> {
        log::debug!(temperature = self.0.temperature, humidity = self.0.humidity; "simulated read");
        Ok(self.0)
    }
}

/// Picks the sensor for this build.
///
/// Without the `hardware` feature there is no GPIO access, so the pin is ignored.
#[cfg_attr(not(feature = "hardware"), allow(unused_variables))]
pub fn connect(pin: u8, simulate: bool) -> Box<dyn Sensor> {
    if simulate {
        log::info!("using simulated sensor");
        return Box::new(Simulated::default());
    }
    #[cfg(feature = "hardware")]
    {
        log::info!(pin; "using DHT11 sensor");
        Box::new(Dht11::new(pin))
    }
    #[cfg(not(feature = "hardware"))]
    {
        log::warn!("built without the `hardware` feature, sensor reads will fail");
        Box::new(Disconnected)
    }
}
