//! DHT11 single-wire protocol.
//!
//! After the host holds the line low for at least 18ms the sensor answers with
//! an 80µs low, 80µs high preamble and then 40 bits. Every bit starts with a
//! 50µs low, the length of the following high pulse encodes the value:
//! 26-28µs is a zero, 70µs a one.
//!
//! The five bytes are humidity, humidity decimal, temperature,
//! temperature decimal and a checksum over the first four.

use std::time::Duration;

use crate::sensor::{Reading, SensorError};

/// High pulses longer than this are a one bit.
const BIT_THRESHOLD: Duration = Duration::from_micros(50);

pub const FRAME_BITS: usize = 40;

/// Packs the measured high pulse widths into the five frame bytes, msb first.
pub fn frame_from_pulses(pulses: &[Duration; FRAME_BITS]) -> [u8; 5] {
    let mut frame = [0u8; 5];
    for (i, pulse) in pulses.iter().enumerate() {
        if *pulse > BIT_THRESHOLD {
            frame[i / 8] |= 0x80 >> (i % 8);
        }
    }
    frame
}

pub fn decode_frame(frame: [u8; 5]) -> Result<Reading, SensorError> {
    let [humidity, humidity_decimal, temperature, temperature_decimal, sent] = frame;
    if frame == [0; 5] {
        return Err(SensorError::EmptyFrame);
    }

    let computed = humidity
        .wrapping_add(humidity_decimal)
        .wrapping_add(temperature)
        .wrapping_add(temperature_decimal);
    if computed != sent {
        return Err(SensorError::Checksum { sent, computed });
    }

    // Adafruit_DHT only reports the integral bytes for a DHT11, sensors that fill in the
    // decimal bytes get the extra precision here.
    let humidity = f32::from(humidity) + f32::from(humidity_decimal) / 10.0;
    // Bit 7 of the decimal byte is the sign.
    let magnitude = f32::from(temperature) + f32::from(temperature_decimal & 0x7f) / 10.0;
    let temperature = if temperature_decimal & 0x80 == 0 {
        magnitude
    } else {
        -magnitude
    };
    Ok(Reading {
        temperature,
        humidity,
    })
}

#[cfg(feature = "hardware")]
pub use driver::Dht11;

#[cfg(feature = "hardware")]
mod driver {
    use std::time::{Duration, Instant};

    use rppal::gpio::{Gpio, IoPin, Level, Mode, PullUpDown};

    use super::{decode_frame, frame_from_pulses, FRAME_BITS};
    use crate::sensor::{Reading, Sensor, SensorError};

    /// Longest level the protocol ever holds, with some slack for scheduling.
    const EDGE_TIMEOUT: Duration = Duration::from_micros(200);

    /// A DHT11 on a BCM numbered GPIO pin.
    #[derive(Debug)]
    pub struct Dht11 {
        pin: u8,
    }

    impl Dht11 {
        pub fn new(pin: u8) -> Self {
            Dht11 { pin }
        }
    }

    impl From<rppal::gpio::Error> for SensorError {
        fn from(e: rppal::gpio::Error) -> Self {
            SensorError::Gpio(Box::new(e))
        }
    }

    impl Sensor for Dht11 {
        fn read(&self) -> Result<Reading, SensorError> {
            let mut pin = Gpio::new()?.get(self.pin)?.into_io(Mode::Output);

            // Start signal, then hand the line back to the sensor.
            pin.set_low();
            std::thread::sleep(Duration::from_millis(18));
            pin.set_high();
            pin.set_mode(Mode::Input);
            pin.set_pullupdown(PullUpDown::PullUp);

            wait_for(&pin, Level::Low, "response")?;
            wait_for(&pin, Level::High, "preamble low")?;
            wait_for(&pin, Level::Low, "preamble high")?;

            let mut pulses = [Duration::ZERO; FRAME_BITS];
            for pulse in &mut pulses {
                wait_for(&pin, Level::High, "bit start")?;
                *pulse = wait_for(&pin, Level::Low, "bit end")?;
            }
            log::trace!(pin = self.pin; "pulses: {pulses:?}");

            decode_frame(frame_from_pulses(&pulses))
        }
    }

    /// Busy waits until the line reaches `level`, returns how long that took.
    fn wait_for(pin: &IoPin, level: Level, phase: &'static str) -> Result<Duration, SensorError> {
        let start = Instant::now();
        while pin.read() != level {
            if start.elapsed() > EDGE_TIMEOUT {
                return Err(SensorError::NoResponse(phase));
            }
        }
        Ok(start.elapsed())
    }
}
