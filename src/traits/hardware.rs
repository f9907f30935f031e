//! Hardware abstraction traits for actuator outputs and the configuration store.
//!
//! This module defines the narrow interfaces through which the auxiliary
//! engine touches the outside world, so the whole rule graph can run on
//! desktop against mocks as well as on a decoder board.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`OutputDriver`] | PWM, on/off and servo pin writes |
//! | [`CvStore`] | Byte-addressable configuration variables |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For boards with `embedded-hal` PWM channels,
//! use `hal::embedded` (requires the `embedded` feature).
//!
//! # Example
//!
//! ```rust
//! use loco_aux::traits::{CvStore, OutputDriver};
//! use loco_aux::hal::{MockCvStore, MockDriver};
//!
//! let mut driver = MockDriver::new();
//! driver.write_pwm(26, 128).unwrap();
//! assert_eq!(driver.pwm(26), Some(128));
//!
//! let mut store = MockCvStore::new();
//! assert_eq!(store.read_cv(96), 0); // never written
//! store.write_cv(96, 1);
//! assert_eq!(store.read_cv(96), 1);
//! ```

use crate::output::OutputKind;

/// Direction of travel as reported by the protocol decoder.
///
/// Unlike a throttle, a decoder always has a direction even at speed 0:
/// the headlights still follow it.
///
/// # Default
///
/// Defaults to [`Forward`](Self::Forward), the state after a reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    /// Travelling forward (raw value 1).
    #[default]
    Forward,
    /// Travelling in reverse (raw value 0).
    Reverse,
}

impl Direction {
    /// Raw value used by direction conditions: 1 = forward, 0 = reverse.
    ///
    /// # Examples
    ///
    /// ```
    /// use loco_aux::Direction;
    ///
    /// assert_eq!(Direction::Forward.as_raw(), 1);
    /// assert_eq!(Direction::Reverse.as_raw(), 0);
    /// ```
    #[inline]
    pub const fn as_raw(&self) -> u8 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => 0,
        }
    }

    /// Decode a raw direction value. Any non-zero value means forward.
    #[inline]
    pub const fn from_raw(raw: u8) -> Self {
        if raw == 0 {
            Direction::Reverse
        } else {
            Direction::Forward
        }
    }
}

/// Actuator driver trait - abstracts the pins behind the physical outputs.
///
/// One driver instance serves every output of a decoder; outputs address
/// it by pin number, the same way `analogWrite`-style board APIs do.
/// Brightness curves and polarity are applied by
/// [`PhysicalOutput`](crate::output::PhysicalOutput) before a value reaches
/// the driver, so implementations write exactly what they are given.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use loco_aux::traits::OutputDriver;
/// use loco_aux::OutputKind;
///
/// struct BoardPins { /* timer and gpio handles */ }
///
/// impl OutputDriver for BoardPins {
///     type Error = ();
///
///     fn attach(&mut self, pin: u8, kind: OutputKind, pwm_frequency_hz: u16) -> Result<(), ()> {
///         // Configure the pin as PWM / GPIO / servo timer...
///         Ok(())
///     }
///
///     fn write_pwm(&mut self, pin: u8, duty: u8) -> Result<(), ()> {
///         // Set duty cycle, 0..=255...
///         Ok(())
///     }
///
///     fn write_digital(&mut self, pin: u8, high: bool) -> Result<(), ()> {
///         Ok(())
///     }
///
///     fn write_servo(&mut self, pin: u8, angle: u16) -> Result<(), ()> {
///         // Convert degrees to pulse width...
///         Ok(())
///     }
/// }
/// ```
pub trait OutputDriver {
    /// Error type for pin operations.
    type Error;

    /// Prepare a pin for the given output kind.
    ///
    /// Called once when the output is registered. PWM and on/off pins
    /// should be driven to their "off" level.
    fn attach(&mut self, pin: u8, kind: OutputKind, pwm_frequency_hz: u16)
        -> Result<(), Self::Error>;

    /// Write a PWM duty cycle (0 = off, 255 = fully on).
    fn write_pwm(&mut self, pin: u8, duty: u8) -> Result<(), Self::Error>;

    /// Drive a digital pin high or low.
    fn write_digital(&mut self, pin: u8, high: bool) -> Result<(), Self::Error>;

    /// Command a servo to an angle in degrees.
    fn write_servo(&mut self, pin: u8, angle: u16) -> Result<(), Self::Error>;
}

/// Byte-addressable configuration variable (CV) store.
///
/// Persistence, defaults and programming-track access belong to the
/// implementation; the engine only reads CVs and selects RCN-227 pages by
/// writing the indexed-CV pair.
///
/// # Contract
///
/// - [`read_cv`](Self::read_cv) returns 0 for a CV that was never written.
/// - Addresses are CV numbers as used in decoder manuals (1-based).
pub trait CvStore {
    /// Read one CV.
    fn read_cv(&self, cv: u16) -> u8;

    /// Write one CV.
    fn write_cv(&mut self, cv: u16, value: u8);

    /// Read a big-endian 16-bit value from two consecutive CVs.
    fn read_cv_u16(&self, cv: u16) -> u16 {
        (u16::from(self.read_cv(cv)) << 8) | u16::from(self.read_cv(cv.wrapping_add(1)))
    }
}

impl<S: CvStore + ?Sized> CvStore for &mut S {
    fn read_cv(&self, cv: u16) -> u8 {
        (**self).read_cv(cv)
    }

    fn write_cv(&mut self, cv: u16, value: u8) {
        (**self).write_cv(cv, value);
    }
}
