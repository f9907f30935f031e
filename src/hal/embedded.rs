//! [`OutputDriver`] over `embedded-hal` PWM channels.
//!
//! Each pin number used in the output table is bound to one
//! [`SetDutyCycle`] channel. Lights use the channel's duty cycle directly,
//! on/off outputs are driven fully on or off, and servos get a 1000..2000 µs
//! pulse in a 20 ms frame (the channel's timer must run at 50 Hz for
//! servo pins).
//!
//! # Example
//!
//! ```ignore
//! use loco_aux::hal::embedded::PwmDriver;
//! use loco_aux::{AuxController, AuxConfig};
//!
//! let mut driver: PwmDriver<_, 4> = PwmDriver::new();
//! driver.bind(26, front_channel)?;
//! driver.bind(27, rear_channel)?;
//! let mut controller = AuxController::from_config(driver, &AuxConfig::default_pinout())?;
//! ```

use core::fmt;

use embedded_hal::pwm::SetDutyCycle;
use heapless::Vec as HVec;

use crate::output::OutputKind;
use crate::traits::OutputDriver;

/// Servo frame length in µs.
pub const SERVO_FRAME_US: u16 = 20_000;
/// Pulse for 0°.
pub const SERVO_MIN_PULSE_US: u16 = 1_000;
/// Pulse for 180°.
pub const SERVO_MAX_PULSE_US: u16 = 2_000;

/// Errors from [`PwmDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmDriverError<E> {
    /// No channel is bound to this pin.
    UnknownPin(u8),
    /// Every channel slot is taken.
    Full,
    /// The channel reported an error.
    Pwm(E),
}

impl<E: fmt::Debug> fmt::Display for PwmDriverError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PwmDriverError::UnknownPin(pin) => write!(f, "no PWM channel bound to pin {pin}"),
            PwmDriverError::Full => write!(f, "no free PWM channel slot"),
            PwmDriverError::Pwm(e) => write!(f, "PWM channel error: {e:?}"),
        }
    }
}

/// Up to `N` PWM channels addressed by pin number.
pub struct PwmDriver<P, const N: usize> {
    channels: HVec<(u8, P), N>,
}

impl<P: SetDutyCycle, const N: usize> Default for PwmDriver<P, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: SetDutyCycle, const N: usize> PwmDriver<P, N> {
    /// Driver with no channels bound.
    pub fn new() -> Self {
        Self {
            channels: HVec::new(),
        }
    }

    /// Bind `channel` to `pin`, replacing any earlier binding.
    pub fn bind(&mut self, pin: u8, channel: P) -> Result<(), PwmDriverError<P::Error>> {
        if let Some(slot) = self.channels.iter_mut().find(|(p, _)| *p == pin) {
            slot.1 = channel;
            return Ok(());
        }
        self.channels
            .push((pin, channel))
            .map_err(|_| PwmDriverError::Full)
    }

    fn channel(&mut self, pin: u8) -> Result<&mut P, PwmDriverError<P::Error>> {
        self.channels
            .iter_mut()
            .find(|(p, _)| *p == pin)
            .map(|(_, channel)| channel)
            .ok_or(PwmDriverError::UnknownPin(pin))
    }
}

/// Pulse width in µs for `angle` degrees, clamped to 0..=180.
pub fn servo_pulse_us(angle: u16) -> u16 {
    let span = SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US;
    let angle = u32::from(angle.min(180));
    SERVO_MIN_PULSE_US + (angle * u32::from(span) / 180) as u16
}

impl<P: SetDutyCycle, const N: usize> OutputDriver for PwmDriver<P, N> {
    type Error = PwmDriverError<P::Error>;

    fn attach(&mut self, pin: u8, kind: OutputKind, pwm_frequency_hz: u16) -> Result<(), Self::Error> {
        // Frequency is fixed by the channel's timer.
        log::debug!("pin {pin}: {kind:?} output, {pwm_frequency_hz} Hz requested");
        self.channel(pin)?;
        Ok(())
    }

    fn write_pwm(&mut self, pin: u8, duty: u8) -> Result<(), Self::Error> {
        self.channel(pin)?
            .set_duty_cycle_fraction(u16::from(duty), 255)
            .map_err(PwmDriverError::Pwm)
    }

    fn write_digital(&mut self, pin: u8, high: bool) -> Result<(), Self::Error> {
        let channel = self.channel(pin)?;
        let result = if high {
            channel.set_duty_cycle_fully_on()
        } else {
            channel.set_duty_cycle_fully_off()
        };
        result.map_err(PwmDriverError::Pwm)
    }

    fn write_servo(&mut self, pin: u8, angle: u16) -> Result<(), Self::Error> {
        self.channel(pin)?
            .set_duty_cycle_fraction(servo_pulse_us(angle), SERVO_FRAME_US)
            .map_err(PwmDriverError::Pwm)
    }
}
