//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for the hardware traits and for the
//! randomness source, enabling development and testing of the whole
//! auxiliary engine on desktop.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockDriver`] | [`OutputDriver`] | Tracks the last value written to every pin |
//! | [`MockCvStore`] | [`CvStore`] | In-memory CVs with a write log |
//! | [`FixedRng`] | [`RngCore`] | Returns the same word forever |
//! | [`RecordingSink`] | [`OutputSink`] | Effect target without a driver |
//!
//! # Example
//!
//! ```rust
//! use loco_aux::{AuxController, OutputKind, PhysicalOutput};
//! use loco_aux::hal::{MockCvStore, MockDriver};
//! use loco_aux::cv;
//!
//! let mut controller = AuxController::new(MockDriver::new());
//! controller.add_output(PhysicalOutput::new(26, OutputKind::PwmLowSide)).unwrap();
//! controller.add_output(PhysicalOutput::new(27, OutputKind::PwmLowSide)).unwrap();
//!
//! let mut store = MockCvStore::new();
//! cv::write_factory_defaults(&mut store);
//! controller.load_from_cvs(&mut store);
//!
//! controller.set_function_state(0, true);
//! controller.update(10).unwrap();
//!
//! // F0 forward switches output 1 on
//! assert_eq!(controller.driver().pwm(26), Some(255));
//! assert_eq!(controller.driver().pwm(27), Some(0));
//! ```
//!
//! [`OutputDriver`]: crate::traits::OutputDriver
//! [`CvStore`]: crate::traits::CvStore
//! [`RngCore`]: rand::RngCore
//! [`OutputSink`]: crate::output::OutputSink

extern crate alloc;
use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

use rand::RngCore;

use crate::output::{OutputKind, OutputSink};
use crate::traits::{CvStore, OutputDriver};

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Mock output driver for testing.
///
/// Remembers the last PWM duty, digital level and servo angle written to
/// each pin. Use the accessors to inspect state after test operations.
///
/// # Example
///
/// ```rust
/// use loco_aux::hal::MockDriver;
/// use loco_aux::traits::OutputDriver;
///
/// let mut driver = MockDriver::new();
/// driver.write_pwm(3, 40).unwrap();
/// driver.write_servo(9, 120).unwrap();
///
/// assert_eq!(driver.pwm(3), Some(40));
/// assert_eq!(driver.servo(9), Some(120));
/// assert_eq!(driver.digital(3), None);
/// assert_eq!(driver.write_count, 2);
/// ```
#[derive(Debug, Default)]
pub struct MockDriver {
    pwm: BTreeMap<u8, u8>,
    digital: BTreeMap<u8, bool>,
    servo: BTreeMap<u8, u16>,
    attached: Vec<(u8, OutputKind, u16)>,
    failing: bool,
    /// Number of successful write calls (PWM, digital and servo).
    pub write_count: usize,
}

impl MockDriver {
    /// Creates a driver with every pin unwritten.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with `Err(())` (or succeed again).
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    /// Last PWM duty written to `pin`.
    pub fn pwm(&self, pin: u8) -> Option<u8> {
        self.pwm.get(&pin).copied()
    }

    /// Last digital level written to `pin`.
    pub fn digital(&self, pin: u8) -> Option<bool> {
        self.digital.get(&pin).copied()
    }

    /// Last servo angle written to `pin`.
    pub fn servo(&self, pin: u8) -> Option<u16> {
        self.servo.get(&pin).copied()
    }

    /// Every `attach` call as `(pin, kind, pwm_frequency_hz)`.
    pub fn attached(&self) -> &[(u8, OutputKind, u16)] {
        &self.attached
    }

    fn check(&self) -> Result<(), ()> {
        if self.failing {
            Err(())
        } else {
            Ok(())
        }
    }
}

impl OutputDriver for MockDriver {
    type Error = ();

    fn attach(&mut self, pin: u8, kind: OutputKind, pwm_frequency_hz: u16) -> Result<(), ()> {
        self.check()?;
        self.attached.push((pin, kind, pwm_frequency_hz));
        Ok(())
    }

    fn write_pwm(&mut self, pin: u8, duty: u8) -> Result<(), ()> {
        self.check()?;
        self.pwm.insert(pin, duty);
        self.write_count += 1;
        Ok(())
    }

    fn write_digital(&mut self, pin: u8, high: bool) -> Result<(), ()> {
        self.check()?;
        self.digital.insert(pin, high);
        self.write_count += 1;
        Ok(())
    }

    fn write_servo(&mut self, pin: u8, angle: u16) -> Result<(), ()> {
        self.check()?;
        self.servo.insert(pin, angle);
        self.write_count += 1;
        Ok(())
    }
}

/// In-memory CV store.
///
/// Unwritten CVs read as 0. Every write is also appended to a log so
/// tests can check which page selections the loader made.
///
/// # Example
///
/// ```rust
/// use loco_aux::hal::MockCvStore;
/// use loco_aux::traits::CvStore;
///
/// let mut store = MockCvStore::new().with_cv(96, 2).with_cvs(&[(257, 1), (258, 0)]);
/// assert_eq!(store.read_cv(96), 2);
/// assert_eq!(store.read_cv(257), 1);
///
/// store.write_cv(32, 40);
/// assert_eq!(store.writes(), &[(32, 40)]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MockCvStore {
    cvs: BTreeMap<u16, u8>,
    writes: Vec<(u16, u8)>,
}

impl MockCvStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset one CV without logging a write.
    pub fn with_cv(mut self, cv: u16, value: u8) -> Self {
        self.cvs.insert(cv, value);
        self
    }

    /// Preset several CVs without logging writes.
    pub fn with_cvs(mut self, values: &[(u16, u8)]) -> Self {
        for &(cv, value) in values {
            self.cvs.insert(cv, value);
        }
        self
    }

    /// Preset one CV without logging a write.
    pub fn set(&mut self, cv: u16, value: u8) {
        self.cvs.insert(cv, value);
    }

    /// Preset consecutive CVs starting at `start`.
    pub fn set_block(&mut self, start: u16, bytes: &[u8]) {
        for (offset, &value) in bytes.iter().enumerate() {
            self.cvs.insert(start + offset as u16, value);
        }
    }

    /// All writes made through [`CvStore::write_cv`], oldest first.
    pub fn writes(&self) -> &[(u16, u8)] {
        &self.writes
    }

    /// Number of CVs holding a value.
    pub fn len(&self) -> usize {
        self.cvs.len()
    }

    /// Returns true if no CV holds a value.
    pub fn is_empty(&self) -> bool {
        self.cvs.is_empty()
    }
}

impl CvStore for MockCvStore {
    fn read_cv(&self, cv: u16) -> u8 {
        self.cvs.get(&cv).copied().unwrap_or(0)
    }

    fn write_cv(&mut self, cv: u16, value: u8) {
        self.cvs.insert(cv, value);
        self.writes.push((cv, value));
    }
}

// ============================================================================
// Randomness
// ============================================================================

/// Random source that returns the same 32-bit word forever.
///
/// Effects draw with `next_u32() % n`, so `FixedRng::new(0)` always picks
/// the lowest outcome and `FixedRng::new(99)` never passes a 5% check.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedRng {
    /// Word returned by every call.
    pub value: u32,
}

impl FixedRng {
    /// Creates a source returning `value`.
    pub const fn new(value: u32) -> Self {
        Self { value }
    }
}

impl RngCore for FixedRng {
    fn next_u32(&mut self) -> u32 {
        self.value
    }

    fn next_u64(&mut self) -> u64 {
        (u64::from(self.value) << 32) | u64::from(self.value)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let bytes = self.value.to_le_bytes();
        for (i, b) in dest.iter_mut().enumerate() {
            *b = bytes[i % 4];
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

// ============================================================================
// Effect Target
// ============================================================================

/// Output sink that records values per slot, for testing effects alone.
///
/// # Example
///
/// ```rust
/// use loco_aux::hal::RecordingSink;
/// use loco_aux::output::OutputSink;
///
/// let mut sink = RecordingSink::new(2);
/// sink.set_all(10).unwrap();
/// sink.set_servo_angle(1, 45).unwrap();
/// assert_eq!(sink.values, vec![10, 10]);
/// assert_eq!(sink.angles, vec![None, Some(45)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    /// Last level per slot.
    pub values: Vec<u8>,
    /// Last servo angle per slot, `None` until commanded.
    pub angles: Vec<Option<u16>>,
    /// Number of writes of either kind.
    pub writes: usize,
}

impl RecordingSink {
    /// Creates a sink with `slots` outputs, all at level 0.
    pub fn new(slots: usize) -> Self {
        Self {
            values: vec![0; slots],
            angles: vec![None; slots],
            writes: 0,
        }
    }

    /// Level of slot 0.
    pub fn first(&self) -> u8 {
        self.values.first().copied().unwrap_or(0)
    }
}

impl OutputSink for RecordingSink {
    type Error = core::convert::Infallible;

    fn len(&self) -> usize {
        self.values.len()
    }

    fn set_value(&mut self, slot: usize, value: u8) -> Result<(), Self::Error> {
        if let Some(v) = self.values.get_mut(slot) {
            *v = value;
            self.writes += 1;
        }
        Ok(())
    }

    fn set_servo_angle(&mut self, slot: usize, angle: u16) -> Result<(), Self::Error> {
        if let Some(a) = self.angles.get_mut(slot) {
            *a = Some(angle);
            self.writes += 1;
        }
        Ok(())
    }
}
