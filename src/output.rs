//! Physical outputs: one actuator pin each, with polarity and brightness curve.
//!
//! A [`PhysicalOutput`] knows how to turn a logical 0..=255 level into a pin
//! write for its [`OutputKind`], but nothing about rules or effects. The
//! decoder's fixed output table is an [`OutputBank`], which owns the
//! [`OutputDriver`] and hands effects an [`OutputSink`] view restricted to
//! the outputs their logical function is bound to.
//!
//! # Output ids
//!
//! Configuration bytes address outputs by a **1-based id** (output 1 is the
//! first registered output). Internally outputs are referenced by their
//! 0-based [`OutputIndex`]. [`OutputTable::lookup`] converts between the two
//! and returns `None` for ids that do not exist.
//!
//! # Example
//!
//! ```rust
//! use loco_aux::output::{BrightnessCurve, OutputBank, OutputKind, OutputTable, PhysicalOutput};
//! use loco_aux::hal::MockDriver;
//!
//! let mut bank = OutputBank::new(MockDriver::new());
//! bank.add(PhysicalOutput::new(26, OutputKind::PwmLowSide)).unwrap();
//! bank.add(PhysicalOutput::new(27, OutputKind::PwmHighSide).with_curve(BrightnessCurve::Linear))
//!     .unwrap();
//!
//! assert_eq!(bank.lookup(1), Some(0));
//! assert_eq!(bank.lookup(3), None);
//!
//! bank.set_value(1, 200).unwrap();
//! assert_eq!(bank.driver().pwm(27), Some(55)); // active-low
//! ```

use crate::traits::OutputDriver;

/// Maximum number of physical outputs a decoder can register.
pub const MAX_OUTPUTS: usize = 32;

/// Default PWM frequency hint for light outputs.
pub const DEFAULT_PWM_FREQUENCY_HZ: u16 = 500;

/// 0-based position of an output in the [`OutputBank`].
pub type OutputIndex = u8;

/// Electrical kind of an output pin. Fixed once the output is attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OutputKind {
    /// PWM switching to ground; duty is written as-is.
    #[default]
    PwmLowSide,
    /// PWM switching to the supply; the actuator is active-low, so the
    /// duty written is `255 - value`.
    PwmHighSide,
    /// Plain digital output, on when the level is 128 or more.
    OnOff,
    /// Hobby servo; driven through angles instead of levels.
    Servo,
}

impl OutputKind {
    /// Returns true for kinds that accept brightness levels.
    #[inline]
    pub const fn is_level(&self) -> bool {
        !matches!(self, OutputKind::Servo)
    }
}

/// Perceptual correction applied to levels before they reach the pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BrightnessCurve {
    /// No correction.
    #[default]
    Linear,
    /// `log(x·15 + 1) / log(16)`: lifts low levels.
    Logarithmic,
    /// `x²`: compresses low levels, closer to how incandescent bulbs look.
    Exponential,
}

/// One actuator pin.
///
/// Created once from the board's output table and never destroyed during
/// normal operation. Writes go through the bank's [`OutputDriver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhysicalOutput {
    pin: u8,
    kind: OutputKind,
    pwm_frequency_hz: u16,
    curve: BrightnessCurve,
}

impl PhysicalOutput {
    /// Creates an output with a linear curve and the default PWM frequency.
    pub const fn new(pin: u8, kind: OutputKind) -> Self {
        Self {
            pin,
            kind,
            pwm_frequency_hz: DEFAULT_PWM_FREQUENCY_HZ,
            curve: BrightnessCurve::Linear,
        }
    }

    /// Set the PWM frequency hint passed to the driver on attach.
    pub const fn with_pwm_frequency(mut self, hz: u16) -> Self {
        self.pwm_frequency_hz = hz;
        self
    }

    /// Set the brightness curve.
    pub const fn with_curve(mut self, curve: BrightnessCurve) -> Self {
        self.curve = curve;
        self
    }

    /// Pin number handed to the driver.
    pub const fn pin(&self) -> u8 {
        self.pin
    }

    /// Electrical kind of this output.
    pub const fn kind(&self) -> OutputKind {
        self.kind
    }

    /// PWM frequency hint in Hz.
    pub const fn pwm_frequency_hz(&self) -> u16 {
        self.pwm_frequency_hz
    }

    /// Brightness curve applied by [`set_value`](Self::set_value).
    pub const fn curve(&self) -> BrightnessCurve {
        self.curve
    }

    /// Configure the pin and drive it to its off level.
    pub fn attach<D: OutputDriver>(&self, driver: &mut D) -> Result<(), D::Error> {
        driver.attach(self.pin, self.kind, self.pwm_frequency_hz)?;
        self.drive_off(driver)
    }

    /// Drive the pin to its off level. Servos hold their position.
    pub fn drive_off<D: OutputDriver>(&self, driver: &mut D) -> Result<(), D::Error> {
        match self.kind {
            OutputKind::PwmLowSide => driver.write_pwm(self.pin, 0),
            OutputKind::PwmHighSide => driver.write_pwm(self.pin, u8::MAX),
            OutputKind::OnOff => driver.write_digital(self.pin, false),
            OutputKind::Servo => Ok(()),
        }
    }

    /// Map a level through the brightness curve.
    ///
    /// 0 and 255 always pass through unchanged, as does every level on a
    /// linear curve.
    ///
    /// # Examples
    ///
    /// ```
    /// use loco_aux::output::{BrightnessCurve, OutputKind, PhysicalOutput};
    ///
    /// let out = PhysicalOutput::new(1, OutputKind::PwmLowSide)
    ///     .with_curve(BrightnessCurve::Exponential);
    /// assert_eq!(out.apply_curve(0), 0);
    /// assert_eq!(out.apply_curve(255), 255);
    /// assert!(out.apply_curve(128) < 128);
    /// ```
    pub fn apply_curve(&self, value: u8) -> u8 {
        if self.curve == BrightnessCurve::Linear || value == 0 || value == u8::MAX {
            return value;
        }
        let x = f32::from(value) / 255.0;
        let curved = match self.curve {
            BrightnessCurve::Logarithmic => libm::logf(x * 15.0 + 1.0) / libm::logf(16.0),
            BrightnessCurve::Exponential => x * x,
            BrightnessCurve::Linear => x,
        };
        (curved.clamp(0.0, 1.0) * 255.0) as u8
    }

    /// Write a level (0 = off, 255 = full).
    ///
    /// Applies the curve, then the polarity of the output kind. Has no
    /// effect on servo outputs.
    pub fn set_value<D: OutputDriver>(&self, driver: &mut D, value: u8) -> Result<(), D::Error> {
        let level = self.apply_curve(value);
        match self.kind {
            OutputKind::PwmLowSide => driver.write_pwm(self.pin, level),
            OutputKind::PwmHighSide => driver.write_pwm(self.pin, u8::MAX - level),
            OutputKind::OnOff => driver.write_digital(self.pin, level > 127),
            OutputKind::Servo => Ok(()),
        }
    }

    /// Command a servo angle in degrees. Has no effect on level outputs.
    pub fn set_servo_angle<D: OutputDriver>(
        &self,
        driver: &mut D,
        angle: u16,
    ) -> Result<(), D::Error> {
        if self.kind == OutputKind::Servo {
            driver.write_servo(self.pin, angle)
        } else {
            Ok(())
        }
    }
}

/// Lookup from 1-based configuration ids to registered outputs.
pub trait OutputTable {
    /// Number of registered outputs.
    fn output_count(&self) -> usize;

    /// Resolve a 1-based output id; `None` if no such output exists.
    fn lookup(&self, id: u8) -> Option<OutputIndex> {
        let index = usize::from(id.checked_sub(1)?);
        if index < self.output_count() {
            Some(index as OutputIndex)
        } else {
            None
        }
    }
}

/// Value held back for one output until the frame is flushed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Staged {
    Level(u8),
    Angle(u16),
}

/// Fixed output table plus the driver behind it.
///
/// Between [`begin_frame`](Self::begin_frame) and
/// [`end_frame`](Self::end_frame) writes are staged instead of reaching the
/// driver: levels written to the same output combine to their maximum, the
/// last servo angle wins, and each touched output is written once on flush.
/// Outside a frame every write goes straight to the driver.
///
/// ```rust
/// use loco_aux::output::{OutputBank, OutputKind, PhysicalOutput};
/// use loco_aux::hal::MockDriver;
///
/// let mut bank = OutputBank::new(MockDriver::new());
/// bank.add(PhysicalOutput::new(3, OutputKind::PwmLowSide)).unwrap();
///
/// bank.begin_frame();
/// bank.set_value(0, 180).unwrap();
/// bank.set_value(0, 0).unwrap();
/// assert_eq!(bank.driver().pwm(3), Some(0));
/// bank.end_frame().unwrap();
/// assert_eq!(bank.driver().pwm(3), Some(180));
/// ```
#[derive(Debug)]
pub struct OutputBank<D> {
    driver: D,
    outputs: heapless::Vec<PhysicalOutput, MAX_OUTPUTS>,
    staged: [Option<Staged>; MAX_OUTPUTS],
    in_frame: bool,
}

impl<D: OutputDriver> OutputBank<D> {
    /// Creates an empty bank around a driver.
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            outputs: heapless::Vec::new(),
            staged: [None; MAX_OUTPUTS],
            in_frame: false,
        }
    }

    /// Register and attach an output.
    ///
    /// Returns the new output's index, or `None` when the table is full
    /// (the output is then neither attached nor registered).
    pub fn add(&mut self, output: PhysicalOutput) -> Result<Option<OutputIndex>, D::Error> {
        if self.outputs.is_full() {
            log::warn!("output table full, pin {} not registered", output.pin());
            return Ok(None);
        }
        output.attach(&mut self.driver)?;
        let index = self.outputs.len() as OutputIndex;
        let _ = self.outputs.push(output);
        Ok(Some(index))
    }

    /// Output at a 0-based index.
    pub fn get(&self, index: OutputIndex) -> Option<&PhysicalOutput> {
        self.outputs.get(usize::from(index))
    }

    /// All registered outputs in registration order.
    pub fn outputs(&self) -> &[PhysicalOutput] {
        &self.outputs
    }

    /// Number of registered outputs.
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Returns true if no output has been registered.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Write a level to the output at `index`. Unknown indices are ignored.
    pub fn set_value(&mut self, index: OutputIndex, value: u8) -> Result<(), D::Error> {
        let output = match self.outputs.get(usize::from(index)) {
            Some(output) => output,
            None => return Ok(()),
        };
        if !self.in_frame {
            return output.set_value(&mut self.driver, value);
        }
        if output.kind().is_level() {
            let slot = &mut self.staged[usize::from(index)];
            let level = match *slot {
                Some(Staged::Level(previous)) => previous.max(value),
                _ => value,
            };
            *slot = Some(Staged::Level(level));
        }
        Ok(())
    }

    /// Command a servo angle on the output at `index`. Unknown indices are ignored.
    pub fn set_servo_angle(&mut self, index: OutputIndex, angle: u16) -> Result<(), D::Error> {
        let output = match self.outputs.get(usize::from(index)) {
            Some(output) => output,
            None => return Ok(()),
        };
        if !self.in_frame {
            return output.set_servo_angle(&mut self.driver, angle);
        }
        if output.kind() == OutputKind::Servo {
            self.staged[usize::from(index)] = Some(Staged::Angle(angle));
        }
        Ok(())
    }

    /// Start staging writes for one tick.
    pub fn begin_frame(&mut self) {
        self.staged = [None; MAX_OUTPUTS];
        self.in_frame = true;
    }

    /// Stop staging and write every output touched since
    /// [`begin_frame`](Self::begin_frame). Untouched outputs keep their level.
    pub fn end_frame(&mut self) -> Result<(), D::Error> {
        self.in_frame = false;
        for (output, staged) in self.outputs.iter().zip(self.staged.iter_mut()) {
            match staged.take() {
                Some(Staged::Level(level)) => output.set_value(&mut self.driver, level)?,
                Some(Staged::Angle(angle)) => output.set_servo_angle(&mut self.driver, angle)?,
                None => {}
            }
        }
        Ok(())
    }

    /// Drive every registered output to its off level.
    pub fn all_off(&mut self) -> Result<(), D::Error> {
        for output in &self.outputs {
            output.drive_off(&mut self.driver)?;
        }
        Ok(())
    }

    /// View of this bank limited to `indices`, in that order.
    pub fn bind<'a>(&'a mut self, indices: &'a [OutputIndex]) -> BoundOutputs<'a, D> {
        BoundOutputs {
            bank: self,
            indices,
        }
    }

    /// Shared access to the driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable access to the driver.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

impl<D: OutputDriver> OutputTable for OutputBank<D> {
    fn output_count(&self) -> usize {
        self.outputs.len()
    }
}

/// Where an effect writes its values.
///
/// Slots are positions within the outputs bound to one logical function:
/// slot 0 is the first bound output. Writes to slots beyond
/// [`len`](Self::len) are ignored.
pub trait OutputSink {
    /// Error type of the underlying writes.
    type Error;

    /// Number of bound outputs.
    fn len(&self) -> usize;

    /// Write a level to one slot.
    fn set_value(&mut self, slot: usize, value: u8) -> Result<(), Self::Error>;

    /// Command a servo angle on one slot.
    fn set_servo_angle(&mut self, slot: usize, angle: u16) -> Result<(), Self::Error>;

    /// Returns true if nothing is bound.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the same level to every slot.
    fn set_all(&mut self, value: u8) -> Result<(), Self::Error> {
        for slot in 0..self.len() {
            self.set_value(slot, value)?;
        }
        Ok(())
    }

    /// Command the same angle on every slot.
    fn set_servo_all(&mut self, angle: u16) -> Result<(), Self::Error> {
        for slot in 0..self.len() {
            self.set_servo_angle(slot, angle)?;
        }
        Ok(())
    }
}

/// The outputs of one logical function, borrowed from the [`OutputBank`].
pub struct BoundOutputs<'a, D> {
    bank: &'a mut OutputBank<D>,
    indices: &'a [OutputIndex],
}

impl<D: OutputDriver> OutputSink for BoundOutputs<'_, D> {
    type Error = D::Error;

    fn len(&self) -> usize {
        self.indices.len()
    }

    fn set_value(&mut self, slot: usize, value: u8) -> Result<(), D::Error> {
        match self.indices.get(slot) {
            Some(&index) => self.bank.set_value(index, value),
            None => Ok(()),
        }
    }

    fn set_servo_angle(&mut self, slot: usize, angle: u16) -> Result<(), D::Error> {
        match self.indices.get(slot) {
            Some(&index) => self.bank.set_servo_angle(index, angle),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockDriver;

    fn output(kind: OutputKind) -> PhysicalOutput {
        PhysicalOutput::new(5, kind)
    }

    // =========================================================================
    // Polarity / kind
    // =========================================================================

    #[test]
    fn low_side_writes_value_directly() {
        let mut driver = MockDriver::new();
        output(OutputKind::PwmLowSide).set_value(&mut driver, 77).unwrap();
        assert_eq!(driver.pwm(5), Some(77));
    }

    #[test]
    fn high_side_inverts_value() {
        let mut driver = MockDriver::new();
        output(OutputKind::PwmHighSide).set_value(&mut driver, 77).unwrap();
        assert_eq!(driver.pwm(5), Some(178));
    }

    #[test]
    fn on_off_thresholds_at_128() {
        let mut driver = MockDriver::new();
        let out = output(OutputKind::OnOff);
        out.set_value(&mut driver, 127).unwrap();
        assert_eq!(driver.digital(5), Some(false));
        out.set_value(&mut driver, 128).unwrap();
        assert_eq!(driver.digital(5), Some(true));
    }

    #[test]
    fn servo_ignores_levels_and_levels_ignore_angles() {
        let mut driver = MockDriver::new();
        output(OutputKind::Servo).set_value(&mut driver, 200).unwrap();
        assert_eq!(driver.pwm(5), None);
        output(OutputKind::PwmLowSide).set_servo_angle(&mut driver, 90).unwrap();
        assert_eq!(driver.servo(5), None);
        output(OutputKind::Servo).set_servo_angle(&mut driver, 90).unwrap();
        assert_eq!(driver.servo(5), Some(90));
    }

    #[test]
    fn attach_drives_off_level() {
        let mut driver = MockDriver::new();
        output(OutputKind::PwmHighSide).attach(&mut driver).unwrap();
        assert_eq!(driver.pwm(5), Some(255));
        assert_eq!(driver.attached().len(), 1);
    }

    // =========================================================================
    // Curves
    // =========================================================================

    #[test]
    fn linear_curve_is_identity() {
        let out = output(OutputKind::PwmLowSide);
        for v in [0u8, 1, 64, 128, 200, 255] {
            assert_eq!(out.apply_curve(v), v);
        }
    }

    #[test]
    fn curves_keep_endpoints() {
        for curve in [BrightnessCurve::Logarithmic, BrightnessCurve::Exponential] {
            let out = output(OutputKind::PwmLowSide).with_curve(curve);
            assert_eq!(out.apply_curve(0), 0);
            assert_eq!(out.apply_curve(255), 255);
        }
    }

    #[test]
    fn logarithmic_curve_lifts_midrange() {
        let out = output(OutputKind::PwmLowSide).with_curve(BrightnessCurve::Logarithmic);
        // log(128/255*15+1)/log(16) ~= 0.735
        let v = out.apply_curve(128);
        assert!((185..=189).contains(&v), "got {v}");
    }

    #[test]
    fn exponential_curve_squares() {
        let out = output(OutputKind::PwmLowSide).with_curve(BrightnessCurve::Exponential);
        // (128/255)^2 * 255 ~= 64.25
        assert_eq!(out.apply_curve(128), 64);
    }

    #[test]
    fn curve_applies_before_polarity() {
        let mut driver = MockDriver::new();
        let out = output(OutputKind::PwmHighSide).with_curve(BrightnessCurve::Exponential);
        out.set_value(&mut driver, 128).unwrap();
        assert_eq!(driver.pwm(5), Some(255 - 64));
    }

    // =========================================================================
    // Bank
    // =========================================================================

    #[test]
    fn bank_lookup_is_one_based() {
        let mut bank = OutputBank::new(MockDriver::new());
        bank.add(PhysicalOutput::new(10, OutputKind::PwmLowSide)).unwrap();
        bank.add(PhysicalOutput::new(11, OutputKind::PwmLowSide)).unwrap();
        assert_eq!(bank.lookup(0), None);
        assert_eq!(bank.lookup(1), Some(0));
        assert_eq!(bank.lookup(2), Some(1));
        assert_eq!(bank.lookup(3), None);
    }

    #[test]
    fn bank_rejects_when_full() {
        let mut bank = OutputBank::new(MockDriver::new());
        for pin in 0..MAX_OUTPUTS as u8 {
            assert!(bank.add(PhysicalOutput::new(pin, OutputKind::OnOff)).unwrap().is_some());
        }
        assert_eq!(bank.add(PhysicalOutput::new(99, OutputKind::OnOff)).unwrap(), None);
        assert_eq!(bank.len(), MAX_OUTPUTS);
        assert_eq!(bank.driver().digital(99), None);
    }

    #[test]
    fn bound_outputs_only_touch_their_indices() {
        let mut bank = OutputBank::new(MockDriver::new());
        for pin in [20, 21, 22] {
            bank.add(PhysicalOutput::new(pin, OutputKind::PwmLowSide)).unwrap();
        }
        let indices = [2u8, 0];
        let mut sink = bank.bind(&indices);
        assert_eq!(sink.len(), 2);
        sink.set_all(99).unwrap();
        sink.set_value(5, 1).unwrap(); // out of range: ignored

        assert_eq!(bank.driver().pwm(20), Some(99));
        assert_eq!(bank.driver().pwm(21), Some(0));
        assert_eq!(bank.driver().pwm(22), Some(99));
    }

    // =========================================================================
    // Frames
    // =========================================================================

    #[test]
    fn frame_combines_levels_to_maximum() {
        let mut bank = OutputBank::new(MockDriver::new());
        bank.add(PhysicalOutput::new(1, OutputKind::PwmLowSide)).unwrap();
        bank.add(PhysicalOutput::new(2, OutputKind::PwmHighSide)).unwrap();

        bank.begin_frame();
        for value in [0, 120, 40, 0] {
            bank.set_value(0, value).unwrap();
            bank.set_value(1, value).unwrap();
        }
        bank.end_frame().unwrap();

        assert_eq!(bank.driver().pwm(1), Some(120));
        assert_eq!(bank.driver().pwm(2), Some(255 - 120));
    }

    #[test]
    fn frame_writes_each_output_once() {
        let mut bank = OutputBank::new(MockDriver::new());
        bank.add(PhysicalOutput::new(1, OutputKind::PwmLowSide)).unwrap();
        bank.add(PhysicalOutput::new(2, OutputKind::Servo)).unwrap();
        let writes = bank.driver().write_count;

        bank.begin_frame();
        bank.set_value(0, 10).unwrap();
        bank.set_value(0, 20).unwrap();
        bank.set_servo_angle(1, 30).unwrap();
        bank.set_servo_angle(1, 60).unwrap();
        bank.set_value(1, 99).unwrap(); // level on a servo: ignored
        assert_eq!(bank.driver().write_count, writes);
        bank.end_frame().unwrap();

        assert_eq!(bank.driver().write_count, writes + 2);
        assert_eq!(bank.driver().servo(2), Some(60));
    }

    #[test]
    fn untouched_outputs_keep_level_across_frames() {
        let mut bank = OutputBank::new(MockDriver::new());
        bank.add(PhysicalOutput::new(1, OutputKind::PwmLowSide)).unwrap();
        bank.set_value(0, 77).unwrap();

        bank.begin_frame();
        bank.end_frame().unwrap();
        assert_eq!(bank.driver().pwm(1), Some(77));
    }

    #[test]
    fn all_off_restores_off_levels() {
        let mut bank = OutputBank::new(MockDriver::new());
        bank.add(PhysicalOutput::new(1, OutputKind::PwmLowSide)).unwrap();
        bank.add(PhysicalOutput::new(2, OutputKind::PwmHighSide)).unwrap();
        bank.add(PhysicalOutput::new(3, OutputKind::OnOff)).unwrap();
        bank.add(PhysicalOutput::new(4, OutputKind::Servo)).unwrap();
        for index in 0..3 {
            bank.set_value(index, 255).unwrap();
        }
        bank.set_servo_angle(3, 45).unwrap();

        bank.all_off().unwrap();
        assert_eq!(bank.driver().pwm(1), Some(0));
        assert_eq!(bank.driver().pwm(2), Some(255));
        assert_eq!(bank.driver().digital(3), Some(false));
        assert_eq!(bank.driver().servo(4), Some(45));
    }

    #[test]
    fn driver_errors_propagate() {
        let mut bank = OutputBank::new(MockDriver::new());
        bank.add(PhysicalOutput::new(1, OutputKind::PwmLowSide)).unwrap();
        bank.driver_mut().set_failing(true);
        assert_eq!(bank.set_value(0, 10), Err(()));
    }
}
