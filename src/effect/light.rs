//! Lighting effects: constant, dimmable, flickering, strobing, oscillating
//! and fading levels.
//!
//! All of these except [`SoftStartStop`] drive every bound output to 0 as
//! soon as they are inactive. [`SoftStartStop`] ramps down instead.

use core::f32::consts::PI;

use rand::RngCore;

use crate::output::OutputSink;

const TWO_PI: f32 = 2.0 * PI;

/// Constant brightness while active.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Steady {
    brightness: u8,
    active: bool,
}

impl Steady {
    /// Creates an inactive effect that will show `brightness`.
    pub const fn new(brightness: u8) -> Self {
        Self {
            brightness,
            active: false,
        }
    }

    /// Configured brightness.
    pub const fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Switch on or off.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether the effect is on.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Write the current level.
    pub fn update<S: OutputSink>(&mut self, outputs: &mut S) -> Result<(), S::Error> {
        outputs.set_all(if self.active { self.brightness } else { 0 })
    }
}

/// Full or dimmed brightness while active, selected by the dimmed flag.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dimming {
    full: u8,
    dimmed_level: u8,
    dimmed: bool,
    active: bool,
}

impl Dimming {
    /// Creates an inactive, undimmed effect.
    pub const fn new(full: u8, dimmed_level: u8) -> Self {
        Self {
            full,
            dimmed_level,
            dimmed: false,
            active: false,
        }
    }

    /// Switch on or off. The dimmed flag is kept across switching.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether the effect is on.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Select the dimmed level.
    pub fn set_dimmed(&mut self, dimmed: bool) {
        self.dimmed = dimmed;
    }

    /// Whether the dimmed level is selected.
    pub fn is_dimmed(&self) -> bool {
        self.dimmed
    }

    /// Write the current level.
    pub fn update<S: OutputSink>(&mut self, outputs: &mut S) -> Result<(), S::Error> {
        let value = match (self.active, self.dimmed) {
            (false, _) => 0,
            (true, false) => self.full,
            (true, true) => self.dimmed_level,
        };
        outputs.set_all(value)
    }
}

/// Firebox flicker: a slow sine walk around a base level.
///
/// The level is `base - depth/2 + noise·depth` with `noise` in `0..=1`.
/// The walk position only advances while active.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Flicker {
    base: u8,
    depth: u8,
    phase: f32,
    increment: f32,
    active: bool,
}

impl Flicker {
    /// Creates a flicker starting at phase 0.
    ///
    /// `speed` (0..=255) scales the walk step from 0.01 to 0.11 per 16.67 ms.
    pub fn new(base: u8, depth: u8, speed: u8) -> Self {
        Self {
            base,
            depth,
            phase: 0.0,
            increment: 0.01 + (f32::from(speed) / 255.0) * 0.1,
            active: false,
        }
    }

    /// Creates a flicker with a random start phase, so several fireboxes
    /// configured alike do not flicker in lockstep.
    pub fn with_random_phase(base: u8, depth: u8, speed: u8, rng: &mut dyn RngCore) -> Self {
        let mut flicker = Self::new(base, depth, speed);
        flicker.phase = libm::fmodf((rng.next_u32() % 1000) as f32, TWO_PI);
        flicker
    }

    /// Current walk position in radians, within `0..2π`.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Switch on or off.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether the effect is on.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advance and write the current level.
    pub fn update<S: OutputSink>(&mut self, delta_ms: u32, outputs: &mut S) -> Result<(), S::Error> {
        if !self.active {
            return outputs.set_all(0);
        }
        let step = self.increment * (delta_ms as f32 / 16.67);
        self.phase = libm::fmodf(self.phase + step, TWO_PI);
        let noise = (libm::sinf(self.phase) + 1.0) / 2.0;
        let amount = (noise * f32::from(self.depth)) as i32;
        let value = i32::from(self.base) - i32::from(self.depth / 2) + amount;
        outputs.set_all(value.clamp(0, 255) as u8)
    }
}

/// Square-wave strobe.
///
/// The timer resets when the effect is switched off, so every activation
/// starts with the "on" part of the period.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Strobe {
    brightness: u8,
    period_ms: u32,
    on_time_ms: u32,
    timer_ms: u32,
    active: bool,
}

impl Strobe {
    /// Creates a strobe. A frequency of 0 is treated as 1 Hz and the duty
    /// cycle is clamped to 100 %.
    pub fn new(frequency_hz: u16, duty_percent: u8, brightness: u8) -> Self {
        let period_ms = 1000 / u32::from(frequency_hz.max(1));
        let period_ms = period_ms.max(1);
        Self {
            brightness,
            period_ms,
            on_time_ms: period_ms * u32::from(duty_percent.min(100)) / 100,
            timer_ms: 0,
            active: false,
        }
    }

    /// Length of one flash cycle.
    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Length of the lit part of a cycle.
    pub fn on_time_ms(&self) -> u32 {
        self.on_time_ms
    }

    /// Switch on or off.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.timer_ms = 0;
        }
    }

    /// Whether the effect is on.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advance and write the current level.
    pub fn update<S: OutputSink>(&mut self, delta_ms: u32, outputs: &mut S) -> Result<(), S::Error> {
        if !self.active {
            return outputs.set_all(0);
        }
        self.timer_ms = (self.timer_ms + delta_ms % self.period_ms) % self.period_ms;
        let value = if self.timer_ms < self.on_time_ms {
            self.brightness
        } else {
            0
        };
        outputs.set_all(value)
    }
}

/// Mars light: a sine oscillation between 0 and a peak level.
///
/// The phase shift lets two Mars lights on one locomotive swing in
/// opposition.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarsLight {
    peak: u8,
    period_ms: f32,
    phase_shift: f32,
    angle: f32,
    active: bool,
}

impl MarsLight {
    /// Creates an oscillation of `frequency_mhz` millihertz (0 is treated
    /// as 1 mHz) shifted by `phase_shift_percent` of a period.
    pub fn new(frequency_mhz: u16, peak: u8, phase_shift_percent: i8) -> Self {
        let frequency_hz = f32::from(frequency_mhz.max(1)) / 1000.0;
        let phase_shift = TWO_PI * (f32::from(phase_shift_percent) / 100.0);
        Self {
            peak,
            period_ms: 1000.0 / frequency_hz,
            phase_shift,
            angle: phase_shift,
            active: false,
        }
    }

    /// Oscillation period in milliseconds.
    pub fn period_ms(&self) -> f32 {
        self.period_ms
    }

    /// Switch on or off.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether the effect is on.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advance and write the current level.
    pub fn update<S: OutputSink>(&mut self, delta_ms: u32, outputs: &mut S) -> Result<(), S::Error> {
        if !self.active {
            return outputs.set_all(0);
        }
        // Whole periods do not move the wave
        let elapsed = libm::fmodf(delta_ms as f32, self.period_ms);
        let offset = self.angle - self.phase_shift + (TWO_PI / self.period_ms) * elapsed;
        self.angle = self.phase_shift + libm::fmodf(offset, TWO_PI);
        let wave = (libm::sinf(self.angle) + 1.0) / 2.0;
        outputs.set_all((wave * f32::from(self.peak)) as u8)
    }
}

/// Linear fade to a target level on activation and back to 0 on
/// deactivation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SoftStartStop {
    target: u8,
    fade_in_step: f32,
    fade_out_step: f32,
    level: f32,
    active: bool,
}

impl SoftStartStop {
    /// Creates a fade. A fade time of 0 jumps to the end in one tick.
    pub fn new(fade_in_ms: u16, fade_out_ms: u16, target: u8) -> Self {
        let step = |ms: u16| {
            if ms == 0 {
                f32::from(target)
            } else {
                f32::from(target) / f32::from(ms)
            }
        };
        Self {
            target,
            fade_in_step: step(fade_in_ms),
            fade_out_step: step(fade_out_ms),
            level: 0.0,
            active: false,
        }
    }

    /// Current level before truncation.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Switch on or off. The ramp continues from the current level.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether the effect is on.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advance the ramp and write the current level.
    pub fn update<S: OutputSink>(&mut self, delta_ms: u32, outputs: &mut S) -> Result<(), S::Error> {
        let target = f32::from(self.target);
        let elapsed = delta_ms as f32;
        if self.active {
            if self.level < target {
                self.level = (self.level + self.fade_in_step * elapsed).min(target);
            }
        } else if self.level > 0.0 {
            self.level = (self.level - self.fade_out_step * elapsed).max(0.0);
        }
        outputs.set_all(self.level as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{FixedRng, RecordingSink};

    fn sink() -> RecordingSink {
        RecordingSink::new(1)
    }

    // =========================================================================
    // Steady / Dimming
    // =========================================================================

    #[test]
    fn steady_writes_brightness_only_when_active() {
        let mut effect = Steady::new(128);
        let mut out = sink();
        effect.update(&mut out).unwrap();
        assert_eq!(out.first(), 0);

        effect.set_active(true);
        effect.update(&mut out).unwrap();
        assert_eq!(out.first(), 128);

        effect.set_active(false);
        effect.update(&mut out).unwrap();
        assert_eq!(out.first(), 0);
    }

    #[test]
    fn dimming_switches_levels() {
        let mut effect = Dimming::new(255, 60);
        let mut out = sink();
        effect.set_active(true);
        effect.update(&mut out).unwrap();
        assert_eq!(out.first(), 255);

        effect.set_dimmed(true);
        effect.update(&mut out).unwrap();
        assert_eq!(out.first(), 60);

        effect.set_active(false);
        effect.update(&mut out).unwrap();
        assert_eq!(out.first(), 0);
        assert!(effect.is_dimmed());
    }

    // =========================================================================
    // Flicker
    // =========================================================================

    #[test]
    fn flicker_stays_within_depth_band() {
        let mut effect = Flicker::new(150, 60, 200);
        let mut out = sink();
        effect.set_active(true);
        for _ in 0..500 {
            effect.update(16, &mut out).unwrap();
            assert!((120..=180).contains(&out.first()), "got {}", out.first());
        }
    }

    #[test]
    fn flicker_clamps_at_zero() {
        let mut effect = Flicker::new(10, 200, 255);
        let mut out = sink();
        effect.set_active(true);
        for _ in 0..200 {
            effect.update(16, &mut out).unwrap();
        }
        // base - depth/2 is negative, so the low half of the wave clamps
        assert!(out.first() <= 110);
    }

    #[test]
    fn flicker_inactive_is_off_and_frozen() {
        let mut effect = Flicker::new(150, 60, 100);
        let mut out = RecordingSink::new(1);
        out.values[0] = 99;
        effect.update(100, &mut out).unwrap();
        assert_eq!(out.first(), 0);
        assert_eq!(effect.phase(), 0.0);
    }

    #[test]
    fn flicker_random_phase_comes_from_rng() {
        let mut rng = FixedRng::new(1234);
        let effect = Flicker::with_random_phase(100, 20, 0, &mut rng);
        assert_eq!(effect.phase(), libm::fmodf(234.0, TWO_PI));
    }

    // =========================================================================
    // Strobe
    // =========================================================================

    #[test]
    fn strobe_ten_hz_quarter_duty() {
        let mut effect = Strobe::new(10, 25, 255);
        let mut out = sink();
        effect.set_active(true);

        effect.update(10, &mut out).unwrap();
        assert_eq!(out.first(), 255);
        effect.update(15, &mut out).unwrap();
        assert_eq!(out.first(), 0);
        effect.update(75, &mut out).unwrap();
        assert_eq!(out.first(), 255);
    }

    #[test]
    fn strobe_zero_frequency_is_one_hz() {
        let effect = Strobe::new(0, 150, 255);
        assert_eq!(effect.period_ms(), 1000);
        assert_eq!(effect.on_time_ms(), 1000);
    }

    #[test]
    fn strobe_restarts_after_deactivation() {
        let mut effect = Strobe::new(10, 50, 200);
        let mut out = sink();
        effect.set_active(true);
        effect.update(60, &mut out).unwrap();
        assert_eq!(out.first(), 0);

        effect.set_active(false);
        effect.update(10, &mut out).unwrap();
        assert_eq!(out.first(), 0);

        effect.set_active(true);
        effect.update(10, &mut out).unwrap();
        assert_eq!(out.first(), 200);
    }

    // =========================================================================
    // Mars light
    // =========================================================================

    #[test]
    fn mars_light_starts_mid_wave_and_peaks_at_quarter_period() {
        // 1 Hz, no phase shift
        let mut effect = MarsLight::new(1000, 200, 0);
        let mut out = sink();
        effect.set_active(true);

        effect.update(0, &mut out).unwrap();
        assert_eq!(out.first(), 100);

        effect.update(250, &mut out).unwrap();
        assert!(out.first() >= 199);

        effect.update(500, &mut out).unwrap();
        assert!(out.first() <= 1);
    }

    #[test]
    fn mars_light_phase_shift_offsets_wave() {
        // quarter period shift: starts at the peak
        let mut effect = MarsLight::new(1000, 200, 25);
        let mut out = sink();
        effect.set_active(true);
        effect.update(0, &mut out).unwrap();
        assert!(out.first() >= 199);
    }

    #[test]
    fn mars_light_zero_frequency_and_inactive() {
        let mut effect = MarsLight::new(0, 255, 0);
        assert!((effect.period_ms() - 1_000_000.0).abs() < 1.0);
        let mut out = sink();
        effect.update(10, &mut out).unwrap();
        assert_eq!(out.first(), 0);
    }

    #[test]
    fn mars_light_angle_stays_bounded() {
        let mut effect = MarsLight::new(5000, 255, 0);
        let mut out = sink();
        effect.set_active(true);
        for _ in 0..10_000 {
            effect.update(33, &mut out).unwrap();
        }
        assert!(effect.angle <= TWO_PI + 0.001);
    }

    #[test]
    fn mars_light_huge_tick_returns_bounded() {
        let mut effect = MarsLight::new(u16::MAX, 255, 0);
        let mut out = sink();
        effect.set_active(true);
        effect.update(u32::MAX, &mut out).unwrap();
        effect.update(u32::MAX, &mut out).unwrap();
        assert!((0.0..TWO_PI).contains(&effect.angle));
    }

    #[test]
    fn mars_light_whole_periods_keep_level() {
        // 1 Hz shifted by half a period: a quarter period in sits at the
        // trough, and an hour of whole periods later it still does
        let mut effect = MarsLight::new(1000, 200, -50);
        let mut out = sink();
        effect.set_active(true);
        effect.update(250, &mut out).unwrap();
        assert_eq!(out.first(), 0);
        effect.update(3_600_000, &mut out).unwrap();
        assert_eq!(out.first(), 0);
        assert!((effect.angle - effect.phase_shift) >= 0.0);
    }

    #[test]
    fn flicker_phase_wraps() {
        let mut effect = Flicker::new(150, 60, 255);
        let mut out = sink();
        effect.set_active(true);
        for _ in 0..100_000 {
            effect.update(20, &mut out).unwrap();
        }
        assert!((0.0..TWO_PI).contains(&effect.phase()));

        effect.update(u32::MAX, &mut out).unwrap();
        assert!((0.0..TWO_PI).contains(&effect.phase()));
    }

    // =========================================================================
    // Soft start / stop
    // =========================================================================

    #[test]
    fn soft_start_stop_ramps_both_ways() {
        let mut effect = SoftStartStop::new(100, 50, 200);
        let mut out = sink();
        effect.set_active(true);

        effect.update(50, &mut out).unwrap();
        assert_eq!(out.first(), 100);
        effect.update(50, &mut out).unwrap();
        assert_eq!(out.first(), 200);
        effect.update(50, &mut out).unwrap();
        assert_eq!(out.first(), 200);

        effect.set_active(false);
        effect.update(25, &mut out).unwrap();
        assert_eq!(out.first(), 100);
        effect.update(25, &mut out).unwrap();
        assert_eq!(out.first(), 0);
    }

    #[test]
    fn soft_start_stop_inactive_ramps_instead_of_cutting() {
        let mut effect = SoftStartStop::new(0, 1000, 255);
        let mut out = sink();
        effect.set_active(true);
        effect.update(1, &mut out).unwrap();
        assert_eq!(out.first(), 255);

        effect.set_active(false);
        effect.update(100, &mut out).unwrap();
        assert!(out.first() > 200);
    }

    #[test]
    fn soft_start_stop_zero_fade_jumps() {
        let mut effect = SoftStartStop::new(0, 0, 180);
        let mut out = sink();
        effect.set_active(true);
        effect.update(1, &mut out).unwrap();
        assert_eq!(out.first(), 180);
        effect.set_active(false);
        effect.update(1, &mut out).unwrap();
        assert_eq!(out.first(), 0);
    }
}
