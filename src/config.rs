//! Board configuration: output table, RNG seed and tick cadence.
//!
//! Plain data with builder methods so a board description can live in a
//! `const`-like constructor on the device and be loaded from a file on the
//! desktop (with the `serde` feature).
//!
//! # Example
//!
//! ```rust
//! use loco_aux::config::{AuxConfig, OutputConfig};
//! use loco_aux::output::{BrightnessCurve, OutputKind};
//!
//! // The reference board
//! let config = AuxConfig::default_pinout();
//! assert_eq!(config.outputs.len(), 4);
//!
//! // Or describe your own
//! let config = AuxConfig::default()
//!     .with_output(OutputConfig::new(5, OutputKind::PwmHighSide).with_curve(BrightnessCurve::Logarithmic))
//!     .with_rng_seed(7)
//!     .with_tick_interval_ms(10);
//! assert_eq!(config.outputs[0].pin, 5);
//! ```

use heapless::Vec as HVec;

use crate::output::{BrightnessCurve, OutputKind, PhysicalOutput, DEFAULT_PWM_FREQUENCY_HZ, MAX_OUTPUTS};

/// Seed for the effect RNG when none is configured.
pub const DEFAULT_RNG_SEED: u64 = 0x5EED_A0C5;

/// Main-loop cadence when none is configured.
pub const DEFAULT_TICK_INTERVAL_MS: u32 = 20;

// ============================================================================
// Output Config
// ============================================================================

/// One entry of the output table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputConfig {
    /// Pin handed to the driver
    pub pin: u8,
    /// Electrical kind
    pub kind: OutputKind,
    /// PWM frequency in Hz
    pub pwm_frequency_hz: u16,
    /// Brightness curve
    pub curve: BrightnessCurve,
}

impl OutputConfig {
    /// Output with the default frequency and a linear curve.
    pub const fn new(pin: u8, kind: OutputKind) -> Self {
        Self {
            pin,
            kind,
            pwm_frequency_hz: DEFAULT_PWM_FREQUENCY_HZ,
            curve: BrightnessCurve::Linear,
        }
    }

    /// Set the PWM frequency
    pub const fn with_pwm_frequency(mut self, hz: u16) -> Self {
        self.pwm_frequency_hz = hz;
        self
    }

    /// Set the brightness curve
    pub const fn with_curve(mut self, curve: BrightnessCurve) -> Self {
        self.curve = curve;
        self
    }

    /// Build the runtime output.
    pub const fn to_output(&self) -> PhysicalOutput {
        PhysicalOutput::new(self.pin, self.kind)
            .with_pwm_frequency(self.pwm_frequency_hz)
            .with_curve(self.curve)
    }
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete board configuration
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuxConfig {
    /// Output table; position `n` is output id `n + 1`
    pub outputs: HVec<OutputConfig, MAX_OUTPUTS>,
    /// Seed for the effect RNG
    pub rng_seed: u64,
    /// Expected interval between `update` calls
    pub tick_interval_ms: u32,
}

impl Default for AuxConfig {
    fn default() -> Self {
        Self {
            outputs: HVec::new(),
            rng_seed: DEFAULT_RNG_SEED,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl AuxConfig {
    /// The reference board: front, rear and cab light on pins 26, 27, 28
    /// as low-side PWM, and a servo on pin 29.
    pub fn default_pinout() -> Self {
        Self::default()
            .with_output(OutputConfig::new(26, OutputKind::PwmLowSide))
            .with_output(OutputConfig::new(27, OutputKind::PwmLowSide))
            .with_output(OutputConfig::new(28, OutputKind::PwmLowSide))
            .with_output(OutputConfig::new(29, OutputKind::Servo).with_pwm_frequency(50))
    }

    /// Append an output. Entries beyond the table size are dropped.
    pub fn with_output(mut self, output: OutputConfig) -> Self {
        if self.outputs.push(output).is_err() {
            log::warn!("output table full, pin {} dropped", output.pin);
        }
        self
    }

    /// Set the RNG seed
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }

    /// Set the tick interval
    pub fn with_tick_interval_ms(mut self, ms: u32) -> Self {
        self.tick_interval_ms = ms;
        self
    }
}
