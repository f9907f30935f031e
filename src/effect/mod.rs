//! Time-based output behaviours.
//!
//! An [`Effect`] turns "this function is on" into a stream of levels or
//! servo angles. Every effect keeps its own timers, advanced only by the
//! `delta_ms` handed to [`Effect::update`]; nothing reads a wall clock.
//!
//! # Variants
//!
//! | Code | Effect | Module |
//! |------|--------|--------|
//! | 1 | [`Steady`] | [`light`] |
//! | 2 | [`Dimming`] | [`light`] |
//! | 3 | [`Flicker`] | [`light`] |
//! | 4 | [`Strobe`] | [`light`] |
//! | 5 | [`MarsLight`] | [`light`] |
//! | 6 | [`SoftStartStop`] | [`light`] |
//! | 7 | [`ServoEffect`] | [`servo`] |
//! | 8 | [`SmokeGenerator`] | [`smoke`] |
//! | 9 | [`NeonTube`] | [`neon`] |
//!
//! Codes are the effect-type bytes of the proprietary CV layout.
//!
//! # Example
//!
//! ```rust
//! use loco_aux::effect::{Effect, EffectContext, Strobe};
//! use loco_aux::hal::{FixedRng, RecordingSink};
//!
//! let mut effect = Effect::from(Strobe::new(10, 25, 255));
//! let mut sink = RecordingSink::new(1);
//! let mut rng = FixedRng::new(0);
//! let mut ctx = EffectContext::new(0, &mut rng);
//!
//! effect.set_active(true);
//! effect.update(10, &mut sink, &mut ctx).unwrap();
//! assert_eq!(sink.first(), 255);
//! effect.update(15, &mut sink, &mut ctx).unwrap();
//! assert_eq!(sink.first(), 0);
//! ```

pub mod light;
pub mod neon;
pub mod servo;
pub mod smoke;

pub use light::{Dimming, Flicker, MarsLight, SoftStartStop, Steady, Strobe};
pub use neon::{NeonPhase, NeonTube};
pub use servo::{ServoEffect, ServoMode};
pub use smoke::{FanMode, SmokeGenerator};

use rand::RngCore;

use crate::output::OutputSink;

/// Decoder state an effect may read while updating.
pub struct EffectContext<'a> {
    /// Current speed step (0 = stopped).
    pub speed: u16,
    /// Randomness for effects that need it.
    pub rng: &'a mut dyn RngCore,
}

impl<'a> EffectContext<'a> {
    /// Creates a context for one update tick.
    pub fn new(speed: u16, rng: &'a mut dyn RngCore) -> Self {
        Self { speed, rng }
    }
}

/// Effect-type codes as stored in configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum EffectKind {
    /// Constant level.
    Steady = 1,
    /// Two levels, switched by the dimmed flag.
    Dimming = 2,
    /// Firebox-style random-looking flicker.
    Flicker = 3,
    /// Square-wave strobe.
    Strobe = 4,
    /// Sinusoidal oscillating beacon.
    MarsLight = 5,
    /// Linear fade in and out.
    SoftStartStop = 6,
    /// Servo between two endpoints.
    Servo = 7,
    /// Heater plus fan.
    SmokeGenerator = 8,
    /// Fluorescent tube with warm-up and flicker.
    NeonTube = 9,
}

impl EffectKind {
    /// Decode an effect-type byte. Unknown codes return `None`.
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => EffectKind::Steady,
            2 => EffectKind::Dimming,
            3 => EffectKind::Flicker,
            4 => EffectKind::Strobe,
            5 => EffectKind::MarsLight,
            6 => EffectKind::SoftStartStop,
            7 => EffectKind::Servo,
            8 => EffectKind::SmokeGenerator,
            9 => EffectKind::NeonTube,
            _ => return None,
        })
    }

    /// The effect-type byte.
    pub const fn code(&self) -> u8 {
        *self as u8
    }
}

/// One time-based behaviour, owned by exactly one logical function.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Effect {
    /// See [`Steady`].
    Steady(Steady),
    /// See [`Dimming`].
    Dimming(Dimming),
    /// See [`Flicker`].
    Flicker(Flicker),
    /// See [`Strobe`].
    Strobe(Strobe),
    /// See [`MarsLight`].
    MarsLight(MarsLight),
    /// See [`SoftStartStop`].
    SoftStartStop(SoftStartStop),
    /// See [`ServoEffect`].
    Servo(ServoEffect),
    /// See [`SmokeGenerator`].
    SmokeGenerator(SmokeGenerator),
    /// See [`NeonTube`].
    NeonTube(NeonTube),
}

impl Effect {
    /// Advance timers by `delta_ms` and write the new values.
    pub fn update<S: OutputSink>(
        &mut self,
        delta_ms: u32,
        outputs: &mut S,
        ctx: &mut EffectContext<'_>,
    ) -> Result<(), S::Error> {
        match self {
            Effect::Steady(e) => e.update(outputs),
            Effect::Dimming(e) => e.update(outputs),
            Effect::Flicker(e) => e.update(delta_ms, outputs),
            Effect::Strobe(e) => e.update(delta_ms, outputs),
            Effect::MarsLight(e) => e.update(delta_ms, outputs),
            Effect::SoftStartStop(e) => e.update(delta_ms, outputs),
            Effect::Servo(e) => e.update(delta_ms, outputs),
            Effect::SmokeGenerator(e) => e.update(outputs, ctx),
            Effect::NeonTube(e) => e.update(delta_ms, outputs, ctx),
        }
    }

    /// Switch the effect on or off.
    ///
    /// Setting the state it already has is a no-op for every variant.
    pub fn set_active(&mut self, active: bool) {
        match self {
            Effect::Steady(e) => e.set_active(active),
            Effect::Dimming(e) => e.set_active(active),
            Effect::Flicker(e) => e.set_active(active),
            Effect::Strobe(e) => e.set_active(active),
            Effect::MarsLight(e) => e.set_active(active),
            Effect::SoftStartStop(e) => e.set_active(active),
            Effect::Servo(e) => e.set_active(active),
            Effect::SmokeGenerator(e) => e.set_active(active),
            Effect::NeonTube(e) => e.set_active(active),
        }
    }

    /// Whether the effect is switched on.
    pub fn is_active(&self) -> bool {
        match self {
            Effect::Steady(e) => e.is_active(),
            Effect::Dimming(e) => e.is_active(),
            Effect::Flicker(e) => e.is_active(),
            Effect::Strobe(e) => e.is_active(),
            Effect::MarsLight(e) => e.is_active(),
            Effect::SoftStartStop(e) => e.is_active(),
            Effect::Servo(e) => e.is_active(),
            Effect::SmokeGenerator(e) => e.is_active(),
            Effect::NeonTube(e) => e.is_active(),
        }
    }

    /// Set the dimmed flag. Only [`Dimming`] reacts; other variants ignore it.
    pub fn set_dimmed(&mut self, dimmed: bool) {
        if let Effect::Dimming(e) = self {
            e.set_dimmed(dimmed);
        }
    }

    /// The dimmed flag; always false for variants other than [`Dimming`].
    pub fn is_dimmed(&self) -> bool {
        match self {
            Effect::Dimming(e) => e.is_dimmed(),
            _ => false,
        }
    }

    /// Which variant this is.
    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::Steady(_) => EffectKind::Steady,
            Effect::Dimming(_) => EffectKind::Dimming,
            Effect::Flicker(_) => EffectKind::Flicker,
            Effect::Strobe(_) => EffectKind::Strobe,
            Effect::MarsLight(_) => EffectKind::MarsLight,
            Effect::SoftStartStop(_) => EffectKind::SoftStartStop,
            Effect::Servo(_) => EffectKind::Servo,
            Effect::SmokeGenerator(_) => EffectKind::SmokeGenerator,
            Effect::NeonTube(_) => EffectKind::NeonTube,
        }
    }
}

macro_rules! impl_from_effect {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Effect {
                fn from(effect: $ty) -> Self {
                    Effect::$variant(effect)
                }
            }
        )*
    };
}

impl_from_effect!(
    Steady(Steady),
    Dimming(Dimming),
    Flicker(Flicker),
    Strobe(Strobe),
    MarsLight(MarsLight),
    SoftStartStop(SoftStartStop),
    Servo(ServoEffect),
    SmokeGenerator(SmokeGenerator),
    NeonTube(NeonTube),
);
