//! Fluorescent tube: stutters while warming up, then burns steadily with
//! the occasional short flicker.

use super::EffectContext;
use crate::output::OutputSink;

/// Half-period of the warm-up stutter.
pub const WARMUP_BLINK_MS: u32 = 50;
/// Half-period of a flicker excursion.
pub const FLICKER_BLINK_MS: u32 = 75;
/// Minimum steady time between two flicker excursions.
pub const FLICKER_GATE_MS: u32 = 5000;
/// Chance, in percent per tick, of starting an excursion once the gate is open.
pub const FLICKER_CHANCE_PERCENT: u32 = 5;

/// Where the tube is in its life cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NeonPhase {
    /// Dark.
    #[default]
    Off,
    /// Alternating full and half brightness until the warm-up time passed.
    WarmingUp,
    /// Constant brightness.
    Steady,
    /// Short excursion alternating brightness/1.5 and brightness.
    Flickering,
}

/// Neon / fluorescent tube light.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NeonTube {
    warmup_ms: u32,
    brightness: u8,
    phase: NeonPhase,
    /// Time spent in the current phase.
    timer_ms: u32,
    /// Length of the running flicker excursion.
    flicker_ms: u32,
    active: bool,
}

impl NeonTube {
    /// Creates a dark tube.
    pub const fn new(warmup_ms: u32, brightness: u8) -> Self {
        Self {
            warmup_ms,
            brightness,
            phase: NeonPhase::Off,
            timer_ms: 0,
            flicker_ms: 0,
            active: false,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> NeonPhase {
        self.phase
    }

    /// Switch on or off.
    ///
    /// Activating a dark tube starts the warm-up; activating a lit tube
    /// changes nothing. Deactivation goes dark immediately.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if active {
            if self.phase == NeonPhase::Off {
                self.phase = NeonPhase::WarmingUp;
                self.timer_ms = 0;
            }
        } else {
            self.phase = NeonPhase::Off;
        }
    }

    /// Whether the effect is on.
    pub fn is_active(&self) -> bool {
        self.active
    }

    fn enter(&mut self, phase: NeonPhase) {
        self.phase = phase;
        self.timer_ms = 0;
    }

    /// Advance the state machine and write the current level.
    pub fn update<S: OutputSink>(
        &mut self,
        delta_ms: u32,
        outputs: &mut S,
        ctx: &mut EffectContext<'_>,
    ) -> Result<(), S::Error> {
        self.timer_ms = self.timer_ms.saturating_add(delta_ms);
        let full = self.brightness;

        let value = match self.phase {
            NeonPhase::Off => 0,
            NeonPhase::WarmingUp => {
                let value = if (self.timer_ms / WARMUP_BLINK_MS) % 2 == 0 {
                    full
                } else {
                    full / 2
                };
                if self.timer_ms >= self.warmup_ms {
                    self.enter(NeonPhase::Steady);
                }
                value
            }
            NeonPhase::Steady => {
                if self.timer_ms > FLICKER_GATE_MS
                    && ctx.rng.next_u32() % 100 < FLICKER_CHANCE_PERCENT
                {
                    self.flicker_ms = 100 + ctx.rng.next_u32() % 200;
                    self.enter(NeonPhase::Flickering);
                }
                full
            }
            NeonPhase::Flickering => {
                let value = if (self.timer_ms / FLICKER_BLINK_MS) % 2 == 0 {
                    (f32::from(full) / 1.5) as u8
                } else {
                    full
                };
                if self.timer_ms > self.flicker_ms {
                    self.enter(NeonPhase::Steady);
                }
                value
            }
        };

        outputs.set_all(value)
    }
}
