//! Smoke unit: a heater element plus a fan.

use super::EffectContext;
use crate::output::OutputSink;

/// Speed step at which a speed-synced fan reaches its maximum.
pub const FAN_FULL_SPEED_STEP: u16 = 28;

/// Fan drive for a [`SmokeGenerator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FanMode {
    /// Fixed fan level while active.
    Static(u8),
    /// Fan level proportional to speed, reaching `max` at speed step 28.
    SpeedSync {
        /// Fan level at or above full speed.
        max: u8,
    },
}

/// Heater on the first bound output, fan on the second.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SmokeGenerator {
    heater_enabled: bool,
    fan: FanMode,
    active: bool,
}

impl SmokeGenerator {
    /// Creates an inactive smoke unit.
    pub const fn new(heater_enabled: bool, fan: FanMode) -> Self {
        Self {
            heater_enabled,
            fan,
            active: false,
        }
    }

    /// Fan drive mode.
    pub const fn fan_mode(&self) -> FanMode {
        self.fan
    }

    /// Switch on or off.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether the effect is on.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Write heater and fan levels.
    pub fn update<S: OutputSink>(
        &mut self,
        outputs: &mut S,
        ctx: &EffectContext<'_>,
    ) -> Result<(), S::Error> {
        let heater = if self.active && self.heater_enabled {
            u8::MAX
        } else {
            0
        };
        let fan = if !self.active {
            0
        } else {
            match self.fan {
                FanMode::Static(level) => level,
                FanMode::SpeedSync { max } => {
                    let ratio = (f32::from(ctx.speed) / f32::from(FAN_FULL_SPEED_STEP)).clamp(0.0, 1.0);
                    (ratio * f32::from(max)) as u8
                }
            }
        };
        outputs.set_value(0, heater)?;
        outputs.set_value(1, fan)
    }
}
