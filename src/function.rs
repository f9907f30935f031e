//! Logical functions: the unit mapping rules switch on and off.
//!
//! A [`LogicalFunction`] owns exactly one [`Effect`] and refers to one or
//! more physical outputs by index. Dropping the function drops the effect;
//! the outputs belong to the [`OutputBank`] and outlive it.

use crate::effect::{Effect, EffectContext};
use crate::output::{OutputBank, OutputIndex};
use crate::traits::OutputDriver;

/// Maximum outputs a single logical function can drive.
pub const MAX_OUTPUTS_PER_FUNCTION: usize = 4;

/// One effect bound to its outputs.
///
/// # Example
///
/// ```rust
/// use loco_aux::effect::{EffectContext, Steady};
/// use loco_aux::function::LogicalFunction;
/// use loco_aux::hal::{FixedRng, MockDriver};
/// use loco_aux::output::{OutputBank, OutputKind, PhysicalOutput};
///
/// let mut bank = OutputBank::new(MockDriver::new());
/// let index = bank.add(PhysicalOutput::new(4, OutputKind::PwmLowSide)).unwrap().unwrap();
///
/// let mut headlight = LogicalFunction::new(Steady::new(180)).with_output(index);
/// headlight.set_active(true);
///
/// let mut rng = FixedRng::new(0);
/// headlight.update(20, &mut bank, &mut EffectContext::new(0, &mut rng)).unwrap();
/// assert_eq!(bank.driver().pwm(4), Some(180));
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogicalFunction {
    effect: Effect,
    outputs: heapless::Vec<OutputIndex, MAX_OUTPUTS_PER_FUNCTION>,
}

impl LogicalFunction {
    /// Creates a function with no outputs yet.
    pub fn new(effect: impl Into<Effect>) -> Self {
        Self {
            effect: effect.into(),
            outputs: heapless::Vec::new(),
        }
    }

    /// Builder form of [`add_output`](Self::add_output).
    pub fn with_output(mut self, index: OutputIndex) -> Self {
        self.add_output(index);
        self
    }

    /// Bind another output. Returns false (and binds nothing) when the
    /// function already drives [`MAX_OUTPUTS_PER_FUNCTION`] outputs.
    pub fn add_output(&mut self, index: OutputIndex) -> bool {
        if self.outputs.push(index).is_err() {
            log::warn!("logical function output list full, output index {index} dropped");
            return false;
        }
        true
    }

    /// Bound output indices, in slot order.
    pub fn outputs(&self) -> &[OutputIndex] {
        &self.outputs
    }

    /// The owned effect.
    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    /// Mutable access to the owned effect.
    pub fn effect_mut(&mut self) -> &mut Effect {
        &mut self.effect
    }

    /// Switch the effect on or off.
    pub fn set_active(&mut self, active: bool) {
        self.effect.set_active(active);
    }

    /// Whether the effect is on.
    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }

    /// Set the effect's dimmed flag.
    pub fn set_dimmed(&mut self, dimmed: bool) {
        self.effect.set_dimmed(dimmed);
    }

    /// The effect's dimmed flag.
    pub fn is_dimmed(&self) -> bool {
        self.effect.is_dimmed()
    }

    /// Advance the effect and let it write into the bound outputs.
    pub fn update<D: OutputDriver>(
        &mut self,
        delta_ms: u32,
        bank: &mut OutputBank<D>,
        ctx: &mut EffectContext<'_>,
    ) -> Result<(), D::Error> {
        let mut sink = bank.bind(&self.outputs);
        self.effect.update(delta_ms, &mut sink, ctx)
    }
}
