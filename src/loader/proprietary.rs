//! Proprietary encoding: explicit effect, variable and rule records.
//!
//! | Block | Base CV | Records | Size | Layout |
//! |-------|---------|---------|------|--------|
//! | Functions | 200 | 32 | 8 | effect code, p1, p2, p3, output, second output |
//! | Variables | 500 | 32 | 4 | source, comparator, parameter |
//! | Rules | 700 | 64 | 4 | target, positive id, negative id, action |
//!
//! A zero in a record's first byte marks the record unused; later records
//! are still read. Variable ids are the record number plus one. Rule
//! targets are 1-based positions in the list of used function records,
//! and id 0 in a rule means "no condition".

use super::GraphBuilder;
use crate::cv;
use crate::effect::{
    Dimming, Effect, EffectKind, FanMode, Flicker, MarsLight, NeonTube, ServoEffect, ServoMode,
    SmokeGenerator, SoftStartStop, Steady, Strobe,
};
use crate::function::LogicalFunction;
use crate::mapping::{
    Comparator, Condition, ConditionVariable, MappingAction, MappingRule, TriggerSource,
};
use crate::output::OutputTable;
use crate::traits::CvStore;

/// Function records.
pub const FUNCTION_RECORDS: u16 = 32;
/// Bytes per function record.
pub const FUNCTION_RECORD_SIZE: u16 = 8;
/// Variable records.
pub const VARIABLE_RECORDS: u16 = 32;
/// Bytes per variable record.
pub const VARIABLE_RECORD_SIZE: u16 = 4;
/// Rule records.
pub const RULE_RECORDS: u16 = 64;
/// Bytes per rule record.
pub const RULE_RECORD_SIZE: u16 = 4;

/// Build the effect for a function record.
///
/// Parameter scaling: Mars light frequency is `p1 × 100` mHz, fade and
/// warm-up times are `p × 10` ms. For servos a non-zero second output
/// byte selects momentary mode; for smoke units `p2 = 0` selects a
/// speed-synced fan. Unknown codes give a dark [`Steady`].
pub fn effect_from_record(
    code: u8,
    params: [u8; 3],
    second_output: u8,
    rng: &mut dyn rand::RngCore,
) -> Effect {
    let [p1, p2, p3] = params;
    let Some(kind) = EffectKind::from_code(code) else {
        log::warn!("unknown effect code {code}, using a dark steady effect");
        return Steady::new(0).into();
    };
    match kind {
        EffectKind::Steady => Steady::new(p1).into(),
        EffectKind::Dimming => Dimming::new(p1, p2).into(),
        EffectKind::Flicker => Flicker::with_random_phase(p1, p2, p3, rng).into(),
        EffectKind::Strobe => Strobe::new(u16::from(p1), p2, p3).into(),
        EffectKind::MarsLight => MarsLight::new(u16::from(p1) * 100, p2, p3 as i8).into(),
        EffectKind::SoftStartStop => {
            SoftStartStop::new(u16::from(p1) * 10, u16::from(p2) * 10, p3).into()
        }
        EffectKind::Servo => {
            let mode = if second_output != 0 {
                ServoMode::Momentary
            } else {
                ServoMode::Latching
            };
            ServoEffect::new(p1, p2, p3, mode).into()
        }
        EffectKind::SmokeGenerator => {
            let fan = if p2 == 0 {
                FanMode::SpeedSync { max: p3 }
            } else {
                FanMode::Static(p2)
            };
            SmokeGenerator::new(p1 != 0, fan).into()
        }
        EffectKind::NeonTube => NeonTube::new(u32::from(p1) * 10, p2).into(),
    }
}

pub(crate) fn load<S, T>(store: &mut S, builder: &mut GraphBuilder<'_, T>)
where
    S: CvStore + ?Sized,
    T: OutputTable + ?Sized,
{
    load_functions(store, builder);
    load_variables(store, builder);
    load_rules(store, builder);
}

fn load_functions<S, T>(store: &mut S, builder: &mut GraphBuilder<'_, T>)
where
    S: CvStore + ?Sized,
    T: OutputTable + ?Sized,
{
    for record in 0..FUNCTION_RECORDS {
        let base = cv::PROPRIETARY_FUNCTIONS + record * FUNCTION_RECORD_SIZE;
        let code = store.read_cv(base);
        if code == 0 {
            continue;
        }
        let params = [
            store.read_cv(base + 1),
            store.read_cv(base + 2),
            store.read_cv(base + 3),
        ];
        let output_id = store.read_cv(base + 4);
        let second_id = store.read_cv(base + 5);

        let effect = effect_from_record(code, params, second_id, builder.rng());
        let mut function = LogicalFunction::new(effect);
        // The function is kept without outputs so later targets keep their numbering.
        match builder.output(output_id) {
            Some(index) => {
                function.add_output(index);
            }
            None => log::debug!("function record {record}: output {output_id} not present"),
        }
        if code == EffectKind::SmokeGenerator.code() {
            if let Some(index) = builder.output(second_id) {
                function.add_output(index);
            }
        }
        builder.add_function(function);
    }
}

fn load_variables<S, T>(store: &mut S, builder: &mut GraphBuilder<'_, T>)
where
    S: CvStore + ?Sized,
    T: OutputTable + ?Sized,
{
    for record in 0..VARIABLE_RECORDS {
        let base = cv::PROPRIETARY_VARIABLES + record * VARIABLE_RECORD_SIZE;
        let source_code = store.read_cv(base);
        if source_code == 0 {
            continue;
        }
        let comparator_code = store.read_cv(base + 1);
        let (Some(source), Some(comparator)) = (
            TriggerSource::from_code(source_code),
            Comparator::from_code(comparator_code),
        ) else {
            log::warn!(
                "variable record {record}: unsupported source {source_code} / comparator {comparator_code}"
            );
            continue;
        };
        let parameter = u16::from(store.read_cv(base + 2));
        builder.add_variable_with_id(
            ConditionVariable::new(record + 1)
                .with_condition(Condition::new(source, comparator, parameter)),
        );
    }
}

fn load_rules<S, T>(store: &mut S, builder: &mut GraphBuilder<'_, T>)
where
    S: CvStore + ?Sized,
    T: OutputTable + ?Sized,
{
    for record in 0..RULE_RECORDS {
        let base = cv::PROPRIETARY_RULES + record * RULE_RECORD_SIZE;
        let target = store.read_cv(base);
        if target == 0 {
            continue;
        }
        let positive = store.read_cv(base + 1);
        let negative = store.read_cv(base + 2);
        let action_code = store.read_cv(base + 3);
        let Some(action) = MappingAction::from_code(action_code) else {
            log::warn!("rule record {record}: unknown action {action_code}");
            continue;
        };

        let mut rule = MappingRule::new(usize::from(target - 1), action);
        if positive != 0 {
            rule = rule.with_positive(u16::from(positive));
        }
        if negative != 0 {
            rule = rule.with_negative(u16::from(negative));
        }
        builder.add_rule(rule);
    }
}
