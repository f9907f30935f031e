//! Conditions, condition variables and mapping rules.
//!
//! The rule graph is a three-layer boolean expression:
//!
//! 1. A [`Condition`] compares one decoder-state source with a parameter.
//! 2. A [`ConditionVariable`] ANDs its conditions and has a numeric id.
//! 3. A [`MappingRule`] combines variable ids: blocked if **any** negative
//!    id is true, otherwise true if **any** positive id is true (or if it
//!    has no positive ids at all). A true rule applies its
//!    [`MappingAction`] to one logical function.
//!
//! Rules never look at decoder state directly. They read variable results
//! from a [`ConditionCache`] filled once per evaluation pass, so all rules
//! in one pass see the same snapshot.
//!
//! # Example
//!
//! ```rust
//! use loco_aux::mapping::{Condition, ConditionCache, ConditionVariable, MappingAction, MappingRule};
//! use loco_aux::state::DecoderState;
//! use loco_aux::Direction;
//!
//! // "F0 on while travelling forward"
//! let headlight = ConditionVariable::new(1)
//!     .with_condition(Condition::function_on(0))
//!     .with_condition(Condition::direction_is(Direction::Forward));
//!
//! let rule = MappingRule::new(0, MappingAction::Activate).with_positive(1);
//!
//! let mut state = DecoderState::new();
//! state.set_function(0, true);
//!
//! let mut cache = ConditionCache::new();
//! cache.rebuild(core::slice::from_ref(&headlight), &state);
//! assert!(rule.evaluate(&cache));
//! ```

extern crate alloc;
use alloc::vec::Vec;

use crate::state::DecoderState;
use crate::traits::Direction;

/// Conditions per variable.
pub const MAX_CONDITIONS: usize = 4;
/// Variable ids per rule list (positive or negative).
pub const MAX_RULE_IDS: usize = 8;

/// Id of a [`ConditionVariable`]. 0 is never assigned.
pub type ConditionId = u16;

/// Which part of the decoder state a condition reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TriggerSource {
    /// Function key `parameter`: 1 when on, 0 when off.
    FunctionKey,
    /// Direction of travel: 1 forward, 0 reverse.
    Direction,
    /// Speed step.
    Speed,
    /// Binary state `parameter`: 1 when on, 0 when off.
    BinaryState,
}

impl TriggerSource {
    /// Decode a configuration byte. Returns `None` for unknown or
    /// unsupported codes (4, logical-function state, is not evaluated).
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(TriggerSource::FunctionKey),
            2 => Some(TriggerSource::Direction),
            3 => Some(TriggerSource::Speed),
            5 => Some(TriggerSource::BinaryState),
            _ => None,
        }
    }
}

/// How a source value is compared with the condition parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Comparator {
    /// `value == parameter`
    Equal,
    /// `value != parameter`
    NotEqual,
    /// `value > parameter`
    GreaterThan,
    /// `value < parameter`
    LessThan,
    /// `value >= parameter`
    GreaterOrEqual,
    /// `value <= parameter`
    LessOrEqual,
    /// `value & parameter != 0`
    BitAnd,
    /// `value != 0`
    IsTrue,
}

impl Comparator {
    /// Decode a configuration byte (1..=8).
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => Comparator::Equal,
            2 => Comparator::NotEqual,
            3 => Comparator::GreaterThan,
            4 => Comparator::LessThan,
            5 => Comparator::GreaterOrEqual,
            6 => Comparator::LessOrEqual,
            7 => Comparator::BitAnd,
            8 => Comparator::IsTrue,
            _ => return None,
        })
    }

    /// Apply the comparison.
    pub const fn compare(&self, value: u16, parameter: u16) -> bool {
        match self {
            Comparator::Equal => value == parameter,
            Comparator::NotEqual => value != parameter,
            Comparator::GreaterThan => value > parameter,
            Comparator::LessThan => value < parameter,
            Comparator::GreaterOrEqual => value >= parameter,
            Comparator::LessOrEqual => value <= parameter,
            Comparator::BitAnd => value & parameter != 0,
            Comparator::IsTrue => value != 0,
        }
    }
}

/// One primitive comparison against decoder state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Condition {
    /// What to read.
    pub source: TriggerSource,
    /// How to compare.
    pub comparator: Comparator,
    /// Key/state number for key and binary-state sources, and the
    /// comparison operand for every source.
    pub parameter: u16,
}

impl Condition {
    /// Creates a condition.
    pub const fn new(source: TriggerSource, comparator: Comparator, parameter: u16) -> Self {
        Self {
            source,
            comparator,
            parameter,
        }
    }

    /// True while function key `number` is on.
    pub const fn function_on(number: u16) -> Self {
        Self::new(TriggerSource::FunctionKey, Comparator::IsTrue, number)
    }

    /// True while travelling in `direction`.
    pub const fn direction_is(direction: Direction) -> Self {
        Self::new(
            TriggerSource::Direction,
            Comparator::Equal,
            direction.as_raw() as u16,
        )
    }

    /// True while binary state `number` is on.
    pub const fn binary_state_on(number: u16) -> Self {
        Self::new(TriggerSource::BinaryState, Comparator::IsTrue, number)
    }

    /// True while the speed step is above `step`.
    pub const fn speed_above(step: u16) -> Self {
        Self::new(TriggerSource::Speed, Comparator::GreaterThan, step)
    }

    /// The raw value of the source.
    pub fn source_value(&self, state: &DecoderState) -> u16 {
        match self.source {
            TriggerSource::FunctionKey => u16::from(state.function(self.parameter)),
            TriggerSource::Direction => u16::from(state.direction().as_raw()),
            TriggerSource::Speed => state.speed(),
            TriggerSource::BinaryState => u16::from(state.binary_state(self.parameter)),
        }
    }

    /// Evaluate against `state`.
    pub fn evaluate(&self, state: &DecoderState) -> bool {
        self.comparator
            .compare(self.source_value(state), self.parameter)
    }
}

/// Named AND of conditions.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConditionVariable {
    id: ConditionId,
    conditions: heapless::Vec<Condition, MAX_CONDITIONS>,
}

impl ConditionVariable {
    /// Creates a variable with no conditions (always true).
    pub fn new(id: ConditionId) -> Self {
        Self {
            id,
            conditions: heapless::Vec::new(),
        }
    }

    /// Builder form of [`push`](Self::push).
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.push(condition);
        self
    }

    /// Append a condition. Returns false when the variable is full.
    pub fn push(&mut self, condition: Condition) -> bool {
        if self.conditions.push(condition).is_err() {
            log::warn!("condition variable {} full, condition dropped", self.id);
            return false;
        }
        true
    }

    /// The variable's id.
    pub fn id(&self) -> ConditionId {
        self.id
    }

    /// The ANDed conditions.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// True iff every condition holds.
    pub fn evaluate(&self, state: &DecoderState) -> bool {
        self.conditions.iter().all(|c| c.evaluate(state))
    }
}

/// What a true rule does to its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MappingAction {
    /// Switch the function on.
    Activate,
    /// Switch the function off.
    Deactivate,
    /// Flip the function's dimmed flag.
    ToggleDimmed,
}

impl MappingAction {
    /// Decode a configuration byte (1..=3).
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(MappingAction::Activate),
            2 => Some(MappingAction::Deactivate),
            3 => Some(MappingAction::ToggleDimmed),
            _ => None,
        }
    }
}

/// Rule driving one logical function.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MappingRule {
    /// Index of the target logical function.
    pub target: usize,
    /// Ids ORed together.
    pub positive: heapless::Vec<ConditionId, MAX_RULE_IDS>,
    /// Ids that each block the rule.
    pub negative: heapless::Vec<ConditionId, MAX_RULE_IDS>,
    /// Applied when the rule is true.
    pub action: MappingAction,
}

impl MappingRule {
    /// Creates a rule with empty id lists (always true).
    pub fn new(target: usize, action: MappingAction) -> Self {
        Self {
            target,
            positive: heapless::Vec::new(),
            negative: heapless::Vec::new(),
            action,
        }
    }

    /// Add a positive id. Ids beyond [`MAX_RULE_IDS`] are dropped.
    pub fn with_positive(mut self, id: ConditionId) -> Self {
        if self.positive.push(id).is_err() {
            log::warn!("rule for function {} has too many positive ids", self.target);
        }
        self
    }

    /// Add a negative (blocking) id. Ids beyond [`MAX_RULE_IDS`] are dropped.
    pub fn with_negative(mut self, id: ConditionId) -> Self {
        if self.negative.push(id).is_err() {
            log::warn!("rule for function {} has too many negative ids", self.target);
        }
        self
    }

    /// Evaluate against cached variable results.
    pub fn evaluate(&self, cache: &ConditionCache) -> bool {
        if self.negative.iter().any(|&id| cache.get(id)) {
            return false;
        }
        self.positive.is_empty() || self.positive.iter().any(|&id| cache.get(id))
    }
}

/// Results of one evaluation pass, keyed by variable id.
#[derive(Clone, Debug, Default)]
pub struct ConditionCache {
    /// Sorted by id.
    entries: Vec<(ConditionId, bool)>,
}

impl ConditionCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate every variable against `state`, replacing previous results.
    pub fn rebuild(&mut self, variables: &[ConditionVariable], state: &DecoderState) {
        self.entries.clear();
        self.entries
            .extend(variables.iter().map(|v| (v.id(), v.evaluate(state))));
        self.entries.sort_unstable_by_key(|&(id, _)| id);
    }

    /// Cached result for `id`; false for unknown ids.
    pub fn get(&self, id: ConditionId) -> bool {
        self.entries
            .binary_search_by_key(&id, |&(id, _)| id)
            .map(|i| self.entries[i].1)
            .unwrap_or(false)
    }

    /// Number of cached variables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true before the first pass.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with(values: &[(ConditionId, bool)]) -> ConditionCache {
        let mut state = DecoderState::new();
        let vars: Vec<ConditionVariable> = values
            .iter()
            .map(|&(id, value)| {
                // F(id) mirrors the wanted result
                state.set_function(id as u8, value);
                ConditionVariable::new(id).with_condition(Condition::function_on(id))
            })
            .collect();
        let mut cache = ConditionCache::new();
        cache.rebuild(&vars, &state);
        cache
    }

    // =========================================================================
    // Conditions
    // =========================================================================

    #[test]
    fn comparators() {
        assert!(Comparator::Equal.compare(3, 3));
        assert!(Comparator::NotEqual.compare(3, 4));
        assert!(Comparator::GreaterThan.compare(5, 4));
        assert!(!Comparator::GreaterThan.compare(4, 4));
        assert!(Comparator::LessThan.compare(3, 4));
        assert!(Comparator::GreaterOrEqual.compare(4, 4));
        assert!(Comparator::LessOrEqual.compare(4, 4));
        assert!(Comparator::BitAnd.compare(0b0110, 0b0010));
        assert!(!Comparator::BitAnd.compare(0b0100, 0b0010));
        assert!(Comparator::IsTrue.compare(1, 0));
        assert!(!Comparator::IsTrue.compare(0, 7));
    }

    #[test]
    fn codes() {
        assert_eq!(TriggerSource::from_code(1), Some(TriggerSource::FunctionKey));
        assert_eq!(TriggerSource::from_code(4), None);
        assert_eq!(TriggerSource::from_code(5), Some(TriggerSource::BinaryState));
        assert_eq!(Comparator::from_code(8), Some(Comparator::IsTrue));
        assert_eq!(Comparator::from_code(0), None);
        assert_eq!(MappingAction::from_code(3), Some(MappingAction::ToggleDimmed));
        assert_eq!(MappingAction::from_code(4), None);
    }

    #[test]
    fn condition_sources() {
        let mut state = DecoderState::new();
        state.set_function(2, true);
        state.set_speed(40);
        state.set_binary_state(500, true);

        assert!(Condition::function_on(2).evaluate(&state));
        assert!(!Condition::function_on(3).evaluate(&state));
        assert!(Condition::direction_is(Direction::Forward).evaluate(&state));
        assert!(!Condition::direction_is(Direction::Reverse).evaluate(&state));
        assert!(Condition::speed_above(39).evaluate(&state));
        assert!(!Condition::speed_above(40).evaluate(&state));
        assert!(Condition::binary_state_on(500).evaluate(&state));
        assert!(!Condition::binary_state_on(501).evaluate(&state));
    }

    #[test]
    fn variable_is_and_of_conditions() {
        let mut state = DecoderState::new();
        state.set_function(0, true);
        let var = ConditionVariable::new(1)
            .with_condition(Condition::function_on(0))
            .with_condition(Condition::direction_is(Direction::Reverse));
        assert!(!var.evaluate(&state));
        state.set_direction(Direction::Reverse);
        assert!(var.evaluate(&state));
        assert!(ConditionVariable::new(2).evaluate(&state));
    }

    #[test]
    fn variable_capacity() {
        let mut var = ConditionVariable::new(1);
        for n in 0..MAX_CONDITIONS as u16 {
            assert!(var.push(Condition::function_on(n)));
        }
        assert!(!var.push(Condition::function_on(9)));
    }

    // =========================================================================
    // Rules
    // =========================================================================

    #[test]
    fn empty_rule_is_true() {
        let cache = cache_with(&[]);
        assert!(MappingRule::new(0, MappingAction::Activate).evaluate(&cache));
    }

    #[test]
    fn empty_positive_with_true_negative_is_false() {
        let cache = cache_with(&[(1, true)]);
        let rule = MappingRule::new(0, MappingAction::Activate).with_negative(1);
        assert!(!rule.evaluate(&cache));
    }

    #[test]
    fn positive_ids_are_ored() {
        let cache = cache_with(&[(1, false), (2, true)]);
        let rule = MappingRule::new(0, MappingAction::Activate)
            .with_positive(1)
            .with_positive(2);
        assert!(rule.evaluate(&cache));

        let cache = cache_with(&[(1, false), (2, false)]);
        assert!(!rule.evaluate(&cache));
    }

    #[test]
    fn any_negative_blocks() {
        let cache = cache_with(&[(1, true), (2, false), (3, true)]);
        let rule = MappingRule::new(0, MappingAction::Activate)
            .with_positive(1)
            .with_negative(2)
            .with_negative(3);
        assert!(!rule.evaluate(&cache));
    }

    #[test]
    fn unknown_ids_read_false() {
        let cache = cache_with(&[(1, true)]);
        assert!(cache.get(1));
        assert!(!cache.get(42));
        let rule = MappingRule::new(0, MappingAction::Activate).with_positive(42);
        assert!(!rule.evaluate(&cache));
    }
}
