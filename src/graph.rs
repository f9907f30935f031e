//! The compiled rule graph and the condition evaluation engine.
//!
//! A [`RuleGraph`] owns every logical function, condition variable and
//! mapping rule of one configuration generation. Reloading the
//! configuration replaces the whole graph.
//!
//! # Evaluation pass
//!
//! [`RuleGraph::evaluate`] runs only when the decoder state is dirty:
//!
//! 1. Every condition variable is evaluated into the [`ConditionCache`].
//! 2. Every rule is evaluated against the cache.
//! 3. Functions targeted by at least one `Activate` rule, none of which
//!    holds, are released (switched off).
//! 4. True rules apply their action in declaration order; a later rule
//!    overrides an earlier one on the same function. `ToggleDimmed` only
//!    fires when its rule has just become true.
//!
//! Rules targeting a function index that does not exist are ignored.

extern crate alloc;
use alloc::vec::Vec;

use crate::effect::EffectContext;
use crate::function::LogicalFunction;
use crate::mapping::{ConditionCache, ConditionId, ConditionVariable, MappingAction, MappingRule};
use crate::output::OutputBank;
use crate::state::DecoderState;
use crate::traits::OutputDriver;

/// Pending on/off decision for one function within a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum Pending {
    #[default]
    Keep,
    Off,
    On,
}

/// Result of one rule in the current and the previous pass.
#[derive(Clone, Copy, Debug, Default)]
struct RuleState {
    now: bool,
    was: bool,
}

impl RuleState {
    fn rising(&self) -> bool {
        self.now && !self.was
    }
}

/// Functions, variables and rules of one configuration.
///
/// # Example
///
/// ```rust
/// use loco_aux::effect::Steady;
/// use loco_aux::function::LogicalFunction;
/// use loco_aux::graph::RuleGraph;
/// use loco_aux::mapping::{Condition, ConditionVariable, MappingAction, MappingRule};
/// use loco_aux::state::DecoderState;
///
/// let mut graph = RuleGraph::new();
/// let cab = graph.add_function(LogicalFunction::new(Steady::new(255)));
/// graph.add_variable(ConditionVariable::new(1).with_condition(Condition::function_on(2)));
/// graph.add_rule(MappingRule::new(cab, MappingAction::Activate).with_positive(1));
///
/// let mut state = DecoderState::new();
/// state.set_function(2, true);
/// graph.evaluate(&state);
/// assert!(graph.function(cab).unwrap().is_active());
///
/// state.set_function(2, false);
/// graph.evaluate(&state);
/// assert!(!graph.function(cab).unwrap().is_active());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RuleGraph {
    functions: Vec<LogicalFunction>,
    variables: Vec<ConditionVariable>,
    rules: Vec<MappingRule>,
    cache: ConditionCache,
    rule_states: Vec<RuleState>,
    /// Scratch space, one entry per function.
    pending: Vec<Pending>,
}

impl RuleGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a logical function; returns its index.
    pub fn add_function(&mut self, function: LogicalFunction) -> usize {
        self.functions.push(function);
        self.functions.len() - 1
    }

    /// Append a condition variable.
    pub fn add_variable(&mut self, variable: ConditionVariable) {
        debug_assert!(
            self.variables.iter().all(|v| v.id() != variable.id()),
            "duplicate condition variable id {}",
            variable.id()
        );
        self.variables.push(variable);
    }

    /// Append a mapping rule.
    pub fn add_rule(&mut self, rule: MappingRule) {
        self.rules.push(rule);
        self.rule_states.push(RuleState::default());
    }

    /// All logical functions, by index.
    pub fn functions(&self) -> &[LogicalFunction] {
        &self.functions
    }

    /// Logical function at `index`.
    pub fn function(&self, index: usize) -> Option<&LogicalFunction> {
        self.functions.get(index)
    }

    /// Mutable logical function at `index`.
    pub fn function_mut(&mut self, index: usize) -> Option<&mut LogicalFunction> {
        self.functions.get_mut(index)
    }

    /// All condition variables in declaration order.
    pub fn variables(&self) -> &[ConditionVariable] {
        &self.variables
    }

    /// Condition variable with id `id`.
    pub fn variable(&self, id: ConditionId) -> Option<&ConditionVariable> {
        self.variables.iter().find(|v| v.id() == id)
    }

    /// All mapping rules in declaration order.
    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    /// Number of logical functions.
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Number of condition variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Number of mapping rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the graph has nothing to drive.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.variables.is_empty() && self.rules.is_empty()
    }

    /// Result of variable `id` in the last pass; false for unknown ids.
    pub fn variable_state(&self, id: ConditionId) -> bool {
        self.cache.get(id)
    }

    /// Result of rule `index` in the last pass.
    pub fn rule_state(&self, index: usize) -> bool {
        self.rule_states.get(index).map_or(false, |s| s.now)
    }

    /// Run one evaluation pass against `state` and apply the results.
    ///
    /// Each function's final on/off decision is applied once per pass, so
    /// an effect never sees an intermediate state.
    pub fn evaluate(&mut self, state: &DecoderState) {
        self.cache.rebuild(&self.variables, state);

        self.pending.clear();
        self.pending.resize(self.functions.len(), Pending::Keep);

        // Release: off unless one of the function's activation rules holds.
        let mut fired = 0usize;
        for (rule, rule_state) in self.rules.iter().zip(self.rule_states.iter_mut()) {
            rule_state.was = rule_state.now;
            rule_state.now = rule.evaluate(&self.cache);
            if rule_state.now {
                fired += 1;
            }
            if rule.action != MappingAction::Activate {
                continue;
            }
            if let Some(slot) = self.pending.get_mut(rule.target) {
                if rule_state.now {
                    *slot = Pending::On;
                } else if *slot == Pending::Keep {
                    *slot = Pending::Off;
                }
            }
        }

        // True rules in declaration order; last write wins.
        for (rule, rule_state) in self.rules.iter().zip(&self.rule_states) {
            if !rule_state.now || rule.target >= self.functions.len() {
                continue;
            }
            match rule.action {
                MappingAction::Activate => self.pending[rule.target] = Pending::On,
                MappingAction::Deactivate => self.pending[rule.target] = Pending::Off,
                MappingAction::ToggleDimmed => {
                    if rule_state.rising() {
                        let function = &mut self.functions[rule.target];
                        let dimmed = function.is_dimmed();
                        function.set_dimmed(!dimmed);
                    }
                }
            }
        }

        for (function, pending) in self.functions.iter_mut().zip(&self.pending) {
            match pending {
                Pending::Keep => {}
                Pending::Off => function.set_active(false),
                Pending::On => function.set_active(true),
            }
        }

        log::trace!(
            "evaluated {} variables, {} of {} rules true",
            self.variables.len(),
            fired,
            self.rules.len()
        );
    }

    /// Update every logical function's effect.
    ///
    /// Writes are staged in one bank frame, so functions sharing an output
    /// combine to the brightest level instead of overwriting each other.
    pub fn update_functions<D: OutputDriver>(
        &mut self,
        delta_ms: u32,
        bank: &mut OutputBank<D>,
        ctx: &mut EffectContext<'_>,
    ) -> Result<(), D::Error> {
        bank.begin_frame();
        let updated = self
            .functions
            .iter_mut()
            .try_for_each(|function| function.update(delta_ms, bank, ctx));
        let flushed = bank.end_frame();
        updated.and(flushed)
    }
}
