//! Configuration compiler: CV bytes to [`RuleGraph`].
//!
//! CV 96 selects one of six encodings. Each sub-module reads its region of
//! the CV space and emits logical functions, condition variables and
//! mapping rules through a [`GraphBuilder`].
//!
//! | CV 96 | Encoding | Module |
//! |-------|----------|--------|
//! | 0 | Proprietary effect/variable/rule records | [`proprietary`] |
//! | 1 | RCN-225 output location bitmasks | [`rcn225`] |
//! | 2 | RCN-227 per function | [`rcn227`] |
//! | 3 | RCN-227 per output, V1 | [`rcn227`] |
//! | 4 | RCN-227 per output, V2 | [`rcn227`] |
//! | 5 | RCN-227 per output, V3 | [`rcn227`] |
//!
//! Compilation never fails. Unknown selectors produce an empty graph,
//! malformed records are skipped and output ids missing from the output
//! table skip that output.

pub mod proprietary;
pub mod rcn225;
pub mod rcn227;

extern crate alloc;
use alloc::collections::BTreeMap;

use rand::RngCore;

use crate::effect::{Effect, Steady};
use crate::function::LogicalFunction;
use crate::graph::RuleGraph;
use crate::mapping::{Condition, ConditionId, ConditionVariable, MappingRule};
use crate::output::{OutputIndex, OutputTable};
use crate::traits::{CvStore, Direction};
use crate::cv;

/// Encoding selected by CV 96.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MappingMethod {
    /// Effect, variable and rule records (CV 200/500/700).
    Proprietary,
    /// RCN-225 function output mapping (CV 33..=46).
    Rcn225,
    /// RCN-227 mapping per function (indexed page 40).
    Rcn227PerFunction,
    /// RCN-227 mapping per output, 32-bit function masks (page 41).
    Rcn227PerOutputV1,
    /// RCN-227 mapping per output, function numbers (page 42).
    Rcn227PerOutputV2,
    /// RCN-227 mapping per output, packed entries (page 43).
    Rcn227PerOutputV3,
}

impl MappingMethod {
    /// Decode the CV 96 value.
    pub const fn from_cv(value: u8) -> Option<Self> {
        Some(match value {
            0 => MappingMethod::Proprietary,
            1 => MappingMethod::Rcn225,
            2 => MappingMethod::Rcn227PerFunction,
            3 => MappingMethod::Rcn227PerOutputV1,
            4 => MappingMethod::Rcn227PerOutputV2,
            5 => MappingMethod::Rcn227PerOutputV3,
            _ => return None,
        })
    }

    /// The CV 96 value.
    pub const fn as_cv(&self) -> u8 {
        match self {
            MappingMethod::Proprietary => 0,
            MappingMethod::Rcn225 => 1,
            MappingMethod::Rcn227PerFunction => 2,
            MappingMethod::Rcn227PerOutputV1 => 3,
            MappingMethod::Rcn227PerOutputV2 => 4,
            MappingMethod::Rcn227PerOutputV3 => 5,
        }
    }

    /// Short human-readable name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MappingMethod::Proprietary => "proprietary",
            MappingMethod::Rcn225 => "rcn-225",
            MappingMethod::Rcn227PerFunction => "rcn-227 per function",
            MappingMethod::Rcn227PerOutputV1 => "rcn-227 per output v1",
            MappingMethod::Rcn227PerOutputV2 => "rcn-227 per output v2",
            MappingMethod::Rcn227PerOutputV3 => "rcn-227 per output v3",
        }
    }
}

/// Result of [`compile`].
#[derive(Debug)]
pub struct Compiled {
    /// Raw CV 96 value.
    pub selector: u8,
    /// Decoded method; `None` for unknown selectors.
    pub method: Option<MappingMethod>,
    /// The compiled graph (empty for unknown selectors).
    pub graph: RuleGraph,
}

/// Read CV 96 and compile the selected encoding.
///
/// `rng` seeds effects that start at a random phase.
///
/// # Example
///
/// ```rust
/// use loco_aux::loader::{self, MappingMethod};
/// use loco_aux::hal::{FixedRng, MockCvStore, MockDriver};
/// use loco_aux::output::{OutputBank, OutputKind, PhysicalOutput};
///
/// let mut bank = OutputBank::new(MockDriver::new());
/// bank.add(PhysicalOutput::new(1, OutputKind::PwmLowSide)).unwrap();
/// bank.add(PhysicalOutput::new(2, OutputKind::PwmLowSide)).unwrap();
///
/// // RCN-225: F0 forward -> output 1, F0 reverse -> output 2
/// let mut store = MockCvStore::new().with_cvs(&[(96, 1), (33, 0b01), (34, 0b10)]);
/// let compiled = loader::compile(&mut store, &bank, &mut FixedRng::new(0));
///
/// assert_eq!(compiled.method, Some(MappingMethod::Rcn225));
/// assert_eq!(compiled.graph.function_count(), 2);
/// assert_eq!(compiled.graph.rule_count(), 2);
/// ```
pub fn compile<S, T>(store: &mut S, outputs: &T, rng: &mut dyn RngCore) -> Compiled
where
    S: CvStore + ?Sized,
    T: OutputTable + ?Sized,
{
    let selector = store.read_cv(cv::MAPPING_METHOD);
    let method = MappingMethod::from_cv(selector);
    let mut builder = GraphBuilder::new(outputs, rng);

    match method {
        Some(MappingMethod::Proprietary) => proprietary::load(store, &mut builder),
        Some(MappingMethod::Rcn225) => rcn225::load(store, &mut builder),
        Some(MappingMethod::Rcn227PerFunction) => rcn227::load_per_function(store, &mut builder),
        Some(MappingMethod::Rcn227PerOutputV1) => rcn227::load_per_output_v1(store, &mut builder),
        Some(MappingMethod::Rcn227PerOutputV2) => rcn227::load_per_output_v2(store, &mut builder),
        Some(MappingMethod::Rcn227PerOutputV3) => rcn227::load_per_output_v3(store, &mut builder),
        None => log::warn!("unknown function mapping method {selector}, outputs stay off"),
    }

    let graph = builder.finish();
    log::debug!(
        "compiled {}: {} functions, {} variables, {} rules",
        method.map_or("nothing", |m| m.as_str()),
        graph.function_count(),
        graph.variable_count(),
        graph.rule_count()
    );

    Compiled {
        selector,
        method,
        graph,
    }
}

/// Incremental graph construction shared by the encodings.
///
/// Hands out condition variable ids from a single counter so ids are
/// unique within a graph, and creates each blocking variable (function
/// key `n` on, any direction) only once.
pub struct GraphBuilder<'a, T: ?Sized> {
    graph: RuleGraph,
    outputs: &'a T,
    rng: &'a mut dyn RngCore,
    next_id: ConditionId,
    blocking: BTreeMap<u16, ConditionId>,
}

impl<'a, T: OutputTable + ?Sized> GraphBuilder<'a, T> {
    /// Creates a builder over an output table.
    pub fn new(outputs: &'a T, rng: &'a mut dyn RngCore) -> Self {
        Self {
            graph: RuleGraph::new(),
            outputs,
            rng,
            next_id: 1,
            blocking: BTreeMap::new(),
        }
    }

    /// Resolve a 1-based output id.
    pub fn output(&self, id: u8) -> Option<OutputIndex> {
        self.outputs.lookup(id)
    }

    /// Randomness for effects built during compilation.
    pub fn rng(&mut self) -> &mut dyn RngCore {
        &mut *self.rng
    }

    /// Add a variable with an explicit id (records that carry their own ids).
    pub fn add_variable_with_id(&mut self, variable: ConditionVariable) -> ConditionId {
        let id = variable.id();
        self.next_id = self.next_id.max(id.saturating_add(1));
        self.graph.add_variable(variable);
        id
    }

    /// Add a variable with a freshly allocated id.
    pub fn add_variable<I>(&mut self, conditions: I) -> ConditionId
    where
        I: IntoIterator<Item = Condition>,
    {
        let id = self.next_id;
        self.next_id += 1;
        let mut variable = ConditionVariable::new(id);
        for condition in conditions {
            variable.push(condition);
        }
        self.graph.add_variable(variable);
        id
    }

    /// Variable "function key `number` on", optionally restricted to a
    /// direction.
    pub fn function_key(&mut self, number: u16, direction: Option<Direction>) -> ConditionId {
        let key = Condition::function_on(number);
        match direction {
            Some(direction) => self.add_variable([key, Condition::direction_is(direction)]),
            None => self.add_variable([key]),
        }
    }

    /// Shared blocking variable "function key `number` on".
    pub fn blocking_key(&mut self, number: u16) -> ConditionId {
        if let Some(&id) = self.blocking.get(&number) {
            return id;
        }
        let id = self.function_key(number, None);
        self.blocking.insert(number, id);
        id
    }

    /// Add a logical function; returns its index.
    pub fn add_function(&mut self, function: LogicalFunction) -> usize {
        self.graph.add_function(function)
    }

    /// Add a full-brightness steady function on one output.
    pub fn add_steady(&mut self, output: OutputIndex) -> usize {
        self.add_function(LogicalFunction::new(Steady::new(u8::MAX)).with_output(output))
    }

    /// Add a function with `effect` on one output.
    pub fn add_effect(&mut self, effect: impl Into<Effect>, output: OutputIndex) -> usize {
        self.add_function(LogicalFunction::new(effect).with_output(output))
    }

    /// Add a rule.
    pub fn add_rule(&mut self, rule: MappingRule) {
        self.graph.add_rule(rule);
    }

    /// Read-only view of the graph so far.
    pub fn graph(&self) -> &RuleGraph {
        &self.graph
    }

    /// Hand over the finished graph.
    pub fn finish(self) -> RuleGraph {
        self.graph
    }
}

/// Select an RCN-227 page through the indexed-CV pair.
pub(crate) fn select_page<S: CvStore + ?Sized>(store: &mut S, page: u8) {
    store.write_cv(cv::INDEXED_HIGH, 0);
    store.write_cv(cv::INDEXED_LOW, page);
}
