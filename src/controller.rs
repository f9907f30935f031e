//! Auxiliary controller that ties everything together.
//!
//! [`AuxController`] owns the output bank, the compiled rule graph, the
//! decoder state and the effect RNG. The protocol decoder pushes state
//! through the setters; the main loop calls [`update`](AuxController::update)
//! once per tick with the elapsed milliseconds.
//!
//! # Example
//!
//! ```rust
//! use loco_aux::{AuxController, AuxConfig, Direction};
//! use loco_aux::hal::{MockCvStore, MockDriver};
//! use loco_aux::cv;
//!
//! let mut controller = AuxController::from_config(MockDriver::new(), &AuxConfig::default_pinout()).unwrap();
//!
//! let mut store = MockCvStore::new();
//! cv::write_factory_defaults(&mut store);
//! let report = controller.load_from_cvs(&mut store);
//! assert_eq!(report.logical_functions, 2);
//!
//! // Main loop: F0 on, driving in reverse
//! controller.set_function_state(0, true);
//! controller.set_direction(Direction::Reverse);
//! for _ in 0..5 {
//!     controller.update(20).unwrap();
//! }
//!
//! assert_eq!(controller.driver().pwm(26), Some(0));
//! assert_eq!(controller.driver().pwm(27), Some(255));
//! ```

use core::fmt;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{AuxConfig, DEFAULT_RNG_SEED};
use crate::effect::EffectContext;
use crate::function::LogicalFunction;
use crate::graph::RuleGraph;
use crate::loader::{self, MappingMethod};
use crate::mapping::{ConditionId, ConditionVariable, MappingRule};
use crate::output::{OutputBank, PhysicalOutput};
use crate::state::DecoderState;
use crate::traits::{CvStore, Direction, OutputDriver};

/// Summary of one [`AuxController::load_from_cvs`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadReport {
    /// Decoded mapping method; `None` for an unknown selector.
    pub method: Option<MappingMethod>,
    /// Raw CV 96 value.
    pub selector: u8,
    /// Logical functions compiled.
    pub logical_functions: usize,
    /// Condition variables compiled.
    pub condition_variables: usize,
    /// Mapping rules compiled.
    pub mapping_rules: usize,
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.method {
            Some(method) => write!(f, "{}", method.as_str())?,
            None => write!(f, "unknown method {}", self.selector)?,
        }
        write!(
            f,
            ": {} functions, {} variables, {} rules",
            self.logical_functions, self.condition_variables, self.mapping_rules
        )
    }
}

/// Function output controller.
///
/// # Type Parameters
///
/// - `D`: the actuator driver ([`OutputDriver`])
/// - `R`: randomness for flicker phases and neon excursions
///
/// Not thread-safe; setters and [`update`](Self::update) are meant to be
/// called from the main loop only. [`load_from_cvs`](Self::load_from_cvs)
/// must not run in the middle of a tick.
pub struct AuxController<D: OutputDriver, R: RngCore = ChaCha8Rng> {
    outputs: OutputBank<D>,
    graph: RuleGraph,
    state: DecoderState,
    rng: R,
    method: Option<MappingMethod>,
    /// Set by a reload; the next tick drives every output off first.
    outputs_stale: bool,
}

impl<D: OutputDriver> AuxController<D> {
    /// Create a controller with no outputs and a default-seeded RNG.
    pub fn new(driver: D) -> Self {
        Self::with_rng(driver, ChaCha8Rng::seed_from_u64(DEFAULT_RNG_SEED))
    }

    /// Create a controller and register every output of `config`.
    pub fn from_config(driver: D, config: &AuxConfig) -> Result<Self, D::Error> {
        let mut controller = Self::with_rng(driver, ChaCha8Rng::seed_from_u64(config.rng_seed));
        for output in &config.outputs {
            controller.add_output(output.to_output())?;
        }
        Ok(controller)
    }
}

impl<D: OutputDriver, R: RngCore> AuxController<D, R> {
    /// Create a controller with an explicit RNG.
    pub fn with_rng(driver: D, rng: R) -> Self {
        Self {
            outputs: OutputBank::new(driver),
            graph: RuleGraph::new(),
            state: DecoderState::new(),
            rng,
            method: None,
            outputs_stale: false,
        }
    }

    /// Register a physical output and drive it to its off level.
    ///
    /// Returns the 1-based output id used by the CV encodings, or `None`
    /// if the output table is full.
    pub fn add_output(&mut self, output: PhysicalOutput) -> Result<Option<u8>, D::Error> {
        Ok(self.outputs.add(output)?.map(|index| index + 1))
    }

    /// Advance by `delta_ms`: re-evaluate rules if the decoder state
    /// changed, then update every logical function.
    ///
    /// The first tick after [`load_from_cvs`](Self::load_from_cvs) drives
    /// every output to its off level before the new functions write.
    pub fn update(&mut self, delta_ms: u32) -> Result<(), D::Error> {
        if self.outputs_stale {
            self.outputs.all_off()?;
            self.outputs_stale = false;
        }
        if self.state.is_dirty() {
            self.graph.evaluate(&self.state);
            self.state.clear_dirty();
        }
        let mut ctx = EffectContext::new(self.state.speed(), &mut self.rng);
        self.graph.update_functions(delta_ms, &mut self.outputs, &mut ctx)
    }

    /// Replace the rule graph with the one encoded in `store`.
    ///
    /// Drops every logical function, variable and rule, resets the decoder
    /// state to its defaults and compiles the encoding selected by CV 96.
    /// Outputs the old functions left on are switched off on the next
    /// [`update`](Self::update), so an empty graph leaves everything dark.
    pub fn load_from_cvs<S: CvStore + ?Sized>(&mut self, store: &mut S) -> LoadReport {
        self.graph = RuleGraph::new();
        self.state.reset();
        self.state.mark_dirty();
        self.outputs_stale = true;

        let compiled = loader::compile(store, &self.outputs, &mut self.rng);
        self.graph = compiled.graph;
        self.method = compiled.method;

        let report = LoadReport {
            method: compiled.method,
            selector: compiled.selector,
            logical_functions: self.graph.function_count(),
            condition_variables: self.graph.variable_count(),
            mapping_rules: self.graph.rule_count(),
        };
        log::info!("function mapping loaded, {report}");
        report
    }

    // ------------------------------------------------------------------
    // Decoder state
    // ------------------------------------------------------------------

    /// Set function key `number` (F0..F68).
    pub fn set_function_state(&mut self, number: u8, on: bool) {
        self.state.set_function(number, on);
    }

    /// Set the direction of travel.
    pub fn set_direction(&mut self, direction: Direction) {
        self.state.set_direction(direction);
    }

    /// Set the decoder speed step.
    pub fn set_speed(&mut self, speed: u16) {
        self.state.set_speed(speed);
    }

    /// Set binary state `number`.
    pub fn set_binary_state(&mut self, number: u16, on: bool) {
        self.state.set_binary_state(number, on);
    }

    /// State of function key `number`.
    pub fn function_state(&self, number: u16) -> bool {
        self.state.function(number)
    }

    /// Current direction.
    pub fn direction(&self) -> Direction {
        self.state.direction()
    }

    /// Current speed step.
    pub fn speed(&self) -> u16 {
        self.state.speed()
    }

    /// State of binary state `number`.
    pub fn binary_state(&self, number: u16) -> bool {
        self.state.binary_state(number)
    }

    /// Whether the next [`update`](Self::update) re-evaluates the rules.
    pub fn is_dirty(&self) -> bool {
        self.state.is_dirty()
    }

    /// The decoder state.
    pub fn state(&self) -> &DecoderState {
        &self.state
    }

    // ------------------------------------------------------------------
    // Rule graph
    // ------------------------------------------------------------------

    /// Add a logical function by hand; returns its index.
    pub fn add_logical_function(&mut self, function: LogicalFunction) -> usize {
        self.state.mark_dirty();
        self.graph.add_function(function)
    }

    /// Add a condition variable by hand.
    pub fn add_condition_variable(&mut self, variable: ConditionVariable) {
        self.state.mark_dirty();
        self.graph.add_variable(variable);
    }

    /// Add a mapping rule by hand.
    pub fn add_mapping_rule(&mut self, rule: MappingRule) {
        self.state.mark_dirty();
        self.graph.add_rule(rule);
    }

    /// Cached result of condition variable `id` from the last evaluation.
    pub fn condition_variable_state(&self, id: ConditionId) -> bool {
        self.graph.variable_state(id)
    }

    /// Logical function at `index`.
    pub fn logical_function(&self, index: usize) -> Option<&LogicalFunction> {
        self.graph.function(index)
    }

    /// Number of logical functions.
    pub fn logical_function_count(&self) -> usize {
        self.graph.function_count()
    }

    /// Number of condition variables.
    pub fn condition_variable_count(&self) -> usize {
        self.graph.variable_count()
    }

    /// Number of mapping rules.
    pub fn mapping_rule_count(&self) -> usize {
        self.graph.rule_count()
    }

    /// The compiled rule graph.
    pub fn graph(&self) -> &RuleGraph {
        &self.graph
    }

    /// Method of the last successful load.
    pub fn mapping_method(&self) -> Option<MappingMethod> {
        self.method
    }

    // ------------------------------------------------------------------
    // Hardware
    // ------------------------------------------------------------------

    /// The output bank.
    pub fn outputs(&self) -> &OutputBank<D> {
        &self.outputs
    }

    /// The actuator driver.
    pub fn driver(&self) -> &D {
        self.outputs.driver()
    }

    /// Mutable access to the actuator driver.
    pub fn driver_mut(&mut self) -> &mut D {
        self.outputs.driver_mut()
    }
}
