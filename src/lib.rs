//! # loco-aux
//!
//! Function output engine for model-railway locomotive decoders: turns
//! function keys, direction, speed and binary states into lights, servos
//! and smoke units, configured through NMRA/RCN configuration variables.
//!
//! ## Features
//!
//! - **Effects**: steady, dimmable, flicker, strobe, Mars light, soft
//!   start/stop, servo, smoke generator and neon tube, all driven by elapsed
//!   milliseconds
//! - **Rule engine**: condition variables and mapping rules with OR/AND-NOT
//!   semantics, re-evaluated only when decoder state changes
//! - **CV encodings**: RCN-225, the four RCN-227 variants and a proprietary
//!   effect/rule record layout
//! - **Hardware abstraction**: output driver and CV store traits, with mocks
//!   for desktop testing
//!
//! ## Architecture
//!
//! - `traits` - Hardware abstractions ([`OutputDriver`], [`CvStore`])
//! - `output` - Physical outputs and the output bank
//! - `effect` - Effect variants
//! - `function` - Logical functions (an effect bound to outputs)
//! - `mapping` / `state` / `graph` - Conditions, decoder state and rule evaluation
//! - `loader` / `cv` - CV layout compiler
//! - `controller` - [`AuxController`] that ties everything together
//! - `hal` - Concrete implementations (mock for testing, embedded-hal for hardware)
//!
//! ## Example
//!
//! ```rust
//! use loco_aux::{AuxController, Direction, OutputKind, PhysicalOutput};
//! use loco_aux::hal::{MockCvStore, MockDriver};
//!
//! let mut controller = AuxController::new(MockDriver::new());
//! controller.add_output(PhysicalOutput::new(26, OutputKind::PwmLowSide)).unwrap();
//! controller.add_output(PhysicalOutput::new(27, OutputKind::PwmLowSide)).unwrap();
//!
//! // RCN-227 per output V2: output 2 follows F1 in either direction
//! let mut store = MockCvStore::new().with_cv(96, 4);
//! store.set_block(257, &[0xFF; 8]);
//! store.set_block(265, &[1, 0xFF, 0xFF, 0xFF, 1, 0xFF, 0xFF, 0xFF]);
//! controller.load_from_cvs(&mut store);
//!
//! controller.set_function_state(1, true);
//! controller.update(20).unwrap();
//! assert_eq!(controller.driver().pwm(27), Some(255));
//!
//! controller.set_direction(Direction::Reverse);
//! controller.update(20).unwrap();
//! assert_eq!(controller.driver().pwm(27), Some(255));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Board configuration: output table, RNG seed, tick cadence.
pub mod config;
/// Auxiliary controller that owns outputs, rule graph and decoder state.
pub mod controller;
/// Configuration variable addresses and factory defaults.
pub mod cv;
/// Effect variants and their per-tick update.
pub mod effect;
/// Logical functions: one effect bound to its outputs.
pub mod function;
/// Rule graph and the condition evaluation engine.
pub mod graph;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// CV layout compiler for the supported mapping methods.
pub mod loader;
/// Conditions, condition variables and mapping rules.
pub mod mapping;
/// Physical outputs, output bank and effect output sinks.
pub mod output;
/// Decoder state pushed by the protocol decoder.
pub mod state;
/// Core traits for hardware abstraction.
pub mod traits;

// Re-exports for convenience
pub use config::{AuxConfig, OutputConfig};
pub use controller::{AuxController, LoadReport};
pub use effect::{Effect, EffectContext, EffectKind};
pub use function::LogicalFunction;
pub use graph::RuleGraph;
pub use loader::MappingMethod;
pub use mapping::{
    Comparator, Condition, ConditionId, ConditionVariable, MappingAction, MappingRule,
    TriggerSource,
};
pub use output::{BrightnessCurve, OutputBank, OutputKind, PhysicalOutput};
pub use state::DecoderState;
pub use traits::{CvStore, Direction, OutputDriver};
