//! Trait definitions for hardware abstraction.
//!
//! This module defines the abstractions that allow the auxiliary engine to:
//! - Run on different hardware (decoder boards, desktop mocks)
//! - Read its configuration from any CV store implementation
//!
//! # Hardware Abstraction
//!
//! - [`OutputDriver`]: PWM, on/off and servo pin writes
//! - [`CvStore`]: configuration variable access
//!
//! Randomness (neon tube flicker, flicker start phase) comes through
//! [`rand::RngCore`] rather than a crate-local trait.

pub mod hardware;

pub use hardware::*;
