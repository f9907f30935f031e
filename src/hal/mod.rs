//! Hardware Abstraction Layer implementations.
//!
//! Concrete implementations of the traits defined in [`crate::traits`].
//!
//! # Available Implementations
//!
//! - `mock`: Test doubles for desktop development
//! - `embedded`: Driver over `embedded-hal` PWM channels (requires `embedded` feature)

pub mod mock;

#[cfg(feature = "embedded")]
pub mod embedded;

pub use mock::*;
