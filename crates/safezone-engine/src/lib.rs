//! Game-side types for the safe-zone grid world.
//!
//! The learning crates only depend on the [`Environment`] contract and the
//! value types in [`core`]. [`GridWorld`] is a reference implementation used
//! for training and tests.

pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;
