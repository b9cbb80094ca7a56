//! Step definitions for escrow settlement scenarios.

pub mod given;
pub mod then;
