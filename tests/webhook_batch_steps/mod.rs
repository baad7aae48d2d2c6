//! Step definitions for webhook batch scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
