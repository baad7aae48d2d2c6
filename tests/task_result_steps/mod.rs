//! Step definitions for task result scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
