//! Scoring task lifecycle and the worker that drives it.
//!
//! A task is created pending, driven by exactly one worker through
//! download and scoring, and ends finished with an immutable result or
//! failed with an error description. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
