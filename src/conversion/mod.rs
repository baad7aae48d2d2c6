//! Offline conversion uploads to the reporting API.
//!
//! Finished task results and single conversion events are rendered as CSV,
//! submitted, recorded as uploads, and reconciled by polling. The module
//! follows hexagonal architecture:
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
