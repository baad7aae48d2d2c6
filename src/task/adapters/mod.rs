//! Adapter implementations for task lifecycle and scoring ports.

pub mod classifier;
pub mod memory;
pub mod postgres;
