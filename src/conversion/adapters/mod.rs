//! Adapter implementations for conversion upload ports.

pub mod memory;
pub mod postgres;
