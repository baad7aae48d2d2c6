//! Adapter implementations for webhook ports.

pub mod memory;
pub mod postgres;
