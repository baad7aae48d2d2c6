//! Webhook-delivered offline conversions.
//!
//! Integrators register a webhook, post conversion batches to its callback
//! URL with the secret issued at registration, and poll batch status. Each
//! conversion is sent to the reporting API on its own and the batch
//! aggregate is recomputed after every outcome.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
