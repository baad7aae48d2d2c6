//! In-memory adapters for webhooks and their batches.

mod batch;
mod registry;

pub use batch::InMemoryBatchRepository;
pub use registry::InMemoryWebhookRegistry;
