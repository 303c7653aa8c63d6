//! Outbound side: message model, transport seam, and the batching queue.

pub mod model;
pub mod queue;
pub mod transport;

pub use model::{BatchLimits, FlushStatus, OutboundMessage};
pub use queue::MessageQueue;
pub use transport::Transport;
