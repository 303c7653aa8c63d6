//! Transport trait: the black-box "send one batch" operation.

use async_trait::async_trait;

use super::model::OutboundMessage;
use crate::error::ChannelError;

/// Sends one batch of messages to the messaging platform.
///
/// Callers must respect the platform's `BatchLimits`; an oversized batch is
/// the caller's bug. Implementations make a single bounded call and never
/// retry internally.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for logs.
    fn name(&self) -> &str;

    /// Send the batch in order.
    async fn send(&self, batch: &[OutboundMessage]) -> Result<(), ChannelError>;
}
