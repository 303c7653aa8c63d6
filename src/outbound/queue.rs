//! Message queue: per-recipient outbound buffer flushed in rate-limited batches.
//!
//! One queue lives for one processing cycle (a single inbound request). Messages
//! are appended per recipient in order; `flush` drains everything in batches
//! that never exceed the platform's per-recipient and per-batch limits.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::model::{BatchLimits, FlushStatus, OutboundMessage};
use super::transport::Transport;
use crate::error::ChannelError;

/// Body of the admin notice sent when a batch is rejected.
pub const SEND_FAILURE_NOTICE: &str =
    "Error encountered during message send. See server logs for details.";

/// Messages waiting for one recipient, in enqueue order.
#[derive(Debug)]
struct RecipientMessages {
    recipient_id: String,
    messages: Vec<OutboundMessage>,
}

/// Outbound message buffer for a single processing cycle.
///
/// Not meant for concurrent producers: the owner holds it mutably.
pub struct MessageQueue {
    transport: Arc<dyn Transport>,
    admin_id: String,
    limits: BatchLimits,
    /// Recipients in order of their first enqueue.
    pending: Vec<RecipientMessages>,
}

impl MessageQueue {
    /// Create an empty queue. `admin_id` receives failure notices.
    pub fn new(transport: Arc<dyn Transport>, admin_id: impl Into<String>, limits: BatchLimits) -> Self {
        Self {
            transport,
            admin_id: admin_id.into(),
            limits,
            pending: Vec::new(),
        }
    }

    /// Build and append a message for `recipient_id`. Limits apply at flush time.
    pub fn enqueue(
        &mut self,
        recipient_id: &str,
        body: impl Into<String>,
        chat_id: Option<String>,
        keyboard: Vec<String>,
    ) {
        let message = OutboundMessage::new(recipient_id, body)
            .with_chat_id(chat_id)
            .with_keyboard(keyboard);
        self.push(message);
    }

    /// Append an already-built message.
    pub fn push(&mut self, message: OutboundMessage) {
        debug!(recipient = %message.recipient_id(), "Message queued");
        match self
            .pending
            .iter_mut()
            .find(|entry| entry.recipient_id == message.recipient_id())
        {
            Some(entry) => entry.messages.push(message),
            None => self.pending.push(RecipientMessages {
                recipient_id: message.recipient_id().to_string(),
                messages: vec![message],
            }),
        }
    }

    /// An empty queue sharing this queue's transport, admin and limits.
    ///
    /// Used to stage messages that must all land or not at all.
    pub fn staging(&self) -> Self {
        Self::new(self.transport.clone(), self.admin_id.clone(), self.limits)
    }

    /// Move every message of `other` to the back of this queue, in order.
    pub fn absorb(&mut self, other: MessageQueue) {
        for entry in other.pending {
            for message in entry.messages {
                self.push(message);
            }
        }
    }

    /// The admin user notified on failures.
    pub fn admin_id(&self) -> &str {
        &self.admin_id
    }

    /// Total number of queued messages.
    pub fn len(&self) -> usize {
        self.pending.iter().map(|e| e.messages.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drain the queue to the transport.
    ///
    /// Stops at the first rejected batch: the failure is logged with full
    /// context, the admin gets one best-effort notice, and the remaining
    /// messages are dropped. Nothing is retried.
    pub async fn flush(&mut self) -> FlushStatus {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return FlushStatus::Ok;
        }

        let total: usize = pending.iter().map(|e| e.messages.len()).sum();
        let mut consumed = vec![0usize; pending.len()];
        let mut batches = 0usize;

        while let Some(batch) = next_batch(&pending, &mut consumed, self.limits) {
            batches += 1;
            debug!(
                batch = batches,
                size = batch.len(),
                transport = self.transport.name(),
                "Sending batch"
            );

            if let Err(e) = self.transport.send(&batch).await {
                self.handle_send_failure(&e, &pending, &consumed, &batch).await;
                return FlushStatus::PartialFailure;
            }
        }

        info!(messages = total, batches, "Message queue flushed");
        FlushStatus::Ok
    }

    /// Log the failed batch in context, then try once to tell the admin.
    async fn handle_send_failure(
        &self,
        err: &ChannelError,
        pending: &[RecipientMessages],
        consumed: &[usize],
        batch: &[OutboundMessage],
    ) {
        let counts: Vec<String> = pending
            .iter()
            .zip(consumed)
            .map(|(entry, n)| format!("{}={}/{}", entry.recipient_id, n, entry.messages.len()))
            .collect();
        let remaining: usize = pending
            .iter()
            .zip(consumed)
            .map(|(entry, n)| entry.messages.len() - n)
            .sum();

        error!(
            error = %err,
            batch_size = batch.len(),
            consumed = %counts.join(", "),
            remaining,
            batch = ?batch,
            "Transport rejected message batch"
        );

        let notice = OutboundMessage::new(self.admin_id.as_str(), SEND_FAILURE_NOTICE);
        match self.transport.send(std::slice::from_ref(&notice)).await {
            Ok(()) => info!(admin = %self.admin_id, "Admin notified of send failure"),
            Err(e) => warn!(error = %e, "Admin notification failed"),
        }
    }
}

/// Assemble the next batch, advancing `consumed` per recipient.
///
/// Recipients are scanned in stable order; each contributes at most
/// `per_recipient` of its next messages while the batch stays within
/// `per_batch`. Returns `None` once every recipient is exhausted.
fn next_batch(
    pending: &[RecipientMessages],
    consumed: &mut [usize],
    limits: BatchLimits,
) -> Option<Vec<OutboundMessage>> {
    let mut batch = Vec::with_capacity(limits.per_batch);

    for (entry, cursor) in pending.iter().zip(consumed.iter_mut()) {
        if batch.len() >= limits.per_batch {
            break;
        }
        let room = limits.per_recipient.min(limits.per_batch - batch.len());
        let end = (*cursor + room).min(entry.messages.len());
        batch.extend_from_slice(&entry.messages[*cursor..end]);
        *cursor = end;
    }

    (!batch.is_empty()).then_some(batch)
}
