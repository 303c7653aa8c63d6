//! Outbound message types and platform batch limits.

use serde::Serialize;

/// Default maximum messages per recipient in one batch.
pub const DEFAULT_MAX_PER_RECIPIENT: usize = 5;

/// Default maximum messages in one batch.
pub const DEFAULT_MAX_PER_BATCH: usize = 25;

/// A text message addressed to one recipient, with optional quick-reply buttons.
///
/// Immutable once built; the queue owns it until it is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    recipient_id: String,
    chat_id: Option<String>,
    body: String,
    keyboard: Vec<String>,
}

impl OutboundMessage {
    pub fn new(recipient_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            chat_id: None,
            body: body.into(),
            keyboard: Vec::new(),
        }
    }

    /// Attach the chat the message replies into.
    pub fn with_chat_id(mut self, chat_id: Option<String>) -> Self {
        self.chat_id = chat_id;
        self
    }

    /// Attach quick-reply button labels, in display order.
    pub fn with_keyboard(mut self, keyboard: Vec<String>) -> Self {
        self.keyboard = keyboard;
        self
    }

    pub fn recipient_id(&self) -> &str {
        &self.recipient_id
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn keyboard(&self) -> &[String] {
        &self.keyboard
    }
}

/// Platform-imposed batch limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Maximum messages to a single recipient within one batch.
    pub per_recipient: usize,
    /// Maximum messages within one batch.
    pub per_batch: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            per_recipient: DEFAULT_MAX_PER_RECIPIENT,
            per_batch: DEFAULT_MAX_PER_BATCH,
        }
    }
}

/// Outcome of draining the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStatus {
    /// Every batch was accepted by the transport.
    Ok,
    /// A batch was rejected; later batches were not attempted.
    PartialFailure,
}

impl FlushStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// HTTP status the route layer answers with.
    ///
    /// A partial failure maps to 202 so the platform does not resend the
    /// inbound event that was already processed.
    pub fn http_status(&self) -> axum::http::StatusCode {
        match self {
            Self::Ok => axum::http::StatusCode::OK,
            Self::PartialFailure => axum::http::StatusCode::ACCEPTED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let msg = OutboundMessage::new("alice", "hello")
            .with_chat_id(Some("chat-1".into()))
            .with_keyboard(vec!["Get more feels".into()]);

        assert_eq!(msg.recipient_id(), "alice");
        assert_eq!(msg.chat_id(), Some("chat-1"));
        assert_eq!(msg.body(), "hello");
        assert_eq!(msg.keyboard(), ["Get more feels".to_string()]);
    }

    #[test]
    fn default_limits_match_platform() {
        let limits = BatchLimits::default();
        assert_eq!(limits.per_recipient, 5);
        assert_eq!(limits.per_batch, 25);
    }

    #[test]
    fn flush_status_http_mapping() {
        assert_eq!(FlushStatus::Ok.http_status(), axum::http::StatusCode::OK);
        assert_eq!(
            FlushStatus::PartialFailure.http_status(),
            axum::http::StatusCode::ACCEPTED
        );
        assert!(FlushStatus::Ok.is_ok());
        assert!(!FlushStatus::PartialFailure.is_ok());
    }
}
