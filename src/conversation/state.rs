//! Conversation state machine: which handler owns a user's next message.

use serde::{Deserialize, Serialize};

/// Persisted per-user conversation status.
///
/// Stored as an integer code; the admin flows live in the 1xx range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// Idle; the message body is looked up as a command.
    #[default]
    Default,
    /// Admin just viewed the system status.
    AdminStatusRequest,
    /// Admin is reviewing a pending item (payload: item id).
    AdminApproveMessage,
    /// Admin's next free text is a manual message.
    AdminManualMessage,
    /// Admin must confirm the captured manual message (payload: text).
    AdminManualConfirm,
}

impl ConversationStatus {
    /// Integer code stored in the state table.
    pub fn code(&self) -> i64 {
        match self {
            Self::Default => 0,
            Self::AdminStatusRequest => 100,
            Self::AdminApproveMessage => 101,
            Self::AdminManualMessage => 110,
            Self::AdminManualConfirm => 111,
        }
    }

    /// Decode a stored code. Unknown codes yield `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Default),
            100 => Some(Self::AdminStatusRequest),
            101 => Some(Self::AdminApproveMessage),
            110 => Some(Self::AdminManualMessage),
            111 => Some(Self::AdminManualConfirm),
            _ => None,
        }
    }

    /// Whether this status captures free text instead of matching commands.
    pub fn captures_free_text(&self) -> bool {
        matches!(self, Self::AdminManualMessage)
    }
}

impl std::fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Default => "default",
            Self::AdminStatusRequest => "admin_status_request",
            Self::AdminApproveMessage => "admin_approve_message",
            Self::AdminManualMessage => "admin_manual_message",
            Self::AdminManualConfirm => "admin_manual_confirm",
        };
        write!(f, "{s}")
    }
}

/// A user's status plus the opaque payload its handler left behind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversationState {
    pub status: ConversationStatus,
    pub payload: serde_json::Value,
}

impl ConversationState {
    pub fn new(status: ConversationStatus, payload: serde_json::Value) -> Self {
        Self { status, payload }
    }

    /// A status with no payload.
    pub fn with_status(status: ConversationStatus) -> Self {
        Self::new(status, serde_json::Value::Null)
    }

    /// Payload as an item id, if it is one.
    pub fn payload_id(&self) -> Option<i64> {
        self.payload.as_i64()
    }

    /// Payload as text, if it is text.
    pub fn payload_text(&self) -> Option<&str> {
        self.payload.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ConversationStatus; 5] = [
        ConversationStatus::Default,
        ConversationStatus::AdminStatusRequest,
        ConversationStatus::AdminApproveMessage,
        ConversationStatus::AdminManualMessage,
        ConversationStatus::AdminManualConfirm,
    ];

    #[test]
    fn codes_are_stable() {
        let codes: Vec<i64> = ALL.iter().map(|s| s.code()).collect();
        assert_eq!(codes, [0, 100, 101, 110, 111]);
    }

    #[test]
    fn code_decodes_back() {
        for status in ALL {
            assert_eq!(ConversationStatus::from_code(status.code()), Some(status));
        }
    }

    #[test]
    fn unknown_code_rejected() {
        assert_eq!(ConversationStatus::from_code(500), None);
        assert_eq!(ConversationStatus::from_code(-1), None);
    }

    #[test]
    fn only_manual_message_captures_text() {
        let capturing: Vec<_> = ALL.into_iter().filter(|s| s.captures_free_text()).collect();
        assert_eq!(capturing, [ConversationStatus::AdminManualMessage]);
    }

    #[test]
    fn display_matches_serde() {
        for status in ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(format!("\"{status}\""), json, "Display and serde should match for {status:?}");
        }
    }

    #[test]
    fn default_state_is_idle() {
        let state = ConversationState::default();
        assert_eq!(state.status, ConversationStatus::Default);
        assert!(state.payload.is_null());
    }

    #[test]
    fn payload_accessors() {
        let review = ConversationState::new(ConversationStatus::AdminApproveMessage, serde_json::json!(42));
        assert_eq!(review.payload_id(), Some(42));
        assert_eq!(review.payload_text(), None);

        let confirm = ConversationState::new(
            ConversationStatus::AdminManualConfirm,
            serde_json::json!("thinking of you"),
        );
        assert_eq!(confirm.payload_text(), Some("thinking of you"));
        assert_eq!(confirm.payload_id(), None);
    }
}
