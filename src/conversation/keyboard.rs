//! Quick-reply keyboards keyed by `(role, status)`.

use super::command::{AdminCommand, RecipientCommand};
use super::role::Role;
use super::state::ConversationStatus;

/// The keyboards a user can be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardLayout {
    /// Explicitly no buttons (free-text capture).
    Empty,
    AdminDefault,
    /// Status view; offers review only while items are pending.
    AdminStatus,
    AdminApproval,
    AdminConfirmManual,
    RecipientDefault,
}

impl KeyboardLayout {
    /// Layout for one role in one status. Statuses without a dedicated layout
    /// fall back to the role's default.
    pub fn for_role(role: Role, status: ConversationStatus) -> Self {
        use ConversationStatus::*;
        match (role, status) {
            (Role::Admin, AdminStatusRequest) => Self::AdminStatus,
            (Role::Admin, AdminApproveMessage) => Self::AdminApproval,
            (Role::Admin, AdminManualMessage) => Self::Empty,
            (Role::Admin, AdminManualConfirm) => Self::AdminConfirmManual,
            (Role::Admin, Default) => Self::AdminDefault,
            (Role::Recipient, _) => Self::RecipientDefault,
        }
    }

    /// Whether rendering needs the pending-item count.
    pub fn needs_pending_count(&self) -> bool {
        matches!(self, Self::AdminStatus)
    }

    /// Button labels in display order.
    pub fn buttons(&self, pending_count: i64) -> Vec<String> {
        let commands: Vec<&'static str> = match self {
            Self::Empty => Vec::new(),
            Self::AdminDefault => vec![
                AdminCommand::SendFeel.label(),
                AdminCommand::Status.label(),
                AdminCommand::SendManual.label(),
            ],
            Self::AdminStatus => {
                let mut buttons = Vec::new();
                if pending_count > 0 {
                    buttons.push(AdminCommand::ApproveNew.label());
                }
                buttons.push(AdminCommand::Reset.label());
                buttons
            }
            Self::AdminApproval => vec![
                AdminCommand::Approve.label(),
                AdminCommand::Block.label(),
                AdminCommand::Reset.label(),
            ],
            Self::AdminConfirmManual => vec![
                AdminCommand::ConfirmManual.label(),
                AdminCommand::Reset.label(),
            ],
            Self::RecipientDefault => vec![RecipientCommand::RequestFeel.label()],
        };
        commands.into_iter().map(str::to_string).collect()
    }
}

/// Buttons offered to every user regardless of role or status.
pub fn base_keyboard() -> Vec<String> {
    Vec::new()
}
