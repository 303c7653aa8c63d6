//! Command tables: every button label a user can send, per role.

/// Commands only an admin may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    ApproveNew,
    Approve,
    Block,
    ConfirmManual,
    Reset,
    SendFeel,
    SendManual,
    Status,
}

impl AdminCommand {
    pub const ALL: [AdminCommand; 8] = [
        Self::ApproveNew,
        Self::Approve,
        Self::Block,
        Self::ConfirmManual,
        Self::Reset,
        Self::SendFeel,
        Self::SendManual,
        Self::Status,
    ];

    /// Button label, which is also the exact text that triggers the command.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ApproveNew => "Approve new feels",
            Self::Approve => "Approve feel",
            Self::Block => "Block feel",
            Self::ConfirmManual => "Confirm manual message",
            Self::Reset => "Return to Admin Menu",
            Self::SendFeel => "Send feels",
            Self::SendManual => "Send manual message",
            Self::Status => "System status",
        }
    }

    /// Exact-match lookup of a message body.
    pub fn from_label(body: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == body)
    }
}

/// Commands only the recipient may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientCommand {
    RequestFeel,
    Reset,
}

impl RecipientCommand {
    /// Button label shown on keyboards.
    pub fn label(&self) -> &'static str {
        match self {
            Self::RequestFeel => "Get more feels",
            Self::Reset => "Return to Main Menu",
        }
    }

    /// Exact-match lookup of a message body. "Cancel" is an alias of reset.
    pub fn from_label(body: &str) -> Option<Self> {
        match body {
            "Get more feels" => Some(Self::RequestFeel),
            "Return to Main Menu" | "Cancel" => Some(Self::Reset),
            _ => None,
        }
    }
}
