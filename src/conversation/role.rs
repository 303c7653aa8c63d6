//! Sender roles, classified by exact match against the configured ids.

/// A role a configured user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Recipient,
}

/// The roles held by one user id. The same id may be configured for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Identity {
    pub admin: bool,
    pub recipient: bool,
}

impl Identity {
    /// Classify `user_id` against the configured admin and recipient ids.
    pub fn classify(user_id: &str, admin_id: &str, recipient_id: &str) -> Self {
        Self {
            admin: user_id == admin_id,
            recipient: user_id == recipient_id,
        }
    }

    /// Neither admin nor recipient.
    pub fn is_unrecognized(&self) -> bool {
        !self.admin && !self.recipient
    }

    /// Roles held, recipient first (the order keyboards are assembled in).
    pub fn roles(&self) -> impl Iterator<Item = Role> {
        let recipient = self.recipient.then_some(Role::Recipient);
        let admin = self.admin.then_some(Role::Admin);
        recipient.into_iter().chain(admin)
    }
}
