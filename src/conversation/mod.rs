//! Conversation layer: roles, commands, per-user state and the parser that
//! ties them together.

pub mod command;
pub mod keyboard;
pub mod parser;
pub mod replies;
pub mod role;
pub mod source;
pub mod state;

pub use command::{AdminCommand, RecipientCommand};
pub use parser::{InboundText, MessageParser};
pub use role::{Identity, Role};
pub use source::TriggerSource;
pub use state::{ConversationState, ConversationStatus};
