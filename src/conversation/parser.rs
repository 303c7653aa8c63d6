//! Message parser: turns one inbound text into replies, state changes and
//! queued broadcasts.
//!
//! Dispatch is a pure function of `(identity, state, body)` producing an
//! [`Action`]; the async handlers then talk to the stores and the queue.

use std::sync::Arc;

use axum::http::StatusCode;
use tracing::{debug, error, info, warn};

use super::command::{AdminCommand, RecipientCommand};
use super::keyboard::{KeyboardLayout, base_keyboard};
use super::replies;
use super::role::Identity;
use super::source::TriggerSource;
use super::state::{ConversationState, ConversationStatus};
use crate::error::DatabaseError;
use crate::outbound::MessageQueue;
use crate::store::{ContentItem, ContentStore, StateStore};

/// One inbound text message, already unwrapped from the platform envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundText {
    pub from: String,
    pub chat_id: Option<String>,
    pub body: String,
}

impl InboundText {
    pub fn new(from: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            chat_id: None,
            body: body.into(),
        }
    }

    pub fn with_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }
}

/// Which handler owns a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Admin(AdminCommand),
    Recipient(RecipientCommand),
    /// Free text captured as the body of a manual message.
    CaptureManualText,
    AdminUnknown,
    RecipientUnknown,
}

impl Action {
    /// Route a message from a recognized user.
    ///
    /// A command from the other role's table is answered with that other
    /// role's "unknown command" reply.
    pub fn route(identity: Identity, state: &ConversationState, body: &str) -> Self {
        if state.status.captures_free_text() {
            return Self::CaptureManualText;
        }

        if let Some(cmd) = AdminCommand::from_label(body) {
            return if identity.admin {
                Self::Admin(cmd)
            } else {
                Self::RecipientUnknown
            };
        }

        if let Some(cmd) = RecipientCommand::from_label(body) {
            return if identity.recipient {
                Self::Recipient(cmd)
            } else {
                Self::AdminUnknown
            };
        }

        if identity.admin {
            Self::AdminUnknown
        } else {
            Self::RecipientUnknown
        }
    }
}

/// Outcome of a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reply {
    /// Reply to the sender with this text and their current keyboard.
    Text(String),
    /// The handler queued its own messages; nothing more to send.
    Enqueued,
}

/// Formats a content item as the shared tail of both broadcast messages.
pub fn format_item(item: &ContentItem) -> String {
    format!(
        "\n\n{}\n\u{00A0}  \u{2015}{} ({})",
        item.body, item.author, item.submitted
    )
}

/// Conversation state machine for the admin and the recipient.
#[derive(Clone)]
pub struct MessageParser {
    admin_id: String,
    recipient_id: String,
    content: Arc<dyn ContentStore>,
    states: Arc<dyn StateStore>,
}

impl MessageParser {
    pub fn new(
        admin_id: impl Into<String>,
        recipient_id: impl Into<String>,
        content: Arc<dyn ContentStore>,
        states: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            admin_id: admin_id.into(),
            recipient_id: recipient_id.into(),
            content,
            states,
        }
    }

    fn identity(&self, user_id: &str) -> Identity {
        Identity::classify(user_id, &self.admin_id, &self.recipient_id)
    }

    /// Process one text message, queueing every reply it produces.
    ///
    /// Never fails: store errors are logged and reported as `500` with nothing
    /// queued for the message.
    pub async fn process_text_message(&self, msg: &InboundText, queue: &mut MessageQueue) -> StatusCode {
        let identity = self.identity(&msg.from);
        if identity.is_unrecognized() {
            debug!(from = %msg.from, "Message from unrecognized user");
            queue.enqueue(&msg.from, replies::INVALID_USER, msg.chat_id.clone(), base_keyboard());
            return StatusCode::OK;
        }

        // Messages are staged so a failing handler leaves the queue untouched.
        let mut staged = queue.staging();
        let result = self.handle(identity, msg, &mut staged).await;

        let result = match result {
            Ok(Reply::Text(body)) => match self.current_user_keyboard(&msg.from).await {
                Ok(keyboard) => {
                    staged.enqueue(&msg.from, body, msg.chat_id.clone(), keyboard);
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Ok(Reply::Enqueued) => Ok(()),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                queue.absorb(staged);
                StatusCode::OK
            }
            Err(e) => {
                error!(from = %msg.from, body = %msg.body, error = %e, "Failed to process message");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    async fn handle(
        &self,
        identity: Identity,
        msg: &InboundText,
        queue: &mut MessageQueue,
    ) -> Result<Reply, DatabaseError> {
        let state = self.states.get_state(&msg.from).await?;
        let action = Action::route(identity, &state, &msg.body);
        debug!(from = %msg.from, status = %state.status, ?action, "Dispatching message");

        match action {
            Action::CaptureManualText => {
                let captured = ConversationState::new(
                    ConversationStatus::AdminManualConfirm,
                    serde_json::Value::String(msg.body.clone()),
                );
                self.states.set_state(&msg.from, &captured).await?;
                Ok(Reply::Text(replies::ADMIN_CONFIRM_MANUAL.into()))
            }
            Action::AdminUnknown => {
                self.reset(&msg.from, replies::ADMIN_UNKNOWN_COMMAND).await
            }
            Action::RecipientUnknown => {
                self.reset(&msg.from, replies::RECIPIENT_UNKNOWN_COMMAND).await
            }
            Action::Recipient(RecipientCommand::Reset) => {
                self.reset(&msg.from, replies::RECIPIENT_RESET).await
            }
            Action::Recipient(RecipientCommand::RequestFeel) => {
                self.queue_feel(TriggerSource::Recipient, queue).await?;
                Ok(Reply::Enqueued)
            }
            Action::Admin(cmd) => self.handle_admin(cmd, &msg.from, &state, queue).await,
        }
    }

    async fn handle_admin(
        &self,
        cmd: AdminCommand,
        user: &str,
        state: &ConversationState,
        queue: &mut MessageQueue,
    ) -> Result<Reply, DatabaseError> {
        match cmd {
            AdminCommand::Reset => self.reset(user, replies::ADMIN_RESET).await,
            AdminCommand::SendFeel => {
                self.queue_feel(TriggerSource::Admin, queue).await?;
                Ok(Reply::Enqueued)
            }
            AdminCommand::SendManual => {
                self.set_status(user, ConversationStatus::AdminManualMessage).await?;
                Ok(Reply::Text(replies::ADMIN_SEND_MANUAL.into()))
            }
            AdminCommand::ConfirmManual => {
                let text = match (state.status, state.payload_text()) {
                    (ConversationStatus::AdminManualConfirm, Some(text)) => text.to_string(),
                    _ => return self.invalid_state(user, cmd).await,
                };
                let keyboard = self.current_user_keyboard(&self.recipient_id).await?;
                self.set_status(user, ConversationStatus::Default).await?;
                queue.enqueue(&self.recipient_id, text, None, keyboard);
                info!("Manual message queued for recipient");
                Ok(Reply::Text(replies::ADMIN_MANUAL_SENT.into()))
            }
            AdminCommand::Status => {
                let counts = self.content.counts().await?;
                self.set_status(user, ConversationStatus::AdminStatusRequest).await?;
                Ok(Reply::Text(replies::status_report(
                    counts.total,
                    counts.pending,
                    counts.blocked,
                )))
            }
            AdminCommand::ApproveNew => {
                let Some(item) = self.content.select_pending().await? else {
                    return self.invalid_state(user, cmd).await;
                };
                let review = ConversationState::new(
                    ConversationStatus::AdminApproveMessage,
                    serde_json::Value::from(item.id),
                );
                self.states.set_state(user, &review).await?;
                Ok(Reply::Text(format!(
                    "From: {}\nDate: {}\nComment:\n{}",
                    item.author, item.submitted, item.body
                )))
            }
            AdminCommand::Approve | AdminCommand::Block => {
                let id = match (state.status, state.payload_id()) {
                    (ConversationStatus::AdminApproveMessage, Some(id)) => id,
                    _ => return self.invalid_state(user, cmd).await,
                };
                let (changed, reply) = if cmd == AdminCommand::Approve {
                    (self.content.approve(id).await?, replies::ADMIN_APPROVED)
                } else {
                    (self.content.block(id).await?, replies::ADMIN_BLOCKED)
                };
                info!(feel_id = id, ?cmd, changed, "Moderation decision recorded");
                self.set_status(user, ConversationStatus::AdminStatusRequest).await?;
                Ok(Reply::Text(reply.into()))
            }
        }
    }

    async fn set_status(&self, user: &str, status: ConversationStatus) -> Result<(), DatabaseError> {
        self.states
            .set_state(user, &ConversationState::with_status(status))
            .await
    }

    async fn reset(&self, user: &str, reply: &str) -> Result<Reply, DatabaseError> {
        self.set_status(user, ConversationStatus::Default).await?;
        Ok(Reply::Text(reply.into()))
    }

    async fn invalid_state(&self, user: &str, cmd: AdminCommand) -> Result<Reply, DatabaseError> {
        warn!(user, ?cmd, "Command used outside its state, resetting");
        self.reset(user, replies::ADMIN_INVALID_STATE).await
    }

    /// Pick one approved item and queue it to both the admin and the
    /// recipient, worded for `source`.
    ///
    /// With nothing approved, only the admin is told. Returns the item sent.
    pub async fn queue_feel(
        &self,
        source: TriggerSource,
        queue: &mut MessageQueue,
    ) -> Result<Option<ContentItem>, DatabaseError> {
        // Keyboards are read before select_random commits the send.
        let admin_keyboard = self.current_user_keyboard(&self.admin_id).await?;
        let recipient_keyboard = self.current_user_keyboard(&self.recipient_id).await?;

        let Some(item) = self.content.select_random().await? else {
            warn!(%source, "No approved feels to send");
            queue.enqueue(&self.admin_id, replies::ADMIN_NO_CONTENT, None, admin_keyboard);
            return Ok(None);
        };

        let tail = format_item(&item);

        queue.enqueue(
            &self.admin_id,
            format!("{}{tail}", source.admin_prefix()),
            None,
            admin_keyboard,
        );
        queue.enqueue(
            &self.recipient_id,
            format!("{}{tail}", source.recipient_prefix()),
            None,
            recipient_keyboard,
        );

        info!(%source, feel_id = item.id, selector = item.selector, "Feel queued");
        Ok(Some(item))
    }

    /// Quick replies for `user` given their roles and current status.
    ///
    /// Unrecognized users get the base keyboard without a state read.
    pub async fn current_user_keyboard(&self, user: &str) -> Result<Vec<String>, DatabaseError> {
        let identity = self.identity(user);
        let mut keyboard = base_keyboard();
        if identity.is_unrecognized() {
            return Ok(keyboard);
        }

        let state = self.states.get_state(user).await?;
        for role in identity.roles() {
            let layout = KeyboardLayout::for_role(role, state.status);
            let pending = if layout.needs_pending_count() {
                self.content.count_pending().await?
            } else {
                0
            };
            keyboard.extend(layout.buttons(pending));
        }
        Ok(keyboard)
    }
}
