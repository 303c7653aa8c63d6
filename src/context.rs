//! Application context: everything a request handler needs, built once at
//! start-up and shared by reference.

use std::sync::Arc;

use crate::channels::PlatformTransport;
use crate::config::RelayConfig;
use crate::conversation::MessageParser;
use crate::error::Result;
use crate::outbound::{MessageQueue, Transport};
use crate::store::{ContentStore, LibSqlBackend, StateStore};

/// Process-wide dependencies. Cheap to clone.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<RelayConfig>,
    pub content: Arc<dyn ContentStore>,
    pub transport: Arc<dyn Transport>,
    parser: MessageParser,
}

impl AppContext {
    pub fn new(
        config: RelayConfig,
        content: Arc<dyn ContentStore>,
        states: Arc<dyn StateStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let parser = MessageParser::new(
            config.admin_id.clone(),
            config.recipient_id.clone(),
            content.clone(),
            states,
        );
        Self {
            config: Arc::new(config),
            content,
            transport,
            parser,
        }
    }

    /// Open the database and the platform transport described by `config`,
    /// registering the webhook when one is configured.
    pub async fn connect(config: RelayConfig) -> Result<Self> {
        let db = Arc::new(LibSqlBackend::new_local(&config.db_path).await?);
        let transport = Arc::new(PlatformTransport::new(
            config.api_url.clone(),
            config.bot_username.clone(),
            config.bot_api_key.clone(),
        ));
        if let Some(url) = config.webhook_url.as_deref() {
            transport.configure_webhook(url).await?;
        }
        Ok(Self::new(config, db.clone(), db, transport))
    }

    /// A fresh queue for one processing cycle.
    pub fn new_queue(&self) -> MessageQueue {
        MessageQueue::new(
            self.transport.clone(),
            self.config.admin_id.clone(),
            self.config.limits,
        )
    }

    pub fn parser(&self) -> &MessageParser {
        &self.parser
    }
}
