//! Messaging platform channel: batched outbound sends over HTTP plus the
//! inbound webhook payload.
//!
//! Outbound batches go to `POST {api_url}/message` as one JSON document,
//! authenticated with the bot's username and API key.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::conversation::InboundText;
use crate::error::ChannelError;
use crate::outbound::{OutboundMessage, Transport};

const CHANNEL_NAME: &str = "platform";

/// HTTP transport to the messaging platform's bot API.
pub struct PlatformTransport {
    api_url: String,
    bot_username: String,
    api_key: SecretString,
    client: reqwest::Client,
}

impl PlatformTransport {
    pub fn new(api_url: impl Into<String>, bot_username: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            bot_username: bot_username.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.api_url)
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), ChannelError> {
        let resp = self
            .client
            .post(self.endpoint(path))
            .basic_auth(&self.bot_username, Some(self.api_key.expose_secret()))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::Http(format!("{path}: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: CHANNEL_NAME.into(),
                reason: format!("{path} returned {status}: {detail}"),
            });
        }
        Ok(())
    }

    /// Point the platform's webhook at `webhook_url`.
    pub async fn configure_webhook(&self, webhook_url: &str) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "webhook": webhook_url,
            "features": {},
        });
        self.post_json("config", &body).await?;
        info!(webhook = webhook_url, "Platform webhook configured");
        Ok(())
    }
}

#[async_trait]
impl Transport for PlatformTransport {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn send(&self, batch: &[OutboundMessage]) -> Result<(), ChannelError> {
        if batch.is_empty() {
            return Err(ChannelError::InvalidMessage("empty batch".into()));
        }
        let body = WireBatch::from_messages(batch);
        self.post_json("message", &body).await?;
        debug!(size = batch.len(), "Batch delivered to platform");
        Ok(())
    }
}

// ── Outbound wire format ────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct WireBatch<'a> {
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    to: &'a str,
    #[serde(rename = "chatId", skip_serializing_if = "Option::is_none")]
    chat_id: Option<&'a str>,
    body: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    keyboards: Vec<WireKeyboard<'a>>,
}

#[derive(Debug, Serialize)]
struct WireKeyboard<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    to: &'a str,
    hidden: bool,
    responses: Vec<WireResponse<'a>>,
}

#[derive(Debug, Serialize)]
struct WireResponse<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    body: &'a str,
}

impl<'a> WireBatch<'a> {
    fn from_messages(batch: &'a [OutboundMessage]) -> Self {
        let messages = batch
            .iter()
            .map(|m| {
                let keyboards = if m.keyboard().is_empty() {
                    Vec::new()
                } else {
                    vec![WireKeyboard {
                        kind: "suggested",
                        to: m.recipient_id(),
                        hidden: false,
                        responses: m
                            .keyboard()
                            .iter()
                            .map(|label| WireResponse { kind: "text", body: label })
                            .collect(),
                    }]
                };
                WireMessage {
                    kind: "text",
                    to: m.recipient_id(),
                    chat_id: m.chat_id(),
                    body: m.body(),
                    keyboards,
                }
            })
            .collect();
        Self { messages }
    }
}

// ── Inbound webhook payload ─────────────────────────────────────────

/// Body of a webhook delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEnvelope {
    #[serde(default)]
    pub messages: Vec<InboundPayload>,
}

/// One inbound message. Only text is handled; everything else is skipped.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundPayload {
    Text {
        from: String,
        #[serde(rename = "chatId", default)]
        chat_id: Option<String>,
        #[serde(default)]
        body: String,
    },
    #[serde(other)]
    Other,
}

impl InboundEnvelope {
    /// The text messages, in delivery order.
    pub fn text_messages(&self) -> impl Iterator<Item = InboundText> + '_ {
        self.messages.iter().filter_map(|payload| match payload {
            InboundPayload::Text { from, chat_id, body } => Some(InboundText {
                from: from.clone(),
                chat_id: chat_id.clone(),
                body: body.clone(),
            }),
            InboundPayload::Other => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_endpoint() {
        let t = PlatformTransport::new("https://api.example.com/v1/", "bot", SecretString::from("k".to_string()));
        assert_eq!(t.name(), "platform");
        assert_eq!(t.endpoint("message"), "https://api.example.com/v1/message");
    }

    #[tokio::test]
    async fn empty_batch_is_rejected_without_a_request() {
        let t = PlatformTransport::new("http://127.0.0.1:9", "bot", SecretString::from("k".to_string()));
        let err = t.send(&[]).await.unwrap_err();
        assert!(matches!(err, ChannelError::InvalidMessage(_)));
    }

    #[test]
    fn wire_format_with_keyboard() {
        let batch = vec![
            OutboundMessage::new("friend", "hello")
                .with_chat_id(Some("c1".into()))
                .with_keyboard(vec!["Get more feels".into()]),
            OutboundMessage::new("boss", "plain"),
        ];
        let json = serde_json::to_value(WireBatch::from_messages(&batch)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "messages": [
                    {
                        "type": "text",
                        "to": "friend",
                        "chatId": "c1",
                        "body": "hello",
                        "keyboards": [{
                            "type": "suggested",
                            "to": "friend",
                            "hidden": false,
                            "responses": [{"type": "text", "body": "Get more feels"}]
                        }]
                    },
                    {"type": "text", "to": "boss", "body": "plain"}
                ]
            })
        );
    }

    #[test]
    fn inbound_skips_non_text() {
        let raw = r#"{"messages":[
            {"type":"text","from":"friend","chatId":"c1","body":"Get more feels","id":"x"},
            {"type":"picture","from":"friend","picUrl":"http://x"},
            {"type":"text","from":"boss","body":"System status"}
        ]}"#;
        let envelope: InboundEnvelope = serde_json::from_str(raw).unwrap();
        let texts: Vec<InboundText> = envelope.text_messages().collect();

        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0], InboundText::new("friend", "Get more feels").with_chat_id("c1"));
        assert_eq!(texts[1].chat_id, None);
    }

    #[test]
    fn inbound_empty_envelope() {
        let envelope: InboundEnvelope = serde_json::from_str("{}").unwrap();
        assert_eq!(envelope.text_messages().count(), 0);
    }
}
