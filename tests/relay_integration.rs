//! Integration tests for the relay's HTTP surface.
//!
//! Each test spins up the relay on a random port next to a fake platform API
//! (another Axum server) that records every outbound batch, then drives the
//! relay with reqwest.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use feels_relay::channels::PlatformTransport;
use feels_relay::config::RelayConfig;
use feels_relay::context::AppContext;
use feels_relay::server;
use feels_relay::store::{ContentStore, LibSqlBackend};

const ADMIN: &str = "boss";
const FRIEND: &str = "friend";

/// Records every batch posted to `/message`; can be told to reject them.
#[derive(Clone, Default)]
struct FakePlatform {
    batches: Arc<Mutex<Vec<Value>>>,
    auth_headers: Arc<Mutex<Vec<String>>>,
    reject: Arc<AtomicBool>,
}

impl FakePlatform {
    fn batches(&self) -> Vec<Value> {
        self.batches.lock().unwrap().clone()
    }

    /// Every message from every batch, flattened.
    fn messages(&self) -> Vec<Value> {
        self.batches()
            .into_iter()
            .flat_map(|b| b["messages"].as_array().cloned().unwrap_or_default())
            .collect()
    }
}

async fn fake_message(
    State(platform): State<FakePlatform>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        platform.auth_headers.lock().unwrap().push(auth.to_string());
    }
    platform.batches.lock().unwrap().push(body);
    if platform.reject.load(Ordering::SeqCst) {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

struct Relay {
    base: String,
    client: reqwest::Client,
    db: Arc<LibSqlBackend>,
    platform: FakePlatform,
}

impl Relay {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn incoming(&self, messages: Value) -> reqwest::Response {
        self.client
            .post(self.url("/incoming"))
            .json(&json!({ "messages": messages }))
            .send()
            .await
            .unwrap()
    }

    async fn approved_feel(&self, author: &str, body: &str) -> i64 {
        let id = self.db.insert("2026-06-01", author, body).await.unwrap();
        self.db.approve(id).await.unwrap();
        id
    }
}

async fn start_relay() -> Relay {
    let platform = FakePlatform::default();
    let fake = Router::new()
        .route("/message", post(fake_message))
        .with_state(platform.clone());
    let fake_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let fake_port = fake_listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(fake_listener, fake).await.unwrap();
    });

    let env = HashMap::from([
        ("RELAY_ADMIN_ID", ADMIN.to_string()),
        ("RELAY_RECIPIENT_ID", FRIEND.to_string()),
        ("RELAY_BOT_USERNAME", "feelsbot".to_string()),
        ("RELAY_BOT_API_KEY", "bot-key".to_string()),
        ("RELAY_WEBHOOK_USER", "zap".to_string()),
        ("RELAY_WEBHOOK_PASS", "hunter2".to_string()),
        ("RELAY_API_URL", format!("http://127.0.0.1:{fake_port}")),
    ]);
    let config = RelayConfig::from_lookup(|key| env.get(key).cloned()).unwrap();

    let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let transport = Arc::new(PlatformTransport::new(
        config.api_url.clone(),
        config.bot_username.clone(),
        config.bot_api_key.clone(),
    ));
    let ctx = AppContext::new(config, db.clone(), db.clone(), transport);
    let app = server::router(ctx);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the servers a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    Relay {
        base: format!("http://127.0.0.1:{port}"),
        client: reqwest::Client::new(),
        db,
        platform,
    }
}

// ── Health / status ─────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
    let relay = start_relay().await;
    let resp = relay.client.get(relay.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn status_reports_counts() {
    let relay = start_relay().await;
    relay.approved_feel("a", "one").await;
    relay.db.insert("2026-06-02", "b", "two").await.unwrap();

    let body: Value = relay
        .client
        .get(relay.url("/api/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 2);
    assert_eq!(body["pending"], 1);
    assert_eq!(body["approved"], 1);
    assert_eq!(body["blocked"], 0);
}

// ── Basic auth ──────────────────────────────────────────────────────

#[tokio::test]
async fn protected_routes_require_credentials() {
    let relay = start_relay().await;

    let resp = relay.client.post(relay.url("/new-feel")).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    let resp = relay
        .client
        .post(relay.url("/message"))
        .basic_auth("zap", Some("wrong"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    assert!(relay.platform.batches().is_empty());
}

// ── New feel submission ─────────────────────────────────────────────

#[tokio::test]
async fn new_feel_is_stored_pending() {
    let relay = start_relay().await;

    let resp = relay
        .client
        .post(relay.url("/new-feel"))
        .basic_auth("zap", Some("hunter2"))
        .form(&[("submitted", "2026-06-03"), ("name", "Robin"), ("comment", "Proud of you")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "New feel added and awaiting approval.");

    let pending = relay.db.select_pending().await.unwrap().unwrap();
    assert_eq!(pending.author, "Robin");
    assert_eq!(pending.body, "Proud of you");
}

#[tokio::test]
async fn new_feel_missing_field_is_rejected() {
    let relay = start_relay().await;

    let resp = relay
        .client
        .post(relay.url("/new-feel"))
        .basic_auth("zap", Some("hunter2"))
        .form(&[("submitted", "2026-06-03"), ("name", "Robin")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(relay.db.count_total().await.unwrap(), 0);
}

// ── External trigger ────────────────────────────────────────────────

#[tokio::test]
async fn trigger_broadcasts_to_admin_and_recipient() {
    let relay = start_relay().await;
    relay.approved_feel("Sky", "Sending a hug").await;

    let resp = relay
        .client
        .post(relay.url("/message"))
        .basic_auth("zap", Some("hunter2"))
        .form(&[("source", "push")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let batches = relay.platform.batches();
    assert_eq!(batches.len(), 1);
    let messages = relay.platform.messages();
    assert_eq!(messages[0]["to"], ADMIN);
    assert!(messages[0]["body"].as_str().unwrap().starts_with("Triggered by Zapier push:"));
    assert_eq!(messages[1]["to"], FRIEND);
    assert!(
        messages[1]["body"]
            .as_str()
            .unwrap()
            .ends_with("Sending a hug\n\u{a0}  \u{2015}Sky (2026-06-01)")
    );
    assert_eq!(
        messages[1]["keyboards"][0]["responses"][0]["body"],
        "Get more feels"
    );

    let auth = relay.platform.auth_headers.lock().unwrap().clone();
    assert!(auth[0].starts_with("Basic "));
}

#[tokio::test]
async fn trigger_without_source_uses_unknown_wording() {
    let relay = start_relay().await;
    relay.approved_feel("Sky", "Hi").await;

    let resp = relay
        .client
        .post(relay.url("/message"))
        .basic_auth("zap", Some("hunter2"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let messages = relay.platform.messages();
    assert!(messages[0]["body"].as_str().unwrap().starts_with("Unknown trigger source:"));
}

#[tokio::test]
async fn platform_rejection_yields_accepted_and_one_notice() {
    let relay = start_relay().await;
    relay.approved_feel("Sky", "Hi").await;
    relay.platform.reject.store(true, Ordering::SeqCst);

    let resp = relay
        .client
        .post(relay.url("/message"))
        .basic_auth("zap", Some("hunter2"))
        .form(&[("source", "schedule")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);

    // The failed batch, then exactly one admin notice attempt.
    let batches = relay.platform.batches();
    assert_eq!(batches.len(), 2);
    let notice = &batches[1]["messages"];
    assert_eq!(notice.as_array().unwrap().len(), 1);
    assert_eq!(notice[0]["to"], ADMIN);
}

// ── Incoming webhook ────────────────────────────────────────────────

#[tokio::test]
async fn incoming_conversation_round_trip() {
    let relay = start_relay().await;
    relay.db.insert("2026-06-04", "Ash", "Chin up").await.unwrap();

    let resp = relay
        .incoming(json!([
            {"type": "text", "from": ADMIN, "chatId": "c-admin", "body": "Approve new feels"},
        ]))
        .await;
    assert_eq!(resp.status(), 200);

    let resp = relay
        .incoming(json!([
            {"type": "text", "from": ADMIN, "chatId": "c-admin", "body": "Approve feel"},
        ]))
        .await;
    assert_eq!(resp.status(), 200);

    let resp = relay
        .incoming(json!([
            {"type": "text", "from": FRIEND, "chatId": "c-friend", "body": "Get more feels"},
        ]))
        .await;
    assert_eq!(resp.status(), 200);

    let messages = relay.platform.messages();
    assert_eq!(messages[0]["body"], "From: Ash\nDate: 2026-06-04\nComment:\nChin up");
    assert_eq!(messages[0]["chatId"], "c-admin");
    assert_eq!(messages[1]["body"], "Message approved.");

    let to_friend: Vec<&Value> = messages.iter().filter(|m| m["to"] == FRIEND).collect();
    assert_eq!(to_friend.len(), 1);
    assert!(
        to_friend[0]["body"]
            .as_str()
            .unwrap()
            .starts_with("As requested, another message in case you need more feels:")
    );
}

#[tokio::test]
async fn incoming_batches_replies_and_skips_non_text() {
    let relay = start_relay().await;

    let resp = relay
        .incoming(json!([
            {"type": "text", "from": "stranger", "body": "hi"},
            {"type": "picture", "from": FRIEND, "picUrl": "http://example.invalid/p.png"},
            {"type": "text", "from": FRIEND, "body": "hello?"},
        ]))
        .await;
    assert_eq!(resp.status(), 200);

    let batches = relay.platform.batches();
    assert_eq!(batches.len(), 1);
    let messages = relay.platform.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["body"], "You are not a recognised user for this bot. Sorry.");
    assert_eq!(messages[1]["to"], FRIEND);
}

#[tokio::test]
async fn incoming_empty_envelope_sends_nothing() {
    let relay = start_relay().await;
    let resp = relay.incoming(json!([])).await;
    assert_eq!(resp.status(), 200);
    assert!(relay.platform.batches().is_empty());
}
