//! Route handlers.

use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Form, Json};
use serde::Deserialize;
use tracing::{error, info};

use crate::channels::InboundEnvelope;
use crate::context::AppContext;
use crate::conversation::TriggerSource;
use crate::conversation::replies::MULTIPLE_ERRORS;

/// POST /incoming
///
/// Webhook from the messaging platform. Text messages are parsed in order;
/// the first non-200 parser result flushes what is queued and is returned
/// as-is. Otherwise the flush outcome decides the status.
pub async fn post_incoming(
    State(ctx): State<AppContext>,
    Json(envelope): Json<InboundEnvelope>,
) -> StatusCode {
    let mut queue = ctx.new_queue();

    for msg in envelope.text_messages() {
        let status = ctx.parser().process_text_message(&msg, &mut queue).await;
        if status == StatusCode::OK {
            continue;
        }

        if !queue.flush().await.is_ok() {
            error!(
                parser_status = status.as_u16(),
                "Parser and message send both failed while handling incoming messages"
            );
            queue.enqueue(&ctx.config.admin_id, MULTIPLE_ERRORS, None, Vec::new());
            queue.flush().await;
        }
        return status;
    }

    queue.flush().await.http_status()
}

#[derive(Debug, Deserialize)]
pub struct TriggerForm {
    source: Option<String>,
}

/// POST /message
///
/// External trigger: broadcast one approved feel, worded for `source`.
pub async fn post_trigger(
    State(ctx): State<AppContext>,
    form: Result<Form<TriggerForm>, FormRejection>,
) -> StatusCode {
    let source = form
        .ok()
        .and_then(|Form(f)| f.source)
        .map(|label| TriggerSource::from_label(&label))
        .unwrap_or_default();

    let mut queue = ctx.new_queue();
    if let Err(e) = ctx.parser().queue_feel(source, &mut queue).await {
        error!(%source, error = %e, "Failed to queue triggered feel");
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    queue.flush().await.http_status()
}

#[derive(Debug, Deserialize)]
pub struct NewFeelForm {
    submitted: Option<String>,
    name: Option<String>,
    comment: Option<String>,
}

/// POST /new-feel
///
/// Store a submission for moderation.
pub async fn post_new_feel(
    State(ctx): State<AppContext>,
    form: Result<Form<NewFeelForm>, FormRejection>,
) -> (StatusCode, &'static str) {
    const MISSING: &str = "Expected post data for 'submitted', 'name' and 'comment' but POST request did not contain one or more of these.";

    let Ok(Form(NewFeelForm {
        submitted: Some(submitted),
        name: Some(name),
        comment: Some(comment),
    })) = form
    else {
        return (StatusCode::BAD_REQUEST, MISSING);
    };

    match ctx.content.insert(&submitted, &name, &comment).await {
        Ok(id) => {
            info!(feel_id = id, "New feel awaiting approval");
            (StatusCode::OK, "New feel added and awaiting approval.")
        }
        Err(e) => {
            error!(error = %e, "Failed to store new feel");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to store feel.")
        }
    }
}

/// GET /api/status
///
/// Moderation counts.
pub async fn get_status(State(ctx): State<AppContext>) -> impl IntoResponse {
    match ctx.content.counts().await {
        Ok(counts) => Json(counts).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to read feel counts");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Database unavailable"})),
            )
                .into_response()
        }
    }
}

/// GET /health
pub async fn get_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
