//! HTTP Basic authentication for the trigger and submission routes.
//!
//! A missing or malformed `Authorization` header is rejected with 401; a
//! well-formed header with the wrong credentials gets 403.

use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::ExposeSecret;

use crate::context::AppContext;

/// Decode `Basic <base64(user:pass)>` into its parts.
pub fn parse_basic(header_value: &str) -> Option<(String, String)> {
    let encoded = header_value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (user, pass) = text.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

pub async fn basic_auth(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let credentials = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic);

    let Some((user, pass)) = credentials else {
        return Err((StatusCode::UNAUTHORIZED, "Authorization required."));
    };

    if user != ctx.config.webhook_user || pass != ctx.config.webhook_pass.expose_secret() {
        tracing::warn!(user = %user, path = %request.uri().path(), "Rejected webhook credentials");
        return Err((StatusCode::FORBIDDEN, "Invalid user name or password."));
    }

    Ok(next.run(request).await)
}
