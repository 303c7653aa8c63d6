//! HTTP surface: platform webhook, external triggers and status.

pub mod auth;
pub mod routes;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

/// Build the application router.
///
/// `/message` and `/new-feel` sit behind HTTP Basic auth; the platform
/// webhook, status and health routes are open.
pub fn router(ctx: AppContext) -> Router {
    let protected = Router::new()
        .route("/message", post(routes::post_trigger))
        .route("/new-feel", post(routes::post_new_feel))
        .route_layer(middleware::from_fn_with_state(ctx.clone(), auth::basic_auth));

    Router::new()
        .route("/incoming", post(routes::post_incoming))
        .route("/api/status", get(routes::get_status))
        .route("/health", get(routes::get_health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
