pub mod actions;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod email;
pub mod error;
pub mod ident;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod submission;
pub mod sweep;
pub mod transform;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, HeaderValue};
use sqlx::PgPool;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::actions::BackendRegistry;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::email::Mailer;
use crate::rate_limit::SubmissionRateLimiter;
use crate::state::{AppState, SharedState};
use crate::transform::FnRegistry;

pub fn build_state(pool: PgPool, config: Config) -> SharedState {
    let mailer = config.smtp.as_ref().and_then(|smtp| match Mailer::new(smtp) {
        Ok(mailer) => {
            tracing::info!("SMTP configured");
            Some(Arc::new(mailer))
        }
        Err(e) => {
            tracing::warn!("SMTP not available: {e}");
            None
        }
    });

    Arc::new(AppState {
        pool,
        config,
        backends: BackendRegistry::builtin(),
        functions: FnRegistry::builtin(),
        dispatcher: Dispatcher::new(),
        mailer,
        submission_limiter: SubmissionRateLimiter::new(),
    })
}

pub fn build_app(state: SharedState) -> Router {
    let max_body_size = state.config.max_body_size;

    Router::new()
        .merge(routes::api_routes())
        .merge(routes::submit_routes())
        .route("/health", axum::routing::get(health))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
