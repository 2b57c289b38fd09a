pub mod forms;
pub mod submissions;
pub mod submit;
pub mod webhooks;

use axum::Router;
use axum::routing::{get, post};

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Forms
        .route("/api/v1/forms", get(forms::list).post(forms::create))
        .route("/api/v1/forms/{id}", get(forms::get))
        .route(
            "/api/v1/forms/{id}/webhooks",
            get(forms::list_webhooks).post(forms::attach_webhook),
        )
        .route("/api/v1/backends", get(forms::list_backends))
        // Webhooks
        .route("/api/v1/webhooks", get(webhooks::list).post(webhooks::create))
        .route("/api/v1/webhooks/{id}", get(webhooks::get))
        .route("/api/v1/webhooks/{id}/preview", get(webhooks::preview))
        // Submissions (read-only)
        .route("/api/v1/submissions", get(submissions::list))
        .route("/api/v1/submissions/{id}", get(submissions::get))
}

pub fn submit_routes() -> Router<SharedState> {
    Router::new()
        .route("/v1/f/{form_id}", post(submit::submit))
        .route(
            "/v1/f/{form_id}",
            axum::routing::options(submit::submit_options),
        )
}
