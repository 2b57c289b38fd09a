use std::net::IpAddr;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use serde_json::json;
use uuid::Uuid;

use crate::db;
use crate::error::AppError;
use crate::state::SharedState;
use crate::submission::pipeline::{self, SubmitOutcome};
use crate::submission::parser;

pub async fn submit(
    State(state): State<SharedState>,
    Path(form_id): Path<Uuid>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let form = db::forms::find_by_id(&state.pool, form_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Form not found".to_string()))?;

    let content_type = headers.get("content-type").and_then(|v| v.to_str().ok());

    let raw = if content_type.is_some_and(|ct| ct.contains("multipart/form-data")) {
        parser::parse_multipart(&headers, body)
            .await
            .map_err(AppError::BadRequest)?
    } else {
        parser::parse_body(content_type, &body).map_err(AppError::BadRequest)?
    };

    let peer_ip: Option<IpAddr> = Some(addr.ip());
    let outcome = pipeline::run(&state, &form, &headers, peer_ip, raw).await?;

    let ajax = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("xmlhttprequest"));

    match outcome {
        SubmitOutcome::Accepted {
            post_ident,
            message,
            redirect,
        } => {
            // Script clients get the token back in the body; browsers follow
            // the configured redirect when one exists.
            if !ajax {
                if let Some(url) = redirect {
                    return Ok(Redirect::to(&url).into_response());
                }
            }
            Ok(Json(json!({
                "status": "SUCCESS",
                "post_ident": post_ident,
                "message": message,
            }))
            .into_response())
        }
        SubmitOutcome::Invalid { errors } => Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "ERROR", "form": errors })),
        )
            .into_response()),
    }
}

pub async fn submit_options() -> Response {
    (
        [
            ("Access-Control-Allow-Origin", "*"),
            ("Access-Control-Allow-Methods", "POST, OPTIONS"),
            (
                "Access-Control-Allow-Headers",
                "Content-Type, X-Requested-With",
            ),
            ("Access-Control-Max-Age", "86400"),
        ],
        StatusCode::NO_CONTENT,
    )
        .into_response()
}
