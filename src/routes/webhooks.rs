use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::db;
use crate::dispatch::Dispatcher;
use crate::error::AppError;
use crate::models::{Webhook, WebhookMethod};
use crate::state::SharedState;
use crate::transform::{self, TransformRule};

#[derive(Deserialize)]
pub struct CreateWebhook {
    pub name: String,
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    pub transform: Option<Vec<TransformRule>>,
}

fn default_method() -> String {
    "json".to_string()
}

pub async fn create(
    State(state): State<SharedState>,
    Json(req): Json<CreateWebhook>,
) -> Result<Json<Webhook>, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Webhook name is required".to_string()));
    }
    if !req.url.starts_with("http://") && !req.url.starts_with("https://") {
        return Err(AppError::BadRequest(
            "Webhook URL must be http(s)".to_string(),
        ));
    }
    let method = WebhookMethod::parse(&req.method)
        .ok_or_else(|| AppError::Config(format!("Unknown webhook method {:?}", req.method)))?;
    if let Some(ref rules) = req.transform {
        transform::validate_rules(rules, &state.functions).map_err(AppError::Config)?;
    }

    let webhook = db::webhooks::create(
        &state.pool,
        &db::webhooks::NewWebhook {
            name: req.name,
            url: req.url,
            method,
            transform: req.transform,
        },
    )
    .await?;

    Ok(Json(webhook))
}

pub async fn list(State(state): State<SharedState>) -> Result<Json<Vec<Webhook>>, AppError> {
    let webhooks = db::webhooks::list(&state.pool).await?;
    Ok(Json(webhooks))
}

pub async fn get(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Webhook>, AppError> {
    let webhook = db::webhooks::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Webhook not found".to_string()))?;
    Ok(Json(webhook))
}

#[derive(Deserialize)]
pub struct PreviewParams {
    pub limit: Option<i64>,
}

/// Transformed payloads for the webhook's most recent final submissions,
/// collected without sending. Matches what `send_all` would deliver.
pub async fn preview(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(params): Query<PreviewParams>,
) -> Result<Json<Vec<Map<String, Value>>>, AppError> {
    let webhook = db::webhooks::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Webhook not found".to_string()))?;

    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    let submissions = db::submissions::list_final_for_webhook(&state.pool, id, limit).await?;

    let payloads = Dispatcher::collect(
        &webhook,
        &submissions,
        &state.config.hostname,
        &state.functions,
    );
    Ok(Json(payloads))
}
