use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::db;
use crate::error::AppError;
use crate::models::Submission;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct ListQuery {
    pub name: Option<String>,
    pub language: Option<String>,
    pub sent_after: Option<DateTime<Utc>>,
    pub sent_before: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Final, non-correlated submissions only. Pending multi-step groups and
/// records still holding a correlation token are invisible here.
pub async fn list(
    State(state): State<SharedState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let list_params = db::submissions::ListParams {
        name: params.name,
        language: params.language,
        sent_after: params.sent_after,
        sent_before: params.sent_before,
        limit: per_page,
        offset,
    };

    let submissions = db::submissions::list_final(&state.pool, &list_params).await?;
    let total = db::submissions::count_final(&state.pool, &list_params).await?;

    Ok(Json(serde_json::json!({
        "submissions": submissions,
        "total": total,
        "page": page,
        "per_page": per_page,
        "total_pages": (total as f64 / per_page as f64).ceil() as i64,
    })))
}

pub async fn get(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Submission>, AppError> {
    let submission = db::submissions::find_final_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("No submission with id {id}")))?;
    Ok(Json(submission))
}
