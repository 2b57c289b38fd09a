use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::db;
use crate::email;
use crate::error::AppError;
use crate::ident;
use crate::models::{FieldDef, FormConfig, Recipient, Webhook};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateForm {
    pub name: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_backend")]
    pub action_backend: String,
    pub success_url: Option<String>,
    pub success_message: Option<String>,
    pub honeypot_field: Option<String>,
    #[serde(default)]
    pub multi_step: bool,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_backend() -> String {
    "default".to_string()
}

pub async fn create(
    State(state): State<SharedState>,
    Json(req): Json<CreateForm>,
) -> Result<Json<FormConfig>, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Form name is required".to_string()));
    }
    state
        .backends
        .validate_key(&req.action_backend)
        .map_err(AppError::Config)?;
    validate_fields(&req.fields, req.honeypot_field.as_deref())?;
    for recipient in &req.recipients {
        if !email::is_valid_recipient(&recipient.email) {
            return Err(AppError::BadRequest(format!(
                "Invalid recipient address {:?}",
                recipient.email
            )));
        }
    }

    let form = db::forms::create(
        &state.pool,
        &db::forms::NewForm {
            name: req.name,
            language: req.language,
            action_backend: req.action_backend,
            success_url: req.success_url,
            success_message: req.success_message,
            honeypot_field: req.honeypot_field,
            multi_step: req.multi_step,
            fields: req.fields,
            recipients: req.recipients,
        },
    )
    .await?;

    Ok(Json(form))
}

pub async fn list(State(state): State<SharedState>) -> Result<Json<Vec<FormConfig>>, AppError> {
    let forms = db::forms::list(&state.pool).await?;
    Ok(Json(forms))
}

pub async fn get(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FormConfig>, AppError> {
    let form = db::forms::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Form not found".to_string()))?;
    Ok(Json(form))
}

#[derive(Deserialize)]
pub struct AttachWebhook {
    pub webhook_id: Uuid,
}

pub async fn attach_webhook(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AttachWebhook>,
) -> Result<Json<serde_json::Value>, AppError> {
    db::forms::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Form not found".to_string()))?;
    db::webhooks::find_by_id(&state.pool, req.webhook_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Webhook not found".to_string()))?;

    db::forms::attach_webhook(&state.pool, id, req.webhook_id).await?;
    Ok(Json(serde_json::json!({ "message": "Attached" })))
}

pub async fn list_webhooks(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Webhook>>, AppError> {
    db::forms::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Form not found".to_string()))?;
    let webhooks = db::webhooks::list_for_form(&state.pool, id).await?;
    Ok(Json(webhooks))
}

/// Available action backends as (key, label) pairs, for configuration UIs.
pub async fn list_backends(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let choices: Vec<serde_json::Value> = state
        .backends
        .choices()
        .into_iter()
        .map(|(key, label)| serde_json::json!({ "key": key, "label": label }))
        .collect();
    Json(serde_json::Value::Array(choices))
}

fn validate_fields(fields: &[FieldDef], honeypot_field: Option<&str>) -> Result<(), AppError> {
    for field in fields {
        if field.name.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Field definitions require a name".to_string(),
            ));
        }
        if field.name == ident::POST_IDENT_FIELD {
            return Err(AppError::BadRequest(format!(
                "Field name {:?} is reserved",
                ident::POST_IDENT_FIELD
            )));
        }
    }
    if let Some(honeypot) = honeypot_field {
        if honeypot == ident::POST_IDENT_FIELD {
            return Err(AppError::BadRequest(format!(
                "Honeypot field must not be {:?}",
                ident::POST_IDENT_FIELD
            )));
        }
        if fields.iter().any(|f| f.name == honeypot) {
            return Err(AppError::BadRequest(
                "Honeypot field must not collide with a defined field".to_string(),
            ));
        }
    }
    Ok(())
}
