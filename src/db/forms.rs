use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::{FieldDef, FormConfig, Recipient};

pub struct NewForm {
    pub name: String,
    pub language: String,
    pub action_backend: String,
    pub success_url: Option<String>,
    pub success_message: Option<String>,
    pub honeypot_field: Option<String>,
    pub multi_step: bool,
    pub fields: Vec<FieldDef>,
    pub recipients: Vec<Recipient>,
}

pub async fn create(pool: &PgPool, new: &NewForm) -> Result<FormConfig, sqlx::Error> {
    sqlx::query_as::<_, FormConfig>(
        "INSERT INTO forms (name, language, action_backend, success_url, success_message,
                            honeypot_field, multi_step, fields, recipients)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(&new.name)
    .bind(&new.language)
    .bind(&new.action_backend)
    .bind(&new.success_url)
    .bind(&new.success_message)
    .bind(&new.honeypot_field)
    .bind(new.multi_step)
    .bind(Json(&new.fields))
    .bind(Json(&new.recipients))
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<FormConfig>, sqlx::Error> {
    sqlx::query_as::<_, FormConfig>("SELECT * FROM forms WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<FormConfig>, sqlx::Error> {
    sqlx::query_as::<_, FormConfig>("SELECT * FROM forms ORDER BY name, created_at")
        .fetch_all(pool)
        .await
}

pub async fn attach_webhook(
    pool: &PgPool,
    form_id: Uuid,
    webhook_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO form_webhooks (form_id, webhook_id)
         VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(form_id)
    .bind(webhook_id)
    .execute(pool)
    .await?;
    Ok(())
}
