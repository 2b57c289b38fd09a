use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::{Webhook, WebhookMethod};
use crate::transform::TransformRule;

pub struct NewWebhook {
    pub name: String,
    pub url: String,
    pub method: WebhookMethod,
    pub transform: Option<Vec<TransformRule>>,
}

pub async fn create(pool: &PgPool, new: &NewWebhook) -> Result<Webhook, sqlx::Error> {
    sqlx::query_as::<_, Webhook>(
        "INSERT INTO webhooks (name, url, method, transform)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(&new.name)
    .bind(&new.url)
    .bind(new.method.as_str())
    .bind(new.transform.as_ref().map(Json))
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Webhook>, sqlx::Error> {
    sqlx::query_as::<_, Webhook>("SELECT * FROM webhooks WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<Webhook>, sqlx::Error> {
    sqlx::query_as::<_, Webhook>("SELECT * FROM webhooks ORDER BY name, created_at")
        .fetch_all(pool)
        .await
}

/// Webhooks registered for a form, in stable order.
pub async fn list_for_form(pool: &PgPool, form_id: Uuid) -> Result<Vec<Webhook>, sqlx::Error> {
    sqlx::query_as::<_, Webhook>(
        "SELECT w.* FROM webhooks w
         JOIN form_webhooks fw ON fw.webhook_id = w.id
         WHERE fw.form_id = $1
         ORDER BY w.name, w.created_at",
    )
    .bind(form_id)
    .fetch_all(pool)
    .await
}
