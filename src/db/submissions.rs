use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::{Recipient, SerializedField, Submission};

pub struct NewSubmission {
    pub form_id: Uuid,
    pub name: String,
    pub language: String,
    pub form_url: String,
    pub data: Vec<SerializedField>,
    pub recipients: Vec<Recipient>,
    pub post_ident: Option<String>,
}

/// Insert a final submission. Immutable afterwards apart from the expiry
/// sweep clearing `post_ident`.
pub async fn create_final(pool: &PgPool, new: &NewSubmission) -> Result<Submission, sqlx::Error> {
    insert(pool, new, false).await
}

/// Insert the first record of a multi-step group. `post_ident` must be set.
pub async fn create_pending(pool: &PgPool, new: &NewSubmission) -> Result<Submission, sqlx::Error> {
    insert(pool, new, true).await
}

async fn insert(
    pool: &PgPool,
    new: &NewSubmission,
    pending: bool,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        "INSERT INTO submissions (form_id, name, language, form_url, data, recipients, post_ident, pending)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(new.form_id)
    .bind(&new.name)
    .bind(&new.language)
    .bind(&new.form_url)
    .bind(Json(&new.data))
    .bind(Json(&new.recipients))
    .bind(&new.post_ident)
    .bind(pending)
    .fetch_one(pool)
    .await
}

/// Exact-token lookup of a live pending record. Used to continue occurrence
/// numbering before a merge; absence is not an error.
pub async fn find_pending_by_ident(
    pool: &PgPool,
    post_ident: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        "SELECT * FROM submissions WHERE post_ident = $1 AND pending",
    )
    .bind(post_ident)
    .fetch_optional(pool)
    .await
}

/// Merge a follow-up post into the pending record holding this token.
///
/// The jsonb concatenation runs as a single row update, so a merge racing the
/// finalize sweep either lands before the claim or matches nothing; callers
/// handle the `None` by starting a fresh pending record.
pub async fn append_pending(
    pool: &PgPool,
    post_ident: &str,
    fields: &[SerializedField],
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        "UPDATE submissions SET data = data || $2::jsonb
         WHERE post_ident = $1 AND pending RETURNING *",
    )
    .bind(post_ident)
    .bind(Json(fields))
    .fetch_optional(pool)
    .await
}

/// Atomically claim and remove pending records ready for finalization. With a
/// cutoff only records older than it are taken; without one, all of them.
/// Deletion up front keeps the one-attempt contract: dispatch failure after
/// the claim never resurrects the record.
pub async fn claim_pending(
    pool: &PgPool,
    cutoff: Option<DateTime<Utc>>,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        "DELETE FROM submissions
         WHERE pending AND ($1::timestamptz IS NULL OR sent_at < $1)
         RETURNING *",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await
}

/// Expiry sweep: final submissions keep their token only for the correlation
/// window, then it is cleared so the record drops out of token lookups.
pub async fn clear_expired_idents(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE submissions SET post_ident = NULL
         WHERE NOT pending AND post_ident IS NOT NULL AND sent_at < $1",
    )
    .bind(cutoff)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Expiry sweep: honeypot-flagged records are never surfaced to recipients
/// and get deleted outright once their token is gone.
pub async fn delete_stale_honeypot(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM submissions WHERE honeypot_filled AND post_ident IS NULL")
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}

pub struct ListParams {
    pub name: Option<String>,
    pub language: Option<String>,
    pub sent_after: Option<DateTime<Utc>>,
    pub sent_before: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

/// Final, non-correlated submissions, newest first. Pending records and
/// records still inside their correlation window never show up here.
pub async fn list_final(pool: &PgPool, params: &ListParams) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        "SELECT * FROM submissions
         WHERE NOT pending AND post_ident IS NULL
           AND ($1::text IS NULL OR name = $1)
           AND ($2::text IS NULL OR language = $2)
           AND ($3::timestamptz IS NULL OR sent_at >= $3)
           AND ($4::timestamptz IS NULL OR sent_at < $4)
         ORDER BY sent_at DESC LIMIT $5 OFFSET $6",
    )
    .bind(&params.name)
    .bind(&params.language)
    .bind(params.sent_after)
    .bind(params.sent_before)
    .bind(params.limit)
    .bind(params.offset)
    .fetch_all(pool)
    .await
}

pub async fn count_final(pool: &PgPool, params: &ListParams) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM submissions
         WHERE NOT pending AND post_ident IS NULL
           AND ($1::text IS NULL OR name = $1)
           AND ($2::text IS NULL OR language = $2)
           AND ($3::timestamptz IS NULL OR sent_at >= $3)
           AND ($4::timestamptz IS NULL OR sent_at < $4)",
    )
    .bind(&params.name)
    .bind(&params.language)
    .bind(params.sent_after)
    .bind(params.sent_before)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn find_final_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        "SELECT * FROM submissions WHERE id = $1 AND NOT pending AND post_ident IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Final submissions of every form the webhook is registered on, for the
/// collect/preview path.
pub async fn list_final_for_webhook(
    pool: &PgPool,
    webhook_id: Uuid,
    limit: i64,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        "SELECT s.* FROM submissions s
         JOIN form_webhooks fw ON fw.form_id = s.form_id
         WHERE fw.webhook_id = $1 AND NOT s.pending AND s.post_ident IS NULL
         ORDER BY s.sent_at DESC LIMIT $2",
    )
    .bind(webhook_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
