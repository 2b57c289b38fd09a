use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crate::db;
use crate::db::submissions::NewSubmission;
use crate::email;
use crate::error::AppError;
use crate::ident;
use crate::models::Submission;
use crate::state::AppState;
use crate::submission::fields;

use super::{ActionBackend, BackendOutcome, SubmissionContext};

/// Persist the submission, notify recipients, trigger webhooks. Multi-step
/// submissions land in a pending record and defer notification and webhook
/// delivery to the finalize sweep.
pub struct SaveAndNotify;

#[async_trait]
impl ActionBackend for SaveAndNotify {
    fn label(&self) -> &'static str {
        "Save to site administration and send email"
    }

    async fn form_valid(
        &self,
        state: &AppState,
        ctx: &SubmissionContext<'_>,
    ) -> Result<BackendOutcome, AppError> {
        if ctx.postponed {
            return persist_pending(state, ctx).await;
        }

        let submission = db::submissions::create_final(&state.pool, &new_submission(ctx, &[])).await?;

        email::notify(state, &submission).await;

        let webhooks = db::webhooks::list_for_form(&state.pool, ctx.form.id).await?;
        state
            .dispatcher
            .send_all(
                &webhooks,
                std::slice::from_ref(&submission),
                &state.config.hostname,
                &state.functions,
            )
            .await;

        Ok(BackendOutcome {
            submission_id: Some(submission.id),
            post_ident: submission.post_ident.clone(),
        })
    }
}

/// Notify recipients and trigger webhooks without persisting anything.
pub struct EmailOnly;

#[async_trait]
impl ActionBackend for EmailOnly {
    fn label(&self) -> &'static str {
        "Only send email"
    }

    async fn form_valid(
        &self,
        state: &AppState,
        ctx: &SubmissionContext<'_>,
    ) -> Result<BackendOutcome, AppError> {
        let submission = ephemeral_submission(ctx);

        email::notify(state, &submission).await;
        tracing::info!(
            "sent notifications for form {:?} to {} recipients without persisting",
            ctx.form.name,
            submission.recipients.0.len()
        );

        let webhooks = db::webhooks::list_for_form(&state.pool, ctx.form.id).await?;
        state
            .dispatcher
            .send_all(
                &webhooks,
                std::slice::from_ref(&submission),
                &state.config.hostname,
                &state.functions,
            )
            .await;

        Ok(BackendOutcome::default())
    }
}

/// Neither persist nor notify.
pub struct NoAction;

#[async_trait]
impl ActionBackend for NoAction {
    fn label(&self) -> &'static str {
        "No action"
    }

    async fn form_valid(
        &self,
        _state: &AppState,
        ctx: &SubmissionContext<'_>,
    ) -> Result<BackendOutcome, AppError> {
        tracing::info!(
            "not persisting data for form {} since its action backend is \"none\"",
            ctx.form.id
        );
        Ok(BackendOutcome::default())
    }
}

/// Create or extend the pending record for a multi-step group.
///
/// A presented token whose pending record has meanwhile been finalized or
/// expired starts a fresh group under the same token; the response shape is
/// identical either way, so token probing learns nothing.
async fn persist_pending(
    state: &AppState,
    ctx: &SubmissionContext<'_>,
) -> Result<BackendOutcome, AppError> {
    let token = ctx
        .presented_ident
        .clone()
        .unwrap_or_else(ident::new_post_ident);

    if ctx.presented_ident.is_some() {
        if let Some(outcome) = try_append(state, ctx, &token).await? {
            return Ok(outcome);
        }
    }

    let mut new = new_submission(ctx, &[]);
    new.post_ident = Some(token.clone());
    match db::submissions::create_pending(&state.pool, &new).await {
        Ok(submission) => Ok(BackendOutcome {
            submission_id: Some(submission.id),
            post_ident: Some(token),
        }),
        // Sibling steps of one group can race here: both miss the pending
        // row, both insert, the unique pending-token index rejects one. The
        // loser merges into the winner's row instead of failing the
        // submitter.
        Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
            let outcome = try_append(state, ctx, &token)
                .await?
                .ok_or_else(|| AppError::Database(sqlx::Error::RowNotFound))?;
            Ok(outcome)
        }
        Err(e) => Err(e.into()),
    }
}

/// Merge this post into the live pending record holding the token, if any.
async fn try_append(
    state: &AppState,
    ctx: &SubmissionContext<'_>,
    token: &str,
) -> Result<Option<BackendOutcome>, AppError> {
    let Some(existing) = db::submissions::find_pending_by_ident(&state.pool, token).await? else {
        return Ok(None);
    };
    let step = fields::serialize_fields(&ctx.form.fields.0, ctx.raw, &existing.data.0);
    Ok(db::submissions::append_pending(&state.pool, token, &step)
        .await?
        .map(|updated| BackendOutcome {
            submission_id: Some(updated.id),
            post_ident: Some(token.to_string()),
        }))
}

fn new_submission(
    ctx: &SubmissionContext<'_>,
    prior: &[crate::models::SerializedField],
) -> NewSubmission {
    NewSubmission {
        form_id: ctx.form.id,
        name: ctx.form.name.clone(),
        language: ctx.form.language.clone(),
        form_url: ctx.form_url.clone(),
        data: fields::serialize_fields(&ctx.form.fields.0, ctx.raw, prior),
        recipients: ctx.form.recipients.0.clone(),
        post_ident: ctx.presented_ident.clone(),
    }
}

/// An in-memory submission for the notify-only path; never stored.
fn ephemeral_submission(ctx: &SubmissionContext<'_>) -> Submission {
    Submission {
        id: Uuid::new_v4(),
        form_id: Some(ctx.form.id),
        name: ctx.form.name.clone(),
        language: ctx.form.language.clone(),
        sent_at: Utc::now(),
        form_url: ctx.form_url.clone(),
        data: Json(fields::serialize_fields(&ctx.form.fields.0, ctx.raw, &[])),
        recipients: Json(ctx.form.recipients.0.clone()),
        honeypot_filled: false,
        post_ident: None,
        pending: false,
    }
}
