use std::net::IpAddr;

use axum::http::HeaderMap;
use serde_json::Value;

use crate::actions::SubmissionContext;
use crate::error::AppError;
use crate::ident;
use crate::models::FormConfig;
use crate::state::SharedState;

use super::client_ip;
use super::honeypot;
use super::validate::{self, FieldErrors};

pub enum SubmitOutcome {
    Accepted {
        post_ident: Option<String>,
        message: String,
        redirect: Option<String>,
    },
    Invalid {
        errors: FieldErrors,
    },
}

/// Run one submission through validation, honeypot screening, correlation
/// and the form's action backend.
pub async fn run(
    state: &SharedState,
    form: &FormConfig,
    headers: &HeaderMap,
    peer_addr: Option<IpAddr>,
    raw: Value,
) -> Result<SubmitOutcome, AppError> {
    let ip = client_ip::resolve(headers, peer_addr, &state.config.trusted_proxies);
    if let Err(retry_after) = state.submission_limiter.check(form.id, ip) {
        return Err(AppError::RateLimited(format!(
            "Rate limited. Retry after {retry_after}s"
        )));
    }

    let errors = validate::check_fields(&form.fields.0, &raw);
    if !errors.is_empty() {
        return Ok(SubmitOutcome::Invalid { errors });
    }

    let presented_ident = ident::from_submitted_data(&raw);
    let postponed = form.multi_step && state.config.postpone_duration_mins > 0;
    let message = form
        .success_message
        .clone()
        .unwrap_or_else(|| "OK".to_string());

    // Automated submissions get the normal success response, including a
    // plausible (but unstored) token, and leave no trace beyond this log line.
    if honeypot::is_filled(&raw, form.honeypot_field.as_deref()) {
        tracing::info!(
            "honeypot filled for form {:?} ({}); dropping submission",
            form.name,
            form.id
        );
        let token = if postponed {
            Some(presented_ident.unwrap_or_else(ident::new_post_ident))
        } else {
            None
        };
        let redirect = success_redirect(form, token.as_deref());
        return Ok(SubmitOutcome::Accepted {
            post_ident: token,
            message,
            redirect,
        });
    }

    let backend = state.backends.get(&form.action_backend).ok_or_else(|| {
        AppError::Config(format!(
            "Form {} references unknown action backend {:?}",
            form.id, form.action_backend
        ))
    })?;

    let ctx = SubmissionContext {
        form,
        raw: &raw,
        form_url: format!(
            "{}/v1/f/{}",
            state.config.base_url.trim_end_matches('/'),
            form.id
        ),
        presented_ident,
        postponed,
    };

    let outcome = backend.form_valid(state, &ctx).await?;
    let redirect = success_redirect(form, outcome.post_ident.as_deref());

    Ok(SubmitOutcome::Accepted {
        post_ident: outcome.post_ident,
        message,
        redirect,
    })
}

/// Success redirect target, with the correlation token appended for the next
/// step when one exists.
fn success_redirect(form: &FormConfig, post_ident: Option<&str>) -> Option<String> {
    let url = form.success_url.as_ref()?;
    match post_ident {
        Some(token) => {
            let joiner = if url.contains('?') { '&' } else { '?' };
            Some(format!("{url}{joiner}{}={token}", ident::POST_IDENT_FIELD))
        }
        None => Some(url.clone()),
    }
}
