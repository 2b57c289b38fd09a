use chrono::{Duration, Utc};
use tokio::sync::watch;

use crate::db;
use crate::email;
use crate::state::SharedState;

/// Start the background sweeps on a dedicated Tokio runtime with its own
/// thread. Blocks until shutdown is signaled.
pub fn run_scheduler(
    state: SharedState,
    shutdown: watch::Receiver<bool>,
) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("sweep-scheduler".into())
        .spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to build sweep runtime");

            runtime.block_on(run(state, shutdown));
        })
        .expect("Failed to spawn sweep scheduler thread")
}

async fn run(state: SharedState, mut shutdown: watch::Receiver<bool>) {
    let interval = std::time::Duration::from_secs(state.config.sweep_interval_secs);
    tracing::info!("Sweep scheduler started (interval {interval:?})");

    loop {
        if *shutdown.borrow() {
            break;
        }

        if let Err(e) = finalize_pending(&state).await {
            tracing::error!("Finalize sweep failed: {e}");
        }
        if let Err(e) = expire_idents(&state).await {
            tracing::error!("Expiry sweep failed: {e}");
        }
        state
            .submission_limiter
            .cleanup(std::time::Duration::from_secs(
                crate::rate_limit::SUBMISSION_WINDOW_SECS * 2,
            ));

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {}
        }
    }

    tracing::info!("Sweep scheduler stopped");
}

/// Claim pending multi-step groups whose correlation window has elapsed and
/// deliver them. A zero postpone duration finalizes everything pending.
///
/// The claim removes the rows up front, so each group gets exactly one
/// delivery attempt no matter how the sends go.
pub async fn finalize_pending(state: &SharedState) -> Result<usize, sqlx::Error> {
    let cutoff = match state.config.postpone_duration_mins {
        0 => None,
        mins => Some(Utc::now() - Duration::minutes(mins as i64)),
    };

    let claimed = db::submissions::claim_pending(&state.pool, cutoff).await?;
    if claimed.is_empty() {
        return Ok(0);
    }
    tracing::info!("Finalizing {} pending submission group(s)", claimed.len());

    for submission in &claimed {
        if submission.honeypot_filled {
            tracing::info!("Dropping honeypot-flagged pending group {}", submission.id);
            continue;
        }

        email::notify(state, submission).await;

        let Some(form_id) = submission.form_id else {
            continue;
        };
        match db::webhooks::list_for_form(&state.pool, form_id).await {
            Ok(webhooks) => {
                state
                    .dispatcher
                    .send_all(
                        &webhooks,
                        std::slice::from_ref(submission),
                        &state.config.hostname,
                        &state.functions,
                    )
                    .await;
            }
            Err(e) => {
                tracing::error!("Failed to load webhooks for form {form_id}: {e}");
            }
        }
    }

    Ok(claimed.len())
}

/// Clear correlation tokens on final submissions older than the postpone
/// window, then drop honeypot-flagged leftovers whose token is gone.
pub async fn expire_idents(state: &SharedState) -> Result<(), sqlx::Error> {
    if state.config.postpone_duration_mins > 0 {
        let cutoff = Utc::now() - Duration::minutes(state.config.postpone_duration_mins as i64);
        let cleared = db::submissions::clear_expired_idents(&state.pool, cutoff).await?;
        if cleared > 0 {
            tracing::debug!("Cleared {cleared} expired correlation token(s)");
        }
    }

    let dropped = db::submissions::delete_stale_honeypot(&state.pool).await?;
    if dropped > 0 {
        tracing::debug!("Deleted {dropped} stale honeypot submission(s)");
    }

    Ok(())
}
