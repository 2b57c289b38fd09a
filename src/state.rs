use std::sync::Arc;

use sqlx::PgPool;

use crate::actions::BackendRegistry;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::email::Mailer;
use crate::rate_limit::SubmissionRateLimiter;
use crate::transform::FnRegistry;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub backends: BackendRegistry,
    pub functions: FnRegistry,
    pub dispatcher: Dispatcher,
    pub mailer: Option<Arc<Mailer>>,
    pub submission_limiter: SubmissionRateLimiter,
}
