pub mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::FormConfig;
use crate::state::AppState;

/// Registry keys are short strings stored on form rows.
pub const BACKEND_KEY_MAX_LEN: usize = 15;

/// Everything a backend needs to act on one validated submission.
pub struct SubmissionContext<'a> {
    pub form: &'a FormConfig,
    pub raw: &'a Value,
    pub form_url: String,
    /// Correlation token echoed by the client, if any.
    pub presented_ident: Option<String>,
    /// True when this submission belongs to a multi-step group and must land
    /// in a pending record instead of a final one.
    pub postponed: bool,
}

#[derive(Debug, Default)]
pub struct BackendOutcome {
    pub submission_id: Option<Uuid>,
    pub post_ident: Option<String>,
}

/// Pluggable post-validation behavior, selected per form instance.
#[async_trait]
pub trait ActionBackend: Send + Sync {
    fn label(&self) -> &'static str;

    async fn form_valid(
        &self,
        state: &AppState,
        ctx: &SubmissionContext<'_>,
    ) -> Result<BackendOutcome, AppError>;
}

/// String key to backend mapping, populated at startup. Form configurations
/// referencing unknown keys are rejected when written, not at submit time.
pub struct BackendRegistry {
    entries: HashMap<String, Arc<dyn ActionBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registry with the three built-in backends.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register("default", Arc::new(builtin::SaveAndNotify))
            .expect("builtin backend key is valid");
        registry
            .register("email_only", Arc::new(builtin::EmailOnly))
            .expect("builtin backend key is valid");
        registry
            .register("none", Arc::new(builtin::NoAction))
            .expect("builtin backend key is valid");
        registry
    }

    pub fn register(
        &mut self,
        key: &str,
        backend: Arc<dyn ActionBackend>,
    ) -> Result<(), String> {
        if key.is_empty() || key.len() > BACKEND_KEY_MAX_LEN {
            return Err(format!(
                "backend key {key:?} must be 1..={BACKEND_KEY_MAX_LEN} characters"
            ));
        }
        self.entries.insert(key.to_string(), backend);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Arc<dyn ActionBackend>> {
        self.entries.get(key)
    }

    pub fn validate_key(&self, key: &str) -> Result<(), String> {
        if self.entries.contains_key(key) {
            Ok(())
        } else {
            Err(format!("unknown action backend {key:?}"))
        }
    }

    /// (key, label) pairs sorted by label, for configuration UIs.
    pub fn choices(&self) -> Vec<(&str, &'static str)> {
        let mut choices: Vec<(&str, &'static str)> = self
            .entries
            .iter()
            .map(|(key, backend)| (key.as_str(), backend.label()))
            .collect();
        choices.sort_by_key(|(_, label)| *label);
        choices
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
