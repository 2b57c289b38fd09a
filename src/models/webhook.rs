use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::transform::TransformRule;

/// How the transformed payload is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookMethod {
    /// POST with an `application/json` body.
    Json,
    /// POST with a form-encoded body.
    Post,
}

impl WebhookMethod {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(WebhookMethod::Json),
            "post" => Some(WebhookMethod::Post),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WebhookMethod::Json => "json",
            WebhookMethod::Post => "post",
        }
    }
}

/// An outbound delivery target. Configuration entity, read-only at submission
/// time; referenced by forms, never owned by a submission.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Webhook {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    method: String,
    pub transform: Option<Json<Vec<TransformRule>>>,
    pub created_at: DateTime<Utc>,
}

impl Webhook {
    /// Unknown method strings fall back to JSON; creation validates the
    /// value, so this only covers rows written before that check existed.
    pub fn method(&self) -> WebhookMethod {
        WebhookMethod::parse(&self.method).unwrap_or(WebhookMethod::Json)
    }

    pub fn rules(&self) -> Option<&[TransformRule]> {
        self.transform.as_ref().map(|rules| rules.0.as_slice())
    }
}

#[cfg(test)]
impl Webhook {
    pub fn for_tests(url: &str, method: WebhookMethod, rules: Option<Vec<TransformRule>>) -> Self {
        Webhook {
            id: Uuid::new_v4(),
            name: "test-hook".to_string(),
            url: url.to_string(),
            method: method.as_str().to_string(),
            transform: rules.map(Json),
            created_at: Utc::now(),
        }
    }
}
