use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use super::submission::Recipient;

/// One field definition on a form. Definitions drive validation and the
/// serialization order of submitted data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub max_length: Option<usize>,
}

fn default_field_type() -> String {
    "text".to_string()
}

impl FieldDef {
    /// Label falls back to the field name when the editor left it blank.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }
}

/// A form instance as composed by a site editor.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct FormConfig {
    pub id: Uuid,
    pub name: String,
    pub language: String,
    pub action_backend: String,
    pub success_url: Option<String>,
    pub success_message: Option<String>,
    pub honeypot_field: Option<String>,
    /// Multi-step forms correlate sequential posts under one token.
    pub multi_step: bool,
    pub fields: Json<Vec<FieldDef>>,
    pub recipients: Json<Vec<Recipient>>,
    pub created_at: DateTime<Utc>,
}
