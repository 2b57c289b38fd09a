use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// One answered field, as serialized by the field handler at submission time.
/// `field_occurrence` disambiguates repeated names across multi-step posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedField {
    pub name: String,
    pub label: String,
    pub field_occurrence: u32,
    pub value: String,
}

/// A notification recipient snapshot, copied into the submission at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    #[serde(default)]
    pub name: String,
    pub email: String,
}

/// A visitor's answer set, either final or pending correlation.
///
/// Final rows are immutable apart from the expiry sweep clearing `post_ident`.
/// Pending rows accumulate field data from follow-up posts bearing the same
/// token and are deleted once the finalize sweep has had its one attempt.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub form_id: Option<Uuid>,
    pub name: String,
    pub language: String,
    pub sent_at: DateTime<Utc>,
    pub form_url: String,
    pub data: Json<Vec<SerializedField>>,
    pub recipients: Json<Vec<Recipient>>,
    pub honeypot_filled: bool,
    pub post_ident: Option<String>,
    pub pending: bool,
}
