use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::{Recipient, SerializedField, Submission, Webhook, WebhookMethod};
use crate::transform::{self, FnRegistry};

/// Canonical submission representation handed to the transform engine and,
/// absent transform rules, sent to the receiver as-is.
#[derive(Debug, Serialize)]
struct SubmissionPayload<'a> {
    hostname: &'a str,
    name: &'a str,
    language: &'a str,
    sent_at: DateTime<Utc>,
    form_recipients: &'a [Recipient],
    form_data: &'a [SerializedField],
}

/// Best-effort synchronous webhook delivery: one attempt per (webhook,
/// submission) pair, failures logged and isolated from sibling deliveries.
pub struct Dispatcher {
    client: reqwest::Client,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build reqwest client"),
        }
    }

    /// Transformed payload for one (webhook, submission) pair. Shared by the
    /// send and collect paths so previews match what receivers get.
    pub fn build_payload(
        webhook: &Webhook,
        submission: &Submission,
        hostname: &str,
        functions: &FnRegistry,
    ) -> Map<String, Value> {
        let canonical = canonical_payload(submission, hostname);
        transform::transform(webhook.rules(), &canonical, functions)
    }

    /// The export/preview path: transformed payloads without sending.
    pub fn collect(
        webhook: &Webhook,
        submissions: &[Submission],
        hostname: &str,
        functions: &FnRegistry,
    ) -> Vec<Map<String, Value>> {
        submissions
            .iter()
            .map(|submission| Self::build_payload(webhook, submission, hostname, functions))
            .collect()
    }

    /// Deliver every submission to every webhook. Delivery errors are logged
    /// with the target URL and never interrupt the remaining pairs.
    pub async fn send_all(
        &self,
        webhooks: &[Webhook],
        submissions: &[Submission],
        hostname: &str,
        functions: &FnRegistry,
    ) {
        for submission in submissions {
            for webhook in webhooks {
                let payload = Self::build_payload(webhook, submission, hostname, functions);
                if let Err(err) = self.send_one(webhook, &payload).await {
                    tracing::error!("{} {err}", webhook.url);
                }
            }
        }
    }

    async fn send_one(
        &self,
        webhook: &Webhook,
        payload: &Map<String, Value>,
    ) -> Result<(), String> {
        let request = match webhook.method() {
            WebhookMethod::Json => self.client.post(&webhook.url).json(payload),
            WebhookMethod::Post => self.client.post(&webhook.url).form(&form_fields(payload)),
        };

        let response = request.send().await.map_err(|err| err.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("unexpected status {status}"));
        }
        Ok(())
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn canonical_payload(submission: &Submission, hostname: &str) -> Map<String, Value> {
    let payload = SubmissionPayload {
        hostname,
        name: &submission.name,
        language: &submission.language,
        sent_at: submission.sent_at,
        form_recipients: &submission.recipients.0,
        form_data: &submission.data.0,
    };
    match serde_json::to_value(&payload) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Form-encoded bodies hold strings; non-string values go out as their
/// compact JSON text.
fn form_fields(payload: &Map<String, Value>) -> Vec<(String, String)> {
    payload
        .iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect()
}
