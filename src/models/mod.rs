pub mod form;
pub mod submission;
pub mod webhook;

pub use form::{FieldDef, FormConfig};
pub use submission::{Recipient, SerializedField, Submission};
pub use webhook::{Webhook, WebhookMethod};
