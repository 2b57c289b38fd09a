use crate::models::SerializedField;

/// Plain-text notification body listing the submitted answers.
pub fn render_notification(form_name: &str, fields: &[SerializedField]) -> String {
    let mut body = format!("A new submission of the form \"{form_name}\" arrived.\n\n");
    for field in fields {
        body.push_str(&format!("{}: {}\n", field.label, field.value));
    }
    body
}

pub fn notification_subject(form_name: &str) -> String {
    format!("New submission: {form_name}")
}
