use serde_json::Value;

/// Check whether the form's hidden honeypot field carries a value. A filled
/// honeypot marks the submission as automated.
pub fn is_filled(data: &Value, honeypot_field: Option<&str>) -> bool {
    let Some(field) = honeypot_field else {
        return false;
    };

    if field.is_empty() {
        return false;
    }

    match data.get(field) {
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}
