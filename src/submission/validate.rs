use std::collections::BTreeMap;

use serde_json::Value;

use crate::models::FieldDef;

use super::fields::value_text;

pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Validate submitted values against the form's field definitions. Returns
/// per-field error texts; an empty map means the submission is acceptable.
pub fn check_fields(defs: &[FieldDef], raw: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();

    for def in defs {
        let text = value_text(raw.get(&def.name));

        if text.is_empty() {
            if def.required {
                push(&mut errors, &def.name, "This field is required.");
            }
            continue;
        }

        if let Some(max) = def.max_length {
            let length = text.chars().count();
            if length > max {
                push(
                    &mut errors,
                    &def.name,
                    &format!(
                        "Ensure this value has at most {max} characters (it has {length})."
                    ),
                );
            }
        }

        match def.field_type.as_str() {
            "email" => {
                if !looks_like_email(&text) {
                    push(&mut errors, &def.name, "Enter a valid email address.");
                }
            }
            "number" => {
                if text.parse::<f64>().is_err() {
                    push(&mut errors, &def.name, "Enter a number.");
                }
            }
            "url" => {
                if !text.starts_with("http://") && !text.starts_with("https://") {
                    push(&mut errors, &def.name, "Enter a valid URL.");
                }
            }
            _ => {}
        }
    }

    errors
}

fn push(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
