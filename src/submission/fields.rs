use std::collections::HashMap;

use serde_json::Value;

use crate::models::{FieldDef, SerializedField};

/// Serialize submitted values in field-definition order.
///
/// `prior` holds already-accumulated data of the same logical submission
/// (multi-step appends); occurrence numbering continues past it so repeated
/// field names stay distinguishable across steps.
pub fn serialize_fields(
    defs: &[FieldDef],
    raw: &Value,
    prior: &[SerializedField],
) -> Vec<SerializedField> {
    let mut occurrences: HashMap<&str, u32> = HashMap::new();
    for field in prior {
        let entry = occurrences.entry(field.name.as_str()).or_insert(0);
        *entry = (*entry).max(field.field_occurrence);
    }

    defs.iter()
        .map(|def| {
            let counter = occurrences.entry(def.name.as_str()).or_insert(0);
            *counter += 1;
            SerializedField {
                name: def.name.clone(),
                label: def.display_label().to_string(),
                field_occurrence: *counter,
                value: value_text(raw.get(&def.name)),
            }
        })
        .collect()
}

/// Textual form of one submitted value. Multi-value answers join with a
/// comma, matching how they are rendered in notification emails.
pub fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}
