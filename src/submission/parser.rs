use axum::http::HeaderMap;
use serde_json::{Map, Value};

/// Parse a request body based on the Content-Type header. Visitors post
/// JSON, urlencoded forms, or multipart text fields interchangeably.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Result<Value, String> {
    let ct = content_type.unwrap_or("application/json");

    if ct.contains("application/json") {
        serde_json::from_slice(body).map_err(|e| format!("Invalid JSON: {e}"))
    } else if ct.contains("application/x-www-form-urlencoded") {
        parse_form_urlencoded(body)
    } else if ct.contains("multipart/form-data") {
        Err("multipart".to_string())
    } else {
        serde_json::from_slice(body)
            .or_else(|_| parse_form_urlencoded(body))
            .map_err(|e| format!("Unable to parse body: {e}"))
    }
}

/// Repeated keys (checkbox groups, multi-selects) collect into arrays.
fn parse_form_urlencoded(body: &[u8]) -> Result<Value, String> {
    let body_str = std::str::from_utf8(body).map_err(|e| format!("Invalid UTF-8: {e}"))?;

    let mut map = Map::new();
    for (key, value) in form_urlencoded::parse(body_str.as_bytes()) {
        push_value(&mut map, key.into_owned(), value.into_owned());
    }
    Ok(Value::Object(map))
}

/// Parse multipart form data. Only text parts are taken; file parts are out
/// of scope for storage and are recorded by filename.
pub async fn parse_multipart(headers: &HeaderMap, body: bytes::Bytes) -> Result<Value, String> {
    let boundary = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| "Missing multipart boundary".to_string())?;

    let stream = futures_util::stream::once(async { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut map = Map::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Multipart error: {e}"))?
    {
        let name = field.name().unwrap_or("unknown").to_string();
        let value = match field.file_name() {
            Some(file_name) => file_name.to_string(),
            None => field
                .text()
                .await
                .map_err(|e| format!("Field read error: {e}"))?,
        };
        push_value(&mut map, name, value);
    }

    Ok(Value::Object(map))
}

fn push_value(map: &mut Map<String, Value>, key: String, value: String) {
    match map.get_mut(&key) {
        None => {
            map.insert(key, Value::String(value));
        }
        Some(Value::Array(items)) => {
            items.push(Value::String(value));
        }
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, Value::String(value)]);
        }
    }
}
