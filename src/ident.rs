use serde_json::Value;

/// Name of the hidden field / query parameter carrying the correlation token.
pub const POST_IDENT_FIELD: &str = "form_post_ident";

/// Tokens are 32 random bytes hex-encoded, so exactly this long.
pub const POST_IDENT_LEN: usize = 64;

/// Generate a fresh correlation token from OS entropy.
///
/// The token is the join key for multi-step posts and is attacker-visible, so
/// it must be unguessable.
pub fn new_post_ident() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Extract and sanity-check a client-presented token from submitted data.
/// Anything that is not a well-formed token is treated as absent rather than
/// an error, so malformed probes get the same response as fresh submissions.
pub fn from_submitted_data(raw: &Value) -> Option<String> {
    let token = raw.get(POST_IDENT_FIELD)?.as_str()?;
    if token.len() != POST_IDENT_LEN || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(token.to_string())
}
