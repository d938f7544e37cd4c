use uuid::Uuid;

pub const ROOM_TOKEN_LENGTH: usize = 8;

/// Transport endpoint id: 32 lowercase hex characters.
pub fn new_endpoint_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Shareable room token: the first eight characters of the endpoint id, uppercased.
pub fn derive_room_token(endpoint_id: &str) -> String {
    endpoint_id
        .chars()
        .take(ROOM_TOKEN_LENGTH)
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Normalizes a typed-in token into the endpoint id prefix it stands for.
pub fn decode_room_token(token: &str) -> Option<String> {
    let token = token.trim();
    if token.len() != ROOM_TOKEN_LENGTH || !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(token.to_ascii_lowercase())
}
