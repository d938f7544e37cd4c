pub const MAX_PLAYER_NAME_LENGTH: usize = 20;
pub const DEFAULT_PLAYER_NAME: &str = "Player";

/// Collapses whitespace and caps the length. Blank names become `fallback`.
pub fn sanitize_player_name(name: &str, fallback: &str) -> String {
    let cleaned = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return fallback.to_string();
    }
    cleaned.chars().take(MAX_PLAYER_NAME_LENGTH).collect()
}

pub fn player_name_or_default(name: Option<&str>) -> String {
    sanitize_player_name(name.unwrap_or_default(), DEFAULT_PLAYER_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_truncates() {
        assert_eq!(sanitize_player_name("  Ana   Lee ", "x"), "Ana Lee");
        let long = "a".repeat(40);
        assert_eq!(
            sanitize_player_name(&long, "x").chars().count(),
            MAX_PLAYER_NAME_LENGTH
        );
    }

    #[test]
    fn blank_names_fall_back() {
        assert_eq!(player_name_or_default(None), DEFAULT_PLAYER_NAME);
        assert_eq!(player_name_or_default(Some("   ")), DEFAULT_PLAYER_NAME);
        assert_eq!(player_name_or_default(Some("Zed")), "Zed");
    }
}
