use chrono::Utc;

/// RFC3339 timestamp in UTC (for logs and stored records).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

/// Cut `s` to at most `max_len` characters, marking the cut with `...`.
pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

/// Split a `/command@bot args` message into the lowercased command and its argument text.
pub fn parse_command(text: &str) -> (String, String) {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_text_counts_chars() {
        assert_eq!(truncate_text("héllo", 10), "héllo");
        assert_eq!(truncate_text("héllo", 2), "hé...");
    }

    #[test]
    fn parse_command_strips_bot_name_and_keeps_args() {
        assert_eq!(
            parse_command("/Broadcast@review_bot  New issue is out!\nRead it."),
            (
                "broadcast".to_string(),
                "New issue is out!\nRead it.".to_string()
            )
        );
        assert_eq!(parse_command("/start"), ("start".to_string(), String::new()));
    }
}
