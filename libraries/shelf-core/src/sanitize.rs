//! Filesystem-safe text for path components

use crate::UNKNOWN_TRACK;

/// Sanitize a single path component for filesystem safety
///
/// Characters that are invalid on common filesystems (`\ / : * ? " < > |` and
/// control characters) become `-`. Returns `fallback` when nothing usable is
/// left, or when the result would be a relative directory reference.
pub fn sanitize_component(value: &str, fallback: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();

    let trimmed = sanitized.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Normalize a raw track field
///
/// The first integer found is zero-padded to two digits (`"3/12"` -> `"03"`).
/// Raw text without digits is kept (sanitized); empty input yields `"00"`.
pub fn format_track(raw: &str) -> String {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        return sanitize_component(raw, UNKNOWN_TRACK);
    }

    match digits.parse::<u64>() {
        Ok(number) => format!("{:02}", number),
        Err(_) => digits,
    }
}
