use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Long key id (16), v4 fingerprint (40) or v5/v6 fingerprint (64).
    static ref FINGERPRINT_RE: Regex =
        Regex::new(r"^(?:[0-9A-Fa-f]{16}|[0-9A-Fa-f]{40}|[0-9A-Fa-f]{64})$").unwrap();
}

/// Strips spaces and an optional `0x` prefix, uppercases, and validates.
pub fn normalize_fingerprint(input: &str) -> Option<String> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let compact = compact
        .strip_prefix("0x")
        .or_else(|| compact.strip_prefix("0X"))
        .unwrap_or(&compact);
    if FINGERPRINT_RE.is_match(compact) {
        Some(compact.to_ascii_uppercase())
    } else {
        None
    }
}

/// Groups a fingerprint in blocks of five characters for display.
pub fn beautify_fingerprint(fingerprint: &str) -> String {
    let mut out = String::with_capacity(fingerprint.len() + fingerprint.len() / 5);
    for (i, c) in fingerprint.chars().enumerate() {
        if i != 0 && i % 5 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}
