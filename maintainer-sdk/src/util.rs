//! Utility module for common functionality

use once_cell::sync::Lazy;
use regex::Regex;

static SECRET_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)bearer\s+[A-Za-z0-9\-_.=]+", "Bearer [REDACTED]"),
        (r"(?i)(token|api[_-]?key)[=:]\s*[A-Za-z0-9\-_.]+", "$1=[REDACTED]"),
        (r"(?i)(password|secret)[=:]\s*[^\s&]+", "$1=[REDACTED]"),
        (r"sk-[A-Za-z0-9\-_]{8,}", "sk-[REDACTED]"),
        (r"gh[pousr]_[A-Za-z0-9]{16,}", "gh_[REDACTED]"),
        (r"github_pat_[A-Za-z0-9_]{16,}", "github_pat_[REDACTED]"),
        (
            r"-----BEGIN [A-Z ]*PRIVATE KEY-----[\s\S]*?-----END [A-Z ]*PRIVATE KEY-----",
            "[REDACTED PRIVATE KEY]",
        ),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

/// Truncate a string to a maximum number of characters, adding an ellipsis if truncated
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }

    if max_chars <= 3 {
        return s.chars().take(max_chars).collect();
    }

    let mut truncated: String = s.chars().take(max_chars - 3).collect();
    truncated.push_str("...");
    truncated
}

/// Remove credential material (bearer tokens, API keys, private keys) from a
/// message before it is logged or returned to a caller
pub fn sanitize_for_logging(s: &str) -> String {
    SECRET_PATTERNS
        .iter()
        .fold(s.to_string(), |acc, (re, replacement)| {
            re.replace_all(&acc, *replacement).into_owned()
        })
}
