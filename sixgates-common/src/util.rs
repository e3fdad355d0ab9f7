//! Small string helpers used when logging collaborator traffic.

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Works on character boundaries, so multi-byte UTF-8 text is never split.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            let truncated = &s[..idx];
            format!("{}...", truncated.trim_end())
        }
        None => s.to_string(),
    }
}

/// Redact API keys and tokens from a string before it is logged.
pub fn sanitize_for_log(s: &str) -> String {
    let patterns: &[(&str, &str)] = &[
        (r"(?i)(api[_-]?key|apikey)=[^&\s]+", "$1=***REDACTED***"),
        (r"(?i)(x-api-key|token|secret|bearer)\s*[=:]\s*\S{10,}", "$1=***REDACTED***"),
        (r"sk-ant-[a-zA-Z0-9_-]{10,}", "***REDACTED_API_KEY***"),
    ];

    let mut result = s.to_string();
    for (pattern, replacement) in patterns {
        if let Ok(re) = regex::Regex::new(pattern) {
            result = re.replace_all(&result, *replacement).to_string();
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
        assert_eq!(truncate_with_ellipsis("hello world", 5), "hello...");
        assert_eq!(truncate_with_ellipsis("ümlaut ünïcode", 6), "ümlaut...");
    }

    #[test]
    fn test_sanitize_query_api_key() {
        let url = "https://financialmodelingprep.com/stable/quote?symbol=SPY&apikey=abc123secret";
        let clean = sanitize_for_log(url);
        assert!(!clean.contains("abc123secret"));
        assert!(clean.contains("symbol=SPY"));
    }

    #[test]
    fn test_sanitize_anthropic_key() {
        let clean = sanitize_for_log("key sk-ant-REDACTED");
        assert!(clean.contains("***REDACTED_API_KEY***"));
    }
}
