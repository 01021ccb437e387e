//! Structured-output extraction from free-form completions

use regex::Regex;
use serde::de::DeserializeOwned;

/// Pulls the JSON payload out of a completion that may wrap it in a markdown
/// fence or surround it with prose.
pub fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();

    if let Some(start_idx) = trimmed.find("```") {
        let after_fence = &trimmed[start_idx + 3..];
        let after_lang = after_fence
            .strip_prefix("json")
            .unwrap_or(after_fence);
        if let Some(end_idx) = after_lang.find("```") {
            return after_lang[..end_idx].trim();
        }
    }

    if let Some(start) = trimmed.find(['{', '[']) {
        let closer = if trimmed[start..].starts_with('{') { '}' } else { ']' };
        if let Some(end) = trimmed.rfind(closer) {
            if end > start {
                return &trimmed[start..=end];
            }
        }
    }

    trimmed
}

/// Parses a completion into `T`, tolerating trailing commas
pub fn parse_json_response<T: DeserializeOwned>(content: &str) -> Result<T, serde_json::Error> {
    let payload = extract_json(content);
    match serde_json::from_str(payload) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let trailing_comma = Regex::new(r",(\s*[}\]])").expect("valid regex");
            let fixed = trailing_comma.replace_all(payload, "$1");
            serde_json::from_str(&fixed).map_err(|_| first_err)
        }
    }
}
