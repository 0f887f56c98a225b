//! Response envelope normalization
//!
//! The upstream API wraps every payload in an envelope of the form
//! `{code, data, warnings, debug, message}` where:
//! - `code` is a string status code, `"200"` meaning success
//! - `warnings` is an optional list of non-fatal entries
//! - `debug` (or `info`) is an optional diagnostics object
//! - `message` is a string or a list of entries, present on failure
//!
//! Entries are either plain strings or `{type, message, file, line}`
//! objects. This module turns that into one canonical [`NormalizedOutcome`].

use serde::Serialize;
use serde_json::Value;

use crate::common::truncate_chars;

/// Status code the upstream API uses for success
pub const SUCCESS_CODE: &str = "200";

/// Canonical decomposition of a response envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedOutcome {
    /// True iff the envelope code is `"200"`
    pub ok: bool,
    /// Envelope code as text, if present
    pub code: Option<String>,
    /// Payload, `null` if absent
    pub data: Value,
    /// Non-fatal warnings, flattened to text
    pub warnings: Vec<String>,
    /// Diagnostics object, passed through
    pub info: Option<Value>,
    /// Displayable failure reason, set iff `ok` is false
    pub error_text: Option<String>,
}

/// Normalize a parsed response body
///
/// `context` names the call in the fallback error text.
pub fn normalize(body: &Value, context: &str) -> NormalizedOutcome {
    let code = body.get("code").and_then(code_text);
    let ok = code.as_deref() == Some(SUCCESS_CODE);

    let warnings = body
        .get("warnings")
        .map(flatten_entries)
        .unwrap_or_default();

    let info = body
        .get("debug")
        .or_else(|| body.get("info"))
        .filter(|v| !v.is_null())
        .cloned();

    let error_text = if ok {
        None
    } else {
        let messages = body
            .get("message")
            .or_else(|| body.get("messages"))
            .or_else(|| body.get("error"))
            .map(flatten_entries)
            .unwrap_or_default();
        if messages.is_empty() {
            Some(format!(
                "{}: code={}",
                context,
                code.as_deref().unwrap_or("missing")
            ))
        } else {
            Some(messages.join("; "))
        }
    };

    NormalizedOutcome {
        ok,
        code,
        data: body.get("data").cloned().unwrap_or(Value::Null),
        warnings,
        info,
        error_text,
    }
}

/// Parse a raw response body, or describe why it could not be parsed
///
/// The error keeps the first `preview_chars` characters of the body.
pub fn parse_body(raw: &str, context: &str, preview_chars: usize) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|_| {
        let preview = truncate_chars(raw.trim(), preview_chars);
        if preview.is_empty() {
            format!("{}: response is not valid JSON (empty body)", context)
        } else {
            format!("{}: response is not valid JSON: {}", context, preview)
        }
    })
}

fn code_text(code: &Value) -> Option<String> {
    match code {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn flatten_entries(entries: &Value) -> Vec<String> {
    match entries {
        Value::Array(items) => items.iter().filter_map(entry_text).collect(),
        other => entry_text(other).into_iter().collect(),
    }
}

fn entry_text(entry: &Value) -> Option<String> {
    match entry {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => {
            let message = map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| entry.to_string());
            let mut text = match map.get("type").and_then(Value::as_str) {
                Some(kind) if !kind.is_empty() => format!("[{}] {}", kind, message),
                _ => message,
            };
            if let Some(file) = map.get("file").and_then(Value::as_str) {
                match map.get("line").filter(|l| !l.is_null()) {
                    Some(line) => text.push_str(&format!(" ({}:{})", file, line)),
                    None => text.push_str(&format!(" ({})", file)),
                }
            }
            Some(text)
        }
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope() {
        let out = normalize(&json!({"code": "200", "data": {"id": 1}}), "case");
        assert!(out.ok);
        assert_eq!(out.data, json!({"id": 1}));
        assert_eq!(out.error_text, None);
    }

    #[test]
    fn test_missing_data_is_null() {
        let out = normalize(&json!({"code": "200"}), "case");
        assert!(out.ok);
        assert_eq!(out.data, Value::Null);
    }

    #[test]
    fn test_warnings_never_affect_ok() {
        let body = json!({
            "code": "200",
            "data": [],
            "warnings": [
                "deprecated field",
                {"type": "notice", "message": "slow query", "file": "q.php", "line": 12}
            ]
        });
        let out = normalize(&body, "case");
        assert!(out.ok);
        assert_eq!(
            out.warnings,
            vec!["deprecated field", "[notice] slow query (q.php:12)"]
        );
    }

    #[test]
    fn test_failure_joins_messages() {
        let body = json!({
            "code": "403",
            "message": [{"type": "error", "message": "forbidden"}, "role required"]
        });
        let out = normalize(&body, "case");
        assert!(!out.ok);
        assert_eq!(
            out.error_text.as_deref(),
            Some("[error] forbidden; role required")
        );
    }

    #[test]
    fn test_failure_with_string_message() {
        let out = normalize(&json!({"code": "500", "message": "boom"}), "case");
        assert_eq!(out.error_text.as_deref(), Some("boom"));
    }

    #[test]
    fn test_failure_without_messages_falls_back_to_code() {
        let out = normalize(&json!({"code": "404"}), "Get profile");
        assert!(!out.ok);
        assert_eq!(out.error_text.as_deref(), Some("Get profile: code=404"));

        let out = normalize(&json!({"data": 1}), "Get profile");
        assert_eq!(out.error_text.as_deref(), Some("Get profile: code=missing"));
    }

    #[test]
    fn test_numeric_code_is_compared_as_text() {
        assert!(normalize(&json!({"code": 200}), "case").ok);
        assert!(!normalize(&json!({"code": 201}), "case").ok);
    }

    #[test]
    fn test_debug_info_passes_through() {
        let out = normalize(&json!({"code": "200", "debug": {"sql": "select 1"}}), "case");
        assert_eq!(out.info, Some(json!({"sql": "select 1"})));
    }

    #[test]
    fn test_parse_body_truncates_raw_text() {
        let err = parse_body("<html>Fatal error in index.php</html>", "case", 12).unwrap_err();
        assert_eq!(err, "case: response is not valid JSON: <html>Fatal …");

        assert!(parse_body("", "case", 12).unwrap_err().contains("empty body"));
        assert_eq!(parse_body(r#"{"a":1}"#, "case", 12).unwrap(), json!({"a": 1}));
    }
}
