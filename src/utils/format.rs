use crate::constants::limits::{JSON_STRUCTURE_OVERHEAD, MIN_PAYLOAD_CHARS};
use crate::errors::ToolError;
use crate::utils::text::{char_len, truncate_chars};
use serde_json::Value;

/// Output shape selector, closed at the boundary: unknown strings never make
/// it past validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Text,
}

impl ResponseFormat {
    pub fn parse(value: &str) -> Result<Self, ToolError> {
        match value.trim().to_lowercase().as_str() {
            "json" => Ok(ResponseFormat::Json),
            "text" => Ok(ResponseFormat::Text),
            other => Err(ToolError::validation(format!(
                "Unknown response_format: {}",
                other
            ))
            .with_hint("Use one of: json, text.")),
        }
    }
}

pub fn render_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Encode captured command output within the character budget.
///
/// The JSON shape truncates each stream before assembly so the result stays
/// parseable no matter how hard it is shortened; the text shape assembles
/// first and cuts the whole block, since plain text has no structure to
/// protect.
pub fn format_exec_output(
    stdout: &str,
    stderr: &str,
    exit_code: i64,
    format: ResponseFormat,
    max_chars: usize,
) -> String {
    match format {
        ResponseFormat::Json => format_json_output(stdout, stderr, exit_code, max_chars),
        ResponseFormat::Text => format_text_output(stdout, stderr, exit_code, max_chars),
    }
}

fn format_json_output(stdout: &str, stderr: &str, exit_code: i64, max_chars: usize) -> String {
    // Reserve room for the structural characters and metadata fields, with a
    // floor so a tiny configured budget still leaves payload space.
    let available = std::cmp::max(
        max_chars.saturating_sub(JSON_STRUCTURE_OVERHEAD),
        MIN_PAYLOAD_CHARS,
    );

    let stdout_original_len = char_len(stdout);
    let stderr_original_len = char_len(stderr);
    let total_len = stdout_original_len + stderr_original_len;

    let mut stdout_out = stdout.to_string();
    let mut stderr_out = stderr.to_string();
    let mut stdout_truncated = false;
    let mut stderr_truncated = false;

    if total_len > available {
        // Split the available space proportionally to the original lengths:
        // the stream carrying most of the output keeps most of the space.
        let (stdout_limit, stderr_limit) = if total_len > 0 {
            (
                available * stdout_original_len / total_len,
                available * stderr_original_len / total_len,
            )
        } else {
            (available / 2, available / 2)
        };
        if stdout_original_len > stdout_limit {
            stdout_out = truncate_chars(stdout, stdout_limit);
            stdout_truncated = true;
        }
        if stderr_original_len > stderr_limit {
            stderr_out = truncate_chars(stderr, stderr_limit);
            stderr_truncated = true;
        }
    }

    let mut result = serde_json::Map::new();
    result.insert("exit_code".to_string(), Value::from(exit_code));
    result.insert("stdout".to_string(), Value::String(stdout_out));
    result.insert("stderr".to_string(), Value::String(stderr_out));
    result.insert("success".to_string(), Value::Bool(exit_code == 0));
    if stdout_truncated {
        result.insert("stdout_truncated".to_string(), Value::Bool(true));
        result.insert(
            "stdout_original_length".to_string(),
            Value::from(stdout_original_len),
        );
    }
    if stderr_truncated {
        result.insert("stderr_truncated".to_string(), Value::Bool(true));
        result.insert(
            "stderr_original_length".to_string(),
            Value::from(stderr_original_len),
        );
    }
    render_json(&Value::Object(result))
}

fn format_text_output(stdout: &str, stderr: &str, exit_code: i64, max_chars: usize) -> String {
    let mut parts = Vec::new();
    if !stdout.is_empty() {
        parts.push(format!("=== STDOUT ===\n{}", stdout));
    }
    if !stderr.is_empty() {
        parts.push(format!("=== STDERR ===\n{}", stderr));
    }
    parts.push(format!("=== EXIT CODE: {} ===", exit_code));
    truncate_output(&parts.join("\n\n"), max_chars)
}

/// Cut `output` to the budget and note how much of it was shown. Used for
/// the text shape and for non-command output such as listings.
pub fn truncate_output(output: &str, max_chars: usize) -> String {
    let total = char_len(output);
    if total <= max_chars {
        return output.to_string();
    }
    format!(
        "{}\n\n[OUTPUT TRUNCATED - showing first {} of {} characters]",
        truncate_chars(output, max_chars),
        max_chars,
        total
    )
}

/// Error payload for the exec tools, shaped to the requested format.
pub fn exec_error_payload(error: &str, format: ResponseFormat, suggestion: &str) -> String {
    match format {
        ResponseFormat::Json => render_json(&serde_json::json!({
            "error": error,
            "success": false,
            "suggestion": suggestion,
        })),
        ResponseFormat::Text => {
            format!("Error: {}\n\nSuggestion: {}", error, suggestion)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_format_accepts_known_values() {
        assert_eq!(ResponseFormat::parse("json").ok(), Some(ResponseFormat::Json));
        assert_eq!(ResponseFormat::parse("TEXT").ok(), Some(ResponseFormat::Text));
        assert!(ResponseFormat::parse("yaml").is_err());
    }

    #[test]
    fn text_output_omits_empty_sections() {
        let out = format_exec_output("hello", "", 0, ResponseFormat::Text, 1000);
        assert!(out.contains("=== STDOUT ===\nhello"));
        assert!(!out.contains("=== STDERR ==="));
        assert!(out.ends_with("=== EXIT CODE: 0 ==="));
    }

    #[test]
    fn json_output_is_untouched_when_it_fits() {
        let out = format_exec_output("short", "err", 2, ResponseFormat::Json, 25_000);
        let parsed: Value = serde_json::from_str(&out).expect("valid JSON");
        assert_eq!(parsed["stdout"], "short");
        assert_eq!(parsed["stderr"], "err");
        assert_eq!(parsed["exit_code"], 2);
        assert_eq!(parsed["success"], false);
        assert!(parsed.get("stdout_truncated").is_none());
    }

    #[test]
    fn truncate_output_reports_true_length() {
        let long = "x".repeat(120);
        let out = truncate_output(&long, 100);
        assert!(out.starts_with(&"x".repeat(100)));
        assert!(out.contains("showing first 100 of 120 characters"));
    }
}
