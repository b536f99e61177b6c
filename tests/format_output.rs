use pve_mcp::utils::format::{format_exec_output, truncate_output, ResponseFormat};
use serde_json::Value;

fn char_len(value: &str) -> usize {
    value.chars().count()
}

#[test]
fn json_split_is_proportional_to_original_lengths() {
    // available space = 1500 - 500 overhead = 1000; stdout carries 90% of
    // the combined output, so it keeps ~900 of those characters.
    let stdout = "a".repeat(9000);
    let stderr = "b".repeat(1000);
    let out = format_exec_output(&stdout, &stderr, 0, ResponseFormat::Json, 1500);

    let parsed: Value = serde_json::from_str(&out).expect("truncated output must stay valid JSON");
    assert_eq!(char_len(parsed["stdout"].as_str().unwrap()), 900);
    assert_eq!(char_len(parsed["stderr"].as_str().unwrap()), 100);
    assert_eq!(parsed["stdout_truncated"], true);
    assert_eq!(parsed["stderr_truncated"], true);
    assert_eq!(parsed["stdout_original_length"], 9000);
    assert_eq!(parsed["stderr_original_length"], 1000);
    assert_eq!(parsed["exit_code"], 0);
    assert_eq!(parsed["success"], true);
    assert!(char_len(&out) <= 1500);
}

#[test]
fn json_stays_within_budget_for_oversized_output() {
    let stdout = "x".repeat(60_000);
    let stderr = "y".repeat(2_000);
    let out = format_exec_output(&stdout, &stderr, 1, ResponseFormat::Json, 25_000);

    let parsed: Value = serde_json::from_str(&out).expect("must parse");
    assert_eq!(parsed["success"], false);
    assert!(char_len(&out) <= 25_000);
}

#[test]
fn json_survives_a_degenerate_budget() {
    // A budget below the structural overhead still leaves the payload floor,
    // so the result is valid JSON rather than garbage.
    let stdout = "z".repeat(5_000);
    let out = format_exec_output(&stdout, "", 0, ResponseFormat::Json, 100);
    let parsed: Value = serde_json::from_str(&out).expect("must parse");
    assert_eq!(char_len(parsed["stdout"].as_str().unwrap()), 1000);
    assert_eq!(parsed["stdout_truncated"], true);
}

#[test]
fn json_handles_empty_streams_without_division() {
    let out = format_exec_output("", "", 0, ResponseFormat::Json, 100);
    let parsed: Value = serde_json::from_str(&out).expect("must parse");
    assert_eq!(parsed["stdout"], "");
    assert_eq!(parsed["stderr"], "");
    assert!(parsed.get("stdout_truncated").is_none());
    assert!(parsed.get("stderr_truncated").is_none());
}

#[test]
fn json_leaves_fitting_streams_untouched() {
    let stdout = "a".repeat(50);
    let stderr = "b".repeat(20);
    let out = format_exec_output(&stdout, &stderr, 0, ResponseFormat::Json, 25_000);
    let parsed: Value = serde_json::from_str(&out).expect("must parse");
    assert_eq!(parsed["stdout"].as_str().unwrap(), stdout);
    assert_eq!(parsed["stderr"].as_str().unwrap(), stderr);
    assert!(parsed.get("stdout_original_length").is_none());
}

#[test]
fn text_assembles_then_truncates_with_note() {
    let stdout = "q".repeat(300);
    let out = format_exec_output(&stdout, "", 0, ResponseFormat::Text, 100);
    let assembled_len = char_len(&format!("=== STDOUT ===\n{}\n\n=== EXIT CODE: 0 ===", stdout));
    assert!(out.starts_with("=== STDOUT ===\n"));
    assert!(out.contains(&format!(
        "[OUTPUT TRUNCATED - showing first 100 of {} characters]",
        assembled_len
    )));
}

#[test]
fn text_includes_both_sections_and_exit_trailer() {
    let out = format_exec_output("out", "err", 3, ResponseFormat::Text, 1000);
    assert_eq!(
        out,
        "=== STDOUT ===\nout\n\n=== STDERR ===\nerr\n\n=== EXIT CODE: 3 ==="
    );
}

#[test]
fn truncate_output_is_identity_under_budget() {
    assert_eq!(truncate_output("short", 100), "short");
}

#[test]
fn truncate_output_appends_note_over_budget() {
    let long = "n".repeat(150);
    let out = truncate_output(&long, 100);
    assert!(out.starts_with(&"n".repeat(100)));
    assert!(out.ends_with("[OUTPUT TRUNCATED - showing first 100 of 150 characters]"));
}
