use pve_mcp::services::validation::Validation;
use pve_mcp::utils::format::ResponseFormat;
use serde_json::{json, Value};

fn validation() -> Validation {
    Validation::new()
}

#[test]
fn path_accepts_absolute_config_path() {
    let path = validation()
        .ensure_path(Some(&json!("/etc/pve/storage.cfg")), "host_path")
        .expect("valid path");
    assert_eq!(path, "/etc/pve/storage.cfg");
}

#[test]
fn path_rejects_traversal() {
    let err = validation()
        .ensure_path(Some(&json!("../etc/passwd")), "host_path")
        .unwrap_err();
    assert!(err.message.contains("path traversal"));
}

#[test]
fn path_rejects_empty_and_whitespace() {
    assert!(validation().ensure_path(Some(&json!("")), "p").is_err());
    assert!(validation().ensure_path(Some(&json!("   ")), "p").is_err());
    assert!(validation().ensure_path(None, "p").is_err());
}

#[test]
fn path_rejects_overlong_values() {
    let long = "/".to_string() + &"a".repeat(4999);
    let err = validation()
        .ensure_path(Some(&json!(long)), "p")
        .unwrap_err();
    assert!(err.message.contains("maximum length of 4096"));
}

#[test]
fn permissions_accept_three_and_four_digit_octal() {
    assert_eq!(
        validation().ensure_permissions(Some(&json!("644"))).unwrap(),
        "644"
    );
    assert_eq!(
        validation().ensure_permissions(Some(&json!("0755"))).unwrap(),
        "0755"
    );
}

#[test]
fn permissions_default_when_absent() {
    assert_eq!(validation().ensure_permissions(None).unwrap(), "644");
    assert_eq!(
        validation().ensure_permissions(Some(&Value::Null)).unwrap(),
        "644"
    );
}

#[test]
fn permissions_reject_non_octal_values() {
    assert!(validation().ensure_permissions(Some(&json!("abc"))).is_err());
    assert!(validation()
        .ensure_permissions(Some(&json!("65536")))
        .is_err());
    assert!(validation().ensure_permissions(Some(&json!(""))).is_err());
    assert!(validation().ensure_permissions(Some(&json!("64"))).is_err());
}

#[test]
fn vmid_enforces_proxmox_range() {
    assert_eq!(validation().ensure_vmid(Some(&json!(100))).unwrap(), 100);
    assert_eq!(
        validation().ensure_vmid(Some(&json!(999_999_999))).unwrap(),
        999_999_999
    );
    assert!(validation().ensure_vmid(Some(&json!(99))).is_err());
    assert!(validation().ensure_vmid(Some(&json!("100"))).is_err());
    assert!(validation().ensure_vmid(None).is_err());
}

#[test]
fn timeout_is_clamped_not_rejected() {
    assert_eq!(validation().ensure_timeout(None), 30);
    assert_eq!(validation().ensure_timeout(Some(&json!(150))), 150);
    assert_eq!(validation().ensure_timeout(Some(&json!(500))), 300);
    assert_eq!(validation().ensure_timeout(Some(&json!(0))), 1);
    assert_eq!(validation().ensure_timeout(Some(&json!(-5))), 1);
}

#[test]
fn command_rejects_empty_and_oversized_text() {
    assert!(validation().ensure_command(Some(&json!(""))).is_err());
    assert!(validation().ensure_command(None).is_err());
    let oversized = "x".repeat(10_001);
    assert!(validation().ensure_command(Some(&json!(oversized))).is_err());
    assert_eq!(
        validation().ensure_command(Some(&json!("df -h"))).unwrap(),
        "df -h"
    );
}

#[test]
fn format_falls_back_to_the_tool_default() {
    assert_eq!(
        validation()
            .ensure_format(None, ResponseFormat::Text)
            .unwrap(),
        ResponseFormat::Text
    );
    assert_eq!(
        validation()
            .ensure_format(Some(&json!("json")), ResponseFormat::Text)
            .unwrap(),
        ResponseFormat::Json
    );
    assert!(validation()
        .ensure_format(Some(&json!("yaml")), ResponseFormat::Text)
        .is_err());
}
