use pve_mcp::mcp::catalog::{tool_by_name, tool_catalog, validate_tool_args};
use serde_json::json;

#[test]
fn catalog_lists_every_tool() {
    let names: Vec<&str> = tool_catalog()
        .iter()
        .map(|tool| tool.name.as_str())
        .collect();
    assert_eq!(names.len(), 10);
    for expected in [
        "proxmox_container_exec_command",
        "proxmox_list_containers",
        "proxmox_container_status",
        "proxmox_start_container",
        "proxmox_stop_container",
        "proxmox_host_exec_command",
        "proxmox_download_file_from_container",
        "proxmox_upload_file_to_container",
        "proxmox_download_file_from_host",
        "proxmox_upload_file_to_host",
    ] {
        assert!(names.contains(&expected), "missing tool {}", expected);
    }
}

#[test]
fn tool_lookup_finds_known_names() {
    assert!(tool_by_name("proxmox_container_exec_command").is_some());
    assert!(tool_by_name("nonexistent_tool").is_none());
}

#[test]
fn accepts_valid_exec_arguments() {
    let args = json!({ "vmid": 100, "command": "df -h", "timeout": 60 });
    assert!(validate_tool_args("proxmox_container_exec_command", &args).is_ok());
}

#[test]
fn rejects_unknown_fields() {
    let args = json!({ "vmid": 100, "command": "ls", "bogus": true });
    assert!(validate_tool_args("proxmox_container_exec_command", &args).is_err());
}

#[test]
fn rejects_wrong_types_and_out_of_range_vmid() {
    let args = json!({ "vmid": "100", "command": "ls" });
    assert!(validate_tool_args("proxmox_container_exec_command", &args).is_err());
    let args = json!({ "vmid": 10, "command": "ls" });
    assert!(validate_tool_args("proxmox_container_exec_command", &args).is_err());
}

#[test]
fn rejects_unknown_format_values() {
    let args = json!({ "response_format": "yaml" });
    assert!(validate_tool_args("proxmox_list_containers", &args).is_err());
}

#[test]
fn unknown_tools_pass_the_schema_layer() {
    // The executor reports unknown names with suggestions; the schema layer
    // only vets tools it knows about.
    assert!(validate_tool_args("unknown_tool", &json!({})).is_ok());
}
