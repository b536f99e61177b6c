use pve_mcp::managers::transfer::TransferManager;
use pve_mcp::services::logger::Logger;
use pve_mcp::services::session::{SshSession, SshTarget};
use pve_mcp::services::validation::Validation;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

const TEN_MIB: u64 = 10 * 1024 * 1024;

// A session that was constructed but never connected. Any attempt to reach
// the remote shows up both in call_count() and as a not-connected failure,
// so precondition checks can prove they short-circuit before remote I/O.
fn offline_session() -> Arc<SshSession> {
    Arc::new(SshSession::new(
        Logger::new("test"),
        SshTarget {
            host: "198.51.100.7".to_string(),
            port: 22,
            username: "root".to_string(),
            password: Some("unused".to_string()),
            key_path: None,
        },
    ))
}

fn manager(session: Arc<SshSession>, max_file_size: u64, enable_host_exec: bool) -> TransferManager {
    TransferManager::new(
        Logger::new("test"),
        Validation::new(),
        session,
        max_file_size,
        enable_host_exec,
    )
}

fn tmp_file(prefix: &str, contents: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
    std::fs::write(&path, contents).expect("write temp file");
    path
}

fn parse(payload: &str) -> Value {
    serde_json::from_str(payload).expect("payload must be JSON")
}

#[tokio::test]
async fn download_refuses_existing_destination_without_remote_calls() {
    let session = offline_session();
    let manager = manager(session.clone(), TEN_MIB, false);
    let local = tmp_file("pve-mcp-dl", b"present");

    let result = manager
        .download_from_container(&serde_json::json!({
            "vmid": 100,
            "container_path": "/etc/hosts",
            "local_path": local.to_string_lossy(),
        }))
        .await
        .expect("tool result");

    let payload = parse(&result);
    assert_eq!(payload["success"], false);
    assert!(payload["error"]
        .as_str()
        .unwrap()
        .contains("already exists"));
    assert!(payload["suggestion"]
        .as_str()
        .unwrap()
        .contains("overwrite=true"));
    assert_eq!(session.call_count(), 0);

    let _ = std::fs::remove_file(&local);
}

#[tokio::test]
async fn upload_rejects_oversized_file_before_staging() {
    let session = offline_session();
    let manager = manager(session.clone(), 4, false);
    let local = tmp_file("pve-mcp-up", b"0123456789");

    let result = manager
        .upload_to_container(&serde_json::json!({
            "vmid": 101,
            "local_path": local.to_string_lossy(),
            "container_path": "/root/data.bin",
        }))
        .await
        .expect("tool result");

    let payload = parse(&result);
    assert_eq!(payload["success"], false);
    assert!(payload["error"]
        .as_str()
        .unwrap()
        .contains("exceeds maximum allowed"));
    assert_eq!(session.call_count(), 0);

    let _ = std::fs::remove_file(&local);
}

#[tokio::test]
async fn upload_rejects_missing_local_file() {
    let session = offline_session();
    let manager = manager(session.clone(), TEN_MIB, false);
    let missing = std::env::temp_dir().join(format!("pve-mcp-missing-{}", uuid::Uuid::new_v4()));

    let result = manager
        .upload_to_container(&serde_json::json!({
            "vmid": 101,
            "local_path": missing.to_string_lossy(),
            "container_path": "/root/data.bin",
        }))
        .await
        .expect("tool result");

    let payload = parse(&result);
    assert_eq!(payload["success"], false);
    assert!(payload["error"]
        .as_str()
        .unwrap()
        .contains("Local file not found"));
    assert_eq!(session.call_count(), 0);
}

#[tokio::test]
async fn download_rejects_traversal_paths() {
    let session = offline_session();
    let manager = manager(session.clone(), TEN_MIB, false);

    let result = manager
        .download_from_container(&serde_json::json!({
            "vmid": 100,
            "container_path": "../etc/passwd",
            "local_path": "./passwd",
        }))
        .await
        .expect("tool result");

    let payload = parse(&result);
    assert_eq!(payload["success"], false);
    assert!(payload["error"]
        .as_str()
        .unwrap()
        .contains("Invalid container path"));
    assert_eq!(session.call_count(), 0);
}

#[tokio::test]
async fn upload_rejects_invalid_permissions() {
    let session = offline_session();
    let manager = manager(session.clone(), TEN_MIB, false);
    let local = tmp_file("pve-mcp-perms", b"data");

    let result = manager
        .upload_to_container(&serde_json::json!({
            "vmid": 101,
            "local_path": local.to_string_lossy(),
            "container_path": "/root/data.bin",
            "permissions": "abc",
        }))
        .await
        .expect("tool result");

    let payload = parse(&result);
    assert_eq!(payload["success"], false);
    assert!(payload["error"]
        .as_str()
        .unwrap()
        .contains("Invalid permissions"));
    assert_eq!(session.call_count(), 0);

    let _ = std::fs::remove_file(&local);
}

#[tokio::test]
async fn host_transfers_are_gated_behind_host_exec() {
    let session = offline_session();
    let manager = manager(session.clone(), TEN_MIB, false);
    let local = tmp_file("pve-mcp-host", b"data");

    let download = manager
        .download_from_host(&serde_json::json!({
            "host_path": "/etc/pve/storage.cfg",
            "local_path": "./storage.cfg",
        }))
        .await
        .expect("tool result");
    let payload = parse(&download);
    assert_eq!(payload["success"], false);
    assert!(payload["error"].as_str().unwrap().contains("DISABLED"));

    let upload = manager
        .upload_to_host(&serde_json::json!({
            "local_path": local.to_string_lossy(),
            "host_path": "/root/data.bin",
        }))
        .await
        .expect("tool result");
    let payload = parse(&upload);
    assert_eq!(payload["success"], false);
    assert!(payload["error"].as_str().unwrap().contains("DISABLED"));

    assert_eq!(session.call_count(), 0);

    let _ = std::fs::remove_file(&local);
}

#[tokio::test]
async fn host_download_checks_local_destination_before_remote() {
    let session = offline_session();
    let manager = manager(session.clone(), TEN_MIB, true);
    let local = tmp_file("pve-mcp-host-dl", b"present");

    let result = manager
        .download_from_host(&serde_json::json!({
            "host_path": "/etc/pve/storage.cfg",
            "local_path": local.to_string_lossy(),
        }))
        .await
        .expect("tool result");

    let payload = parse(&result);
    assert_eq!(payload["success"], false);
    assert!(payload["error"]
        .as_str()
        .unwrap()
        .contains("already exists"));
    assert_eq!(session.call_count(), 0);

    let _ = std::fs::remove_file(&local);
}
