use crate::constants::staging::{STAGING_DIR, STAGING_PREFIX};
use crate::constants::timeouts::DEFAULT_EXEC_TIMEOUT_SECS;
use crate::errors::ToolError;
use crate::services::logger::Logger;
use crate::services::session::SshSession;
use crate::services::tool_executor::ToolHandler;
use crate::services::validation::Validation;
use crate::utils::format::render_json;
use crate::utils::pct;
use crate::utils::tool_errors::unknown_tool_error;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const TRANSFER_TOOLS: &[&str] = &[
    "proxmox_download_file_from_container",
    "proxmox_upload_file_to_container",
    "proxmox_download_file_from_host",
    "proxmox_upload_file_to_host",
];

const OVERWRITE_SUGGESTION: &str =
    "Set overwrite=true to replace existing file or choose a different path";
const SIZE_SUGGESTION: &str =
    "Increase MAX_FILE_SIZE environment variable or choose a smaller file";

/// Staged file transfers between the local machine, the host staging area
/// and container namespaces. Every flow follows the same shape:
/// validate, precheck the destination, stage, hop to the target, apply
/// permissions, clean up, report. Failures at or after staging remove the
/// staging file before surfacing.
#[derive(Clone)]
pub struct TransferManager {
    logger: Logger,
    validation: Validation,
    session: Arc<SshSession>,
    max_file_size: u64,
    enable_host_exec: bool,
}

impl TransferManager {
    pub fn new(
        logger: Logger,
        validation: Validation,
        session: Arc<SshSession>,
        max_file_size: u64,
        enable_host_exec: bool,
    ) -> Self {
        Self {
            logger: logger.child("transfer"),
            validation,
            session,
            max_file_size,
            enable_host_exec,
        }
    }

    /// Container file -> host staging (`pct pull`) -> local disk.
    pub async fn download_from_container(&self, args: &Value) -> Result<String, ToolError> {
        let vmid = self.validation.ensure_vmid(args.get("vmid"))?;
        let container_path =
            match self.validation.ensure_path(args.get("container_path"), "container_path") {
                Ok(path) => path,
                Err(err) => return Ok(invalid_payload("container path", &err)),
            };
        let local_path = match self.validation.ensure_path(args.get("local_path"), "local_path") {
            Ok(path) => path,
            Err(err) => return Ok(invalid_payload("local path", &err)),
        };
        let overwrite = self.validation.ensure_flag(args.get("overwrite"), false);

        let local = PathBuf::from(&local_path);
        if local.exists() && !overwrite {
            return Ok(render_json(&serde_json::json!({
                "error": format!("Local file already exists: {}", local_path),
                "success": false,
                "suggestion": OVERWRITE_SUGGESTION,
            })));
        }

        let staging_path = generate_staging_path();
        match self
            .pull_to_local(vmid, &container_path, &local, &staging_path)
            .await
        {
            Ok(payload) => Ok(payload),
            Err(err) => {
                self.cleanup_staging(&staging_path).await;
                Ok(render_json(&serde_json::json!({
                    "error": err.message,
                    "success": false,
                })))
            }
        }
    }

    async fn pull_to_local(
        &self,
        vmid: u32,
        container_path: &str,
        local: &Path,
        staging_path: &str,
    ) -> Result<String, ToolError> {
        let pull = self
            .session
            .execute(
                &pct::pull_command(vmid, container_path, staging_path),
                DEFAULT_EXEC_TIMEOUT_SECS,
            )
            .await?;
        if pull.exit_code != 0 {
            // Staging creation itself failed, so there is nothing to remove.
            return Ok(render_json(&serde_json::json!({
                "error": format!("Failed to pull file from container {}", vmid),
                "stderr": pull.stderr,
                "success": false,
                "suggestion": "Check if container exists, is running, and file path is correct",
            })));
        }

        // Size check happens after staging: oversized files are rejected on
        // the host before they ever reach the local disk.
        let size = self
            .session
            .execute(
                &pct::host_file_size_command(staging_path),
                DEFAULT_EXEC_TIMEOUT_SECS,
            )
            .await?;
        if size.exit_code == 0 {
            let staged_bytes = size.stdout.trim().parse::<u64>().map_err(|_| {
                ToolError::execution("Unable to parse staged file size output")
            })?;
            if staged_bytes > self.max_file_size {
                self.cleanup_staging(staging_path).await;
                return Ok(size_exceeded_payload(staged_bytes, self.max_file_size));
            }
        }

        self.session.get_file(staging_path, local).await?;
        self.cleanup_staging(staging_path).await;

        let bytes_transferred = fs::metadata(local)?.len();
        Ok(render_json(&serde_json::json!({
            "success": true,
            "message": format!("File downloaded successfully from container {}", vmid),
            "vmid": vmid,
            "container_path": container_path,
            "local_path": local.display().to_string(),
            "bytes_transferred": bytes_transferred,
        })))
    }

    /// Local file -> host staging (SFTP) -> container (`pct push`), then a
    /// non-fatal chmod inside the container.
    pub async fn upload_to_container(&self, args: &Value) -> Result<String, ToolError> {
        let vmid = self.validation.ensure_vmid(args.get("vmid"))?;
        let permissions = match self.validation.ensure_permissions(args.get("permissions")) {
            Ok(perms) => perms,
            Err(err) => return Ok(invalid_payload("permissions", &err)),
        };
        let container_path =
            match self.validation.ensure_path(args.get("container_path"), "container_path") {
                Ok(path) => path,
                Err(err) => return Ok(invalid_payload("container path", &err)),
            };
        let local_path = match self.validation.ensure_path(args.get("local_path"), "local_path") {
            Ok(path) => path,
            Err(err) => return Ok(invalid_payload("local path", &err)),
        };
        let overwrite = self.validation.ensure_flag(args.get("overwrite"), false);

        let local = PathBuf::from(&local_path);
        let local_bytes = match fs::metadata(&local) {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => {
                return Ok(render_json(&serde_json::json!({
                    "error": format!("Local file not found: {}", local_path),
                    "success": false,
                    "suggestion": "Check the local file path is correct and file exists",
                })))
            }
        };
        if local_bytes > self.max_file_size {
            return Ok(size_exceeded_payload(local_bytes, self.max_file_size));
        }

        if !overwrite {
            let check = match self
                .session
                .execute(
                    &pct::container_file_exists_command(vmid, &container_path),
                    DEFAULT_EXEC_TIMEOUT_SECS,
                )
                .await
            {
                Ok(out) => out,
                Err(err) => {
                    return Ok(render_json(&serde_json::json!({
                        "error": err.message,
                        "success": false,
                    })))
                }
            };
            if check.exit_code == 0 {
                return Ok(render_json(&serde_json::json!({
                    "error": format!("File already exists in container: {}", container_path),
                    "success": false,
                    "suggestion": OVERWRITE_SUGGESTION,
                })));
            }
        }

        let staging_path = generate_staging_path();
        match self
            .push_from_local(
                vmid,
                &local,
                &container_path,
                &permissions,
                &staging_path,
                local_bytes,
            )
            .await
        {
            Ok(payload) => Ok(payload),
            Err(err) => {
                self.cleanup_staging(&staging_path).await;
                Ok(render_json(&serde_json::json!({
                    "error": err.message,
                    "success": false,
                })))
            }
        }
    }

    async fn push_from_local(
        &self,
        vmid: u32,
        local: &Path,
        container_path: &str,
        permissions: &str,
        staging_path: &str,
        local_bytes: u64,
    ) -> Result<String, ToolError> {
        self.session.put_file(local, staging_path).await?;

        let push = self
            .session
            .execute(
                &pct::push_command(vmid, staging_path, container_path),
                DEFAULT_EXEC_TIMEOUT_SECS,
            )
            .await?;
        if push.exit_code != 0 {
            self.cleanup_staging(staging_path).await;
            return Ok(render_json(&serde_json::json!({
                "error": format!("Failed to push file to container {}", vmid),
                "stderr": push.stderr,
                "success": false,
                "suggestion": "Check if container exists, is running, and destination path is valid",
            })));
        }

        // The file is already in place; a failed chmod is recorded but does
        // not fail the transfer.
        let chmod = self
            .session
            .execute(
                &pct::container_chmod_command(vmid, permissions, container_path),
                DEFAULT_EXEC_TIMEOUT_SECS,
            )
            .await;
        if !matches!(&chmod, Ok(out) if out.exit_code == 0) {
            self.logger.warn(
                "chmod failed after container upload",
                Some(&serde_json::json!({ "vmid": vmid, "permissions": permissions })),
            );
        }

        self.cleanup_staging(staging_path).await;
        Ok(render_json(&serde_json::json!({
            "success": true,
            "message": format!("File uploaded successfully to container {}", vmid),
            "vmid": vmid,
            "local_path": local.display().to_string(),
            "container_path": container_path,
            "permissions": permissions,
            "bytes_transferred": local_bytes,
        })))
    }

    /// Host file -> local disk. No staging hop: an existence/size probe via
    /// `stat` replaces the copy-out.
    pub async fn download_from_host(&self, args: &Value) -> Result<String, ToolError> {
        if !self.enable_host_exec {
            return Ok(host_ops_disabled_payload());
        }
        let host_path = match self.validation.ensure_path(args.get("host_path"), "host_path") {
            Ok(path) => path,
            Err(err) => return Ok(invalid_payload("host path", &err)),
        };
        let local_path = match self.validation.ensure_path(args.get("local_path"), "local_path") {
            Ok(path) => path,
            Err(err) => return Ok(invalid_payload("local path", &err)),
        };
        let overwrite = self.validation.ensure_flag(args.get("overwrite"), false);

        let local = PathBuf::from(&local_path);
        if local.exists() && !overwrite {
            return Ok(render_json(&serde_json::json!({
                "error": format!("Local file already exists: {}", local_path),
                "success": false,
                "suggestion": OVERWRITE_SUGGESTION,
            })));
        }

        let size = match self
            .session
            .execute(
                &pct::host_file_size_command(&host_path),
                DEFAULT_EXEC_TIMEOUT_SECS,
            )
            .await
        {
            Ok(out) => out,
            Err(err) => {
                return Ok(render_json(&serde_json::json!({
                    "error": err.message,
                    "success": false,
                })))
            }
        };
        if size.exit_code != 0 {
            return Ok(render_json(&serde_json::json!({
                "error": format!("File not found on host: {}", host_path),
                "stderr": size.stderr,
                "success": false,
                "suggestion": "Check if the host path is correct and file exists",
            })));
        }
        if let Ok(host_bytes) = size.stdout.trim().parse::<u64>() {
            if host_bytes > self.max_file_size {
                return Ok(size_exceeded_payload(host_bytes, self.max_file_size));
            }
        }

        if let Err(err) = self.session.get_file(&host_path, &local).await {
            return Ok(render_json(&serde_json::json!({
                "error": err.message,
                "success": false,
            })));
        }

        let bytes_transferred = fs::metadata(&local).map(|meta| meta.len()).unwrap_or(0);
        Ok(render_json(&serde_json::json!({
            "success": true,
            "message": "File downloaded successfully from Proxmox host",
            "host_path": host_path,
            "local_path": local_path,
            "bytes_transferred": bytes_transferred,
        })))
    }

    /// Local file -> host staging (SFTP) -> destination via `mv`, then a
    /// non-fatal chmod. Staging is the destination hop here, so both upload
    /// directions share one state machine.
    pub async fn upload_to_host(&self, args: &Value) -> Result<String, ToolError> {
        if !self.enable_host_exec {
            return Ok(host_ops_disabled_payload());
        }
        let permissions = match self.validation.ensure_permissions(args.get("permissions")) {
            Ok(perms) => perms,
            Err(err) => return Ok(invalid_payload("permissions", &err)),
        };
        let host_path = match self.validation.ensure_path(args.get("host_path"), "host_path") {
            Ok(path) => path,
            Err(err) => return Ok(invalid_payload("host path", &err)),
        };
        let local_path = match self.validation.ensure_path(args.get("local_path"), "local_path") {
            Ok(path) => path,
            Err(err) => return Ok(invalid_payload("local path", &err)),
        };
        let overwrite = self.validation.ensure_flag(args.get("overwrite"), false);

        let local = PathBuf::from(&local_path);
        let local_bytes = match fs::metadata(&local) {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => {
                return Ok(render_json(&serde_json::json!({
                    "error": format!("Local file not found: {}", local_path),
                    "success": false,
                    "suggestion": "Check the local file path is correct and file exists",
                })))
            }
        };
        if local_bytes > self.max_file_size {
            return Ok(size_exceeded_payload(local_bytes, self.max_file_size));
        }

        if !overwrite {
            let check = match self
                .session
                .execute(
                    &pct::host_file_exists_command(&host_path),
                    DEFAULT_EXEC_TIMEOUT_SECS,
                )
                .await
            {
                Ok(out) => out,
                Err(err) => {
                    return Ok(render_json(&serde_json::json!({
                        "error": err.message,
                        "success": false,
                    })))
                }
            };
            if check.exit_code == 0 {
                return Ok(render_json(&serde_json::json!({
                    "error": format!("File already exists on host: {}", host_path),
                    "success": false,
                    "suggestion": OVERWRITE_SUGGESTION,
                })));
            }
        }

        let staging_path = generate_staging_path();
        match self
            .move_into_host_place(&local, &host_path, &permissions, &staging_path, local_bytes)
            .await
        {
            Ok(payload) => Ok(payload),
            Err(err) => {
                self.cleanup_staging(&staging_path).await;
                Ok(render_json(&serde_json::json!({
                    "error": err.message,
                    "success": false,
                })))
            }
        }
    }

    async fn move_into_host_place(
        &self,
        local: &Path,
        host_path: &str,
        permissions: &str,
        staging_path: &str,
        local_bytes: u64,
    ) -> Result<String, ToolError> {
        self.session.put_file(local, staging_path).await?;

        let moved = self
            .session
            .execute(
                &pct::host_move_command(staging_path, host_path),
                DEFAULT_EXEC_TIMEOUT_SECS,
            )
            .await?;
        if moved.exit_code != 0 {
            self.cleanup_staging(staging_path).await;
            return Ok(render_json(&serde_json::json!({
                "error": "Failed to move staged file into place on host",
                "stderr": moved.stderr,
                "success": false,
                "suggestion": "Check if the destination path is valid and writable",
            })));
        }

        let chmod = self
            .session
            .execute(
                &pct::host_chmod_command(permissions, host_path),
                DEFAULT_EXEC_TIMEOUT_SECS,
            )
            .await;
        if !matches!(&chmod, Ok(out) if out.exit_code == 0) {
            self.logger.warn(
                "chmod failed after host upload",
                Some(&serde_json::json!({ "permissions": permissions })),
            );
        }

        self.cleanup_staging(staging_path).await;
        Ok(render_json(&serde_json::json!({
            "success": true,
            "message": "File uploaded successfully to Proxmox host",
            "local_path": local.display().to_string(),
            "host_path": host_path,
            "permissions": permissions,
            "bytes_transferred": local_bytes,
        })))
    }

    /// Cleanup never blocks the final report; a leaked staging file is
    /// logged and left for the host's tmp reaper.
    async fn cleanup_staging(&self, staging_path: &str) {
        if !self.session.remove_remote_file(staging_path).await {
            self.logger.warn(
                "staging file may be leaked",
                Some(&serde_json::json!({ "staging_path": staging_path })),
            );
        }
    }
}

fn generate_staging_path() -> String {
    format!(
        "{}/{}{}",
        STAGING_DIR,
        STAGING_PREFIX,
        uuid::Uuid::new_v4().simple()
    )
}

fn invalid_payload(label: &str, err: &ToolError) -> String {
    render_json(&serde_json::json!({
        "error": format!("Invalid {}: {}", label, err.message),
        "success": false,
    }))
}

fn size_exceeded_payload(bytes: u64, max_bytes: u64) -> String {
    render_json(&serde_json::json!({
        "error": format!(
            "File size ({} bytes) exceeds maximum allowed ({} bytes)",
            bytes, max_bytes
        ),
        "success": false,
        "suggestion": SIZE_SUGGESTION,
    }))
}

fn host_ops_disabled_payload() -> String {
    render_json(&serde_json::json!({
        "error": "Host file operations are DISABLED for safety",
        "success": false,
        "message": "To enable this feature, set environment variable: ENABLE_HOST_EXEC=true",
        "reason": "Host operations can affect your entire Proxmox infrastructure",
        "documentation": "See README for security considerations and best practices",
    }))
}

#[async_trait::async_trait]
impl ToolHandler for TransferManager {
    async fn handle(&self, op: &str, args: Value) -> Result<String, ToolError> {
        match op {
            "proxmox_download_file_from_container" => self.download_from_container(&args).await,
            "proxmox_upload_file_to_container" => self.upload_to_container(&args).await,
            "proxmox_download_file_from_host" => self.download_from_host(&args).await,
            "proxmox_upload_file_to_host" => self.upload_to_host(&args).await,
            _ => Err(unknown_tool_error(
                op,
                &TRANSFER_TOOLS.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            )),
        }
    }
}
