use crate::constants::timeouts::DEFAULT_EXEC_TIMEOUT_SECS;
use crate::errors::ToolError;
use crate::services::logger::Logger;
use crate::services::session::SshSession;
use crate::services::tool_executor::ToolHandler;
use crate::services::validation::Validation;
use crate::utils::format::{
    exec_error_payload, format_exec_output, render_json, truncate_output, ResponseFormat,
};
use crate::utils::pct::{self, ContainerStatus};
use crate::utils::tool_errors::unknown_tool_error;
use serde_json::Value;
use std::sync::Arc;

pub const CONTAINER_TOOLS: &[&str] = &[
    "proxmox_container_exec_command",
    "proxmox_list_containers",
    "proxmox_container_status",
    "proxmox_start_container",
    "proxmox_stop_container",
];

const EXEC_SUGGESTION: &str =
    "Check if the container exists and is running using 'proxmox_list_containers'";

/// Container operations, all routed through the host's `pct` tool.
#[derive(Clone)]
pub struct ContainerManager {
    logger: Logger,
    validation: Validation,
    session: Arc<SshSession>,
    character_limit: usize,
}

impl ContainerManager {
    pub fn new(
        logger: Logger,
        validation: Validation,
        session: Arc<SshSession>,
        character_limit: usize,
    ) -> Self {
        Self {
            logger: logger.child("container"),
            validation,
            session,
            character_limit,
        }
    }

    /// Run a bash command inside a container. The command text is embedded in
    /// a single-quoted argument so it reaches the container shell unaltered.
    pub async fn exec_command(&self, args: &Value) -> Result<String, ToolError> {
        let format = self
            .validation
            .ensure_format(args.get("response_format"), ResponseFormat::Text)?;
        let vmid = self.validation.ensure_vmid(args.get("vmid"))?;
        let command = self.validation.ensure_command(args.get("command"))?;
        let timeout = self.validation.ensure_timeout(args.get("timeout"));

        let pct_command = pct::container_exec_command(vmid, &command);
        match self.session.execute(&pct_command, timeout).await {
            Ok(out) => Ok(format_exec_output(
                &out.stdout,
                &out.stderr,
                out.exit_code,
                format,
                self.character_limit,
            )),
            Err(err) => Ok(exec_error_payload(&err.message, format, EXEC_SUGGESTION)),
        }
    }

    pub async fn list_containers(&self, args: &Value) -> Result<String, ToolError> {
        let format = self
            .validation
            .ensure_format(args.get("response_format"), ResponseFormat::Json)?;
        let out = match self
            .session
            .execute("pct list", DEFAULT_EXEC_TIMEOUT_SECS)
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
        if out.exit_code != 0 {
            return Ok(render_json(&serde_json::json!({
                "error": "Failed to list containers",
                "stderr": out.stderr,
                "success": false,
            })));
        }

        let containers = pct::parse_list_output(&out.stdout);
        let rendered = match format {
            ResponseFormat::Json => render_json(
                &serde_json::to_value(&containers).unwrap_or_else(|_| Value::Array(Vec::new())),
            ),
            ResponseFormat::Text => {
                if containers.is_empty() {
                    "No containers found".to_string()
                } else {
                    let mut lines = vec!["VMID | Status | Name".to_string(), "-".repeat(40)];
                    for entry in &containers {
                        lines.push(format!(
                            "{:>4} | {:<7} | {}",
                            entry.vmid, entry.status, entry.name
                        ));
                    }
                    lines.join("\n")
                }
            }
        };
        Ok(truncate_output(&rendered, self.character_limit))
    }

    pub async fn container_status(&self, args: &Value) -> Result<String, ToolError> {
        let format = self
            .validation
            .ensure_format(args.get("response_format"), ResponseFormat::Json)?;
        let vmid = self.validation.ensure_vmid(args.get("vmid"))?;

        let out = match self
            .session
            .execute(&format!("pct status {}", vmid), DEFAULT_EXEC_TIMEOUT_SECS)
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
        if out.exit_code != 0 {
            return Ok(render_json(&serde_json::json!({
                "error": format!("Container {} not found or error occurred", vmid),
                "stderr": out.stderr,
                "success": false,
                "suggestion": "Use 'proxmox_list_containers' to see available containers",
            })));
        }

        let status = ContainerStatus::from_output(&out.stdout);
        Ok(match format {
            ResponseFormat::Json => {
                render_json(&serde_json::json!({ "status": status.as_str() }))
            }
            ResponseFormat::Text => format!("Container {} is {}", vmid, status.as_str()),
        })
    }

    /// Idempotent: an already-running container reports success without
    /// invoking `pct start`, which would exit nonzero.
    pub async fn start_container(&self, args: &Value) -> Result<String, ToolError> {
        let vmid = self.validation.ensure_vmid(args.get("vmid"))?;
        match self.probe_status(vmid).await {
            Ok(Some(ContainerStatus::Running)) => {
                return Ok(render_json(&serde_json::json!({
                    "success": true,
                    "message": format!("Container {} is already running", vmid),
                    "vmid": vmid,
                })));
            }
            Ok(_) => {}
            Err(err) => {
                return Ok(render_json(&serde_json::json!({
                    "error": err.message,
                    "success": false,
                })))
            }
        }

        let out = match self
            .session
            .execute(&format!("pct start {}", vmid), DEFAULT_EXEC_TIMEOUT_SECS)
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
        if out.exit_code != 0 {
            return Ok(render_json(&serde_json::json!({
                "error": format!("Failed to start container {}", vmid),
                "stderr": out.stderr,
                "success": false,
                "suggestion": "Check if container exists using 'proxmox_list_containers'",
            })));
        }
        self.logger
            .info("container started", Some(&serde_json::json!({ "vmid": vmid })));
        Ok(render_json(&serde_json::json!({
            "success": true,
            "message": format!("Container {} started successfully", vmid),
            "vmid": vmid,
        })))
    }

    /// Idempotent counterpart to `start_container`.
    pub async fn stop_container(&self, args: &Value) -> Result<String, ToolError> {
        let vmid = self.validation.ensure_vmid(args.get("vmid"))?;
        match self.probe_status(vmid).await {
            Ok(Some(ContainerStatus::Stopped)) => {
                return Ok(render_json(&serde_json::json!({
                    "success": true,
                    "message": format!("Container {} is already stopped", vmid),
                    "vmid": vmid,
                })));
            }
            Ok(_) => {}
            Err(err) => {
                return Ok(render_json(&serde_json::json!({
                    "error": err.message,
                    "success": false,
                })))
            }
        }

        let out = match self
            .session
            .execute(&format!("pct stop {}", vmid), DEFAULT_EXEC_TIMEOUT_SECS)
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
        if out.exit_code != 0 {
            return Ok(render_json(&serde_json::json!({
                "error": format!("Failed to stop container {}", vmid),
                "stderr": out.stderr,
                "success": false,
                "suggestion": "Check if container exists and is running using 'proxmox_container_status'",
            })));
        }
        self.logger
            .info("container stopped", Some(&serde_json::json!({ "vmid": vmid })));
        Ok(render_json(&serde_json::json!({
            "success": true,
            "message": format!("Container {} stopped successfully", vmid),
            "vmid": vmid,
        })))
    }

    /// `None` when the status query fails (e.g. unknown vmid); the lifecycle
    /// command then runs and reports its own error.
    async fn probe_status(&self, vmid: u32) -> Result<Option<ContainerStatus>, ToolError> {
        let out = self
            .session
            .execute(&format!("pct status {}", vmid), DEFAULT_EXEC_TIMEOUT_SECS)
            .await?;
        if out.exit_code != 0 {
            return Ok(None);
        }
        Ok(Some(ContainerStatus::from_output(&out.stdout)))
    }
}

#[async_trait::async_trait]
impl ToolHandler for ContainerManager {
    async fn handle(&self, op: &str, args: Value) -> Result<String, ToolError> {
        match op {
            "proxmox_container_exec_command" => self.exec_command(&args).await,
            "proxmox_list_containers" => self.list_containers(&args).await,
            "proxmox_container_status" => self.container_status(&args).await,
            "proxmox_start_container" => self.start_container(&args).await,
            "proxmox_stop_container" => self.stop_container(&args).await,
            _ => Err(unknown_tool_error(
                op,
                &CONTAINER_TOOLS.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            )),
        }
    }
}
