use crate::errors::ToolError;
use crate::services::logger::Logger;
use crate::services::session::SshSession;
use crate::services::tool_executor::ToolHandler;
use crate::services::validation::Validation;
use crate::utils::format::{exec_error_payload, format_exec_output, render_json, ResponseFormat};
use crate::utils::tool_errors::unknown_tool_error;
use serde_json::Value;
use std::sync::Arc;

pub const HOST_TOOLS: &[&str] = &["proxmox_host_exec_command"];

const EXEC_SUGGESTION: &str = "Check if the command is valid and you have necessary permissions";

/// Direct command execution on the hypervisor, disabled unless the operator
/// opted in via ENABLE_HOST_EXEC.
#[derive(Clone)]
pub struct HostManager {
    logger: Logger,
    validation: Validation,
    session: Arc<SshSession>,
    enable_host_exec: bool,
    character_limit: usize,
}

impl HostManager {
    pub fn new(
        logger: Logger,
        validation: Validation,
        session: Arc<SshSession>,
        enable_host_exec: bool,
        character_limit: usize,
    ) -> Self {
        Self {
            logger: logger.child("host"),
            validation,
            session,
            enable_host_exec,
            character_limit,
        }
    }

    /// The command text is passed to the host shell unmodified; there is no
    /// wrapping and no filtering.
    pub async fn exec_command(&self, args: &Value) -> Result<String, ToolError> {
        if !self.enable_host_exec {
            return Ok(render_json(&serde_json::json!({
                "error": "Host command execution is DISABLED for safety",
                "success": false,
                "message": "To enable this feature, set environment variable: ENABLE_HOST_EXEC=true",
                "reason": "This feature can affect your entire Proxmox infrastructure and is disabled by default",
                "documentation": "See README for security considerations and best practices",
            })));
        }

        let format = self
            .validation
            .ensure_format(args.get("response_format"), ResponseFormat::Text)?;
        let command = self.validation.ensure_command(args.get("command"))?;
        let timeout = self.validation.ensure_timeout(args.get("timeout"));

        self.logger.warn(
            "host exec",
            Some(&serde_json::json!({ "timeout_secs": timeout })),
        );
        match self.session.execute(&command, timeout).await {
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
}

#[async_trait::async_trait]
impl ToolHandler for HostManager {
    async fn handle(&self, op: &str, args: Value) -> Result<String, ToolError> {
        match op {
            "proxmox_host_exec_command" => self.exec_command(&args).await,
            _ => Err(unknown_tool_error(
                op,
                &HOST_TOOLS.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            )),
        }
    }
}
