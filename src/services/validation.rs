use crate::constants::limits::{MAX_COMMAND_LENGTH, MAX_PATH_LENGTH, MAX_VMID, MIN_VMID};
use crate::constants::timeouts::{
    DEFAULT_EXEC_TIMEOUT_SECS, MAX_EXEC_TIMEOUT_SECS, MIN_EXEC_TIMEOUT_SECS,
};
use crate::errors::ToolError;
use crate::utils::format::ResponseFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static OCTAL_PERMISSIONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-7]{3,4}$").expect("octal permission pattern must compile")
});

/// Pure argument checks that run before any remote action.
#[derive(Clone, Default)]
pub struct Validation;

impl Validation {
    pub fn new() -> Self {
        Self
    }

    pub fn ensure_vmid(&self, value: Option<&Value>) -> Result<u32, ToolError> {
        let numeric = value
            .and_then(|v| v.as_u64())
            .ok_or_else(|| ToolError::validation("vmid must be an integer"))?;
        if numeric < u64::from(MIN_VMID) || numeric > u64::from(MAX_VMID) {
            return Err(ToolError::validation(format!(
                "vmid must be between {} and {}",
                MIN_VMID, MAX_VMID
            )));
        }
        Ok(numeric as u32)
    }

    pub fn ensure_command(&self, value: Option<&Value>) -> Result<String, ToolError> {
        let text = value
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::validation("command must be a string"))?;
        if text.trim().is_empty() {
            return Err(ToolError::validation("command cannot be empty"));
        }
        if text.chars().count() > MAX_COMMAND_LENGTH {
            return Err(ToolError::validation(format!(
                "command exceeds maximum length of {} characters",
                MAX_COMMAND_LENGTH
            )));
        }
        Ok(text.to_string())
    }

    /// Out-of-range values are clamped into [1, 300] rather than rejected.
    pub fn ensure_timeout(&self, value: Option<&Value>) -> u64 {
        value
            .and_then(|v| v.as_i64())
            .map(|secs| {
                (secs.max(0) as u64).clamp(MIN_EXEC_TIMEOUT_SECS, MAX_EXEC_TIMEOUT_SECS)
            })
            .unwrap_or(DEFAULT_EXEC_TIMEOUT_SECS)
    }

    /// Rejects empty paths, parent-directory references and oversized paths.
    /// This guards against traversal notation only; symlink and permission
    /// escapes are left to the remote filesystem.
    pub fn ensure_path(&self, value: Option<&Value>, label: &str) -> Result<String, ToolError> {
        let text = value
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::validation(format!("{} must be a string", label)))?;
        if text.trim().is_empty() {
            return Err(ToolError::validation("Path cannot be empty"));
        }
        if text.contains("..") {
            return Err(ToolError::validation(
                "Path cannot contain '..' (path traversal not allowed)",
            ));
        }
        if text.chars().count() > MAX_PATH_LENGTH {
            return Err(ToolError::validation(format!(
                "Path exceeds maximum length of {} characters",
                MAX_PATH_LENGTH
            )));
        }
        Ok(text.to_string())
    }

    pub fn ensure_permissions(&self, value: Option<&Value>) -> Result<String, ToolError> {
        let text = match value {
            None => return Ok("644".to_string()),
            Some(Value::Null) => return Ok("644".to_string()),
            Some(val) => val
                .as_str()
                .ok_or_else(|| ToolError::validation("Permissions must be a string"))?,
        };
        if text.is_empty() {
            return Err(ToolError::validation("Permissions cannot be empty"));
        }
        if !OCTAL_PERMISSIONS.is_match(text) {
            return Err(ToolError::validation(
                "Permissions must be a valid octal string (e.g., '644', '755', '0644')",
            ));
        }
        Ok(text.to_string())
    }

    pub fn ensure_format(
        &self,
        value: Option<&Value>,
        default: ResponseFormat,
    ) -> Result<ResponseFormat, ToolError> {
        let text = match value {
            None => return Ok(default),
            Some(Value::Null) => return Ok(default),
            Some(val) => val
                .as_str()
                .ok_or_else(|| ToolError::validation("response_format must be a string"))?,
        };
        ResponseFormat::parse(text)
    }

    pub fn ensure_flag(&self, value: Option<&Value>, default: bool) -> bool {
        value.and_then(|v| v.as_bool()).unwrap_or(default)
    }
}
