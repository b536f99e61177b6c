use crate::constants::limits::{DEFAULT_CHARACTER_LIMIT, DEFAULT_MAX_FILE_SIZE};
use crate::constants::network::SSH_DEFAULT_PORT;
use crate::errors::ToolError;
use crate::services::session::SshTarget;
use std::path::PathBuf;

/// Connection and policy configuration, read once at startup from the
/// environment. `validate` must pass before the config is used.
#[derive(Debug, Clone)]
pub struct PveConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub key_path: Option<PathBuf>,
    pub accept_risks: bool,
    pub enable_host_exec: bool,
    pub character_limit: usize,
    pub max_file_size: u64,
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(name: &str) -> bool {
    env_string(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn env_number<T: std::str::FromStr>(name: &str, fallback: T) -> T {
    env_string(name)
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(fallback)
}

impl PveConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_string("HOST").unwrap_or_default(),
            port: env_number("SSH_PORT", SSH_DEFAULT_PORT),
            username: env_string("SSH_USERNAME").unwrap_or_else(|| "root".to_string()),
            password: env_string("SSH_PASSWORD"),
            key_path: env_string("SSH_KEY").map(PathBuf::from),
            accept_risks: env_flag("I_ACCEPT_RISKS"),
            enable_host_exec: env_flag("ENABLE_HOST_EXEC"),
            character_limit: env_number("CHARACTER_LIMIT", DEFAULT_CHARACTER_LIMIT),
            max_file_size: env_number("MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE),
        }
    }

    pub fn validate(&self) -> Result<(), ToolError> {
        // Risk acceptance is checked before anything else.
        if !self.accept_risks {
            return Err(ToolError::validation(
                "You must explicitly accept the risks before using this software. \
                 Set environment variable: I_ACCEPT_RISKS=true",
            )
            .with_hint(
                "By setting I_ACCEPT_RISKS=true you acknowledge that you understand the risks \
                 of giving an AI system SSH access to your infrastructure, that you are solely \
                 responsible for reviewing commands, and that you have backups in place.",
            ));
        }
        if self.host.is_empty() {
            return Err(ToolError::validation("HOST environment variable is required")
                .with_hint(required_env_summary()));
        }
        if self.password.is_none() && self.key_path.is_none() {
            return Err(
                ToolError::validation("Either SSH_PASSWORD or SSH_KEY must be set")
                    .with_hint(required_env_summary()),
            );
        }
        Ok(())
    }

    pub fn target(&self) -> SshTarget {
        SshTarget {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            key_path: self.key_path.clone(),
        }
    }
}

fn required_env_summary() -> String {
    [
        "Required environment variables:",
        "  I_ACCEPT_RISKS - must be 'true' to acknowledge risks",
        "  HOST - Proxmox host IP or hostname",
        "  SSH_USERNAME - SSH username (default: root)",
        "  SSH_PORT - SSH port (default: 22)",
        "  SSH_PASSWORD - SSH password (or use SSH_KEY)",
        "  SSH_KEY - path to SSH private key (or use SSH_PASSWORD)",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> PveConfig {
        PveConfig {
            host: "pve.example".to_string(),
            port: 22,
            username: "root".to_string(),
            password: Some("secret".to_string()),
            key_path: None,
            accept_risks: true,
            enable_host_exec: false,
            character_limit: DEFAULT_CHARACTER_LIMIT,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    #[test]
    fn rejects_without_risk_acceptance() {
        let mut config = base_config();
        config.accept_risks = false;
        let err = config.validate().unwrap_err();
        assert!(err.message.contains("I_ACCEPT_RISKS"));
    }

    #[test]
    fn rejects_missing_host() {
        let mut config = base_config();
        config.host = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_missing_credentials() {
        let mut config = base_config();
        config.password = None;
        config.key_path = None;
        let err = config.validate().unwrap_err();
        assert!(err.message.contains("SSH_PASSWORD"));
    }

    #[test]
    fn accepts_key_only_credentials() {
        let mut config = base_config();
        config.password = None;
        config.key_path = Some(PathBuf::from("/root/.ssh/id_ed25519"));
        assert!(config.validate().is_ok());
    }
}
