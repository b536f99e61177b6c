use serde::Serialize;

/// Escape embedded single quotes so arbitrary text survives inside a
/// single-quoted shell argument: close the quote, emit an escaped literal
/// quote, reopen. No sandboxing — metacharacters reach the shell verbatim.
pub fn escape_single_quotes(command: &str) -> String {
    command.replace('\'', "'\\''")
}

/// Wrap a value in single quotes for use as one shell word.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", escape_single_quotes(value))
}

/// The exact command line that runs `command` inside container `vmid`.
pub fn container_exec_command(vmid: u32, command: &str) -> String {
    format!(
        "pct exec {} -- bash -c '{}'",
        vmid,
        escape_single_quotes(command)
    )
}

pub fn pull_command(vmid: u32, container_path: &str, staging_path: &str) -> String {
    format!(
        "pct pull {} {} {}",
        vmid,
        shell_quote(container_path),
        shell_quote(staging_path)
    )
}

pub fn push_command(vmid: u32, staging_path: &str, container_path: &str) -> String {
    format!(
        "pct push {} {} {}",
        vmid,
        shell_quote(staging_path),
        shell_quote(container_path)
    )
}

pub fn container_file_exists_command(vmid: u32, container_path: &str) -> String {
    format!("pct exec {} -- test -f {}", vmid, shell_quote(container_path))
}

pub fn container_chmod_command(vmid: u32, permissions: &str, container_path: &str) -> String {
    format!(
        "pct exec {} -- chmod {} {}",
        vmid,
        permissions,
        shell_quote(container_path)
    )
}

pub fn host_file_size_command(path: &str) -> String {
    format!("stat -c%s {}", shell_quote(path))
}

pub fn host_file_exists_command(path: &str) -> String {
    format!("test -f {}", shell_quote(path))
}

pub fn host_chmod_command(permissions: &str, path: &str) -> String {
    format!("chmod {} {}", permissions, shell_quote(path))
}

pub fn host_move_command(from: &str, to: &str) -> String {
    format!("mv {} {}", shell_quote(from), shell_quote(to))
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContainerEntry {
    pub vmid: u32,
    pub status: String,
    pub name: String,
}

/// Parse `pct list` output: a header line followed by
/// `VMID Status [Lock] Name` rows.
pub fn parse_list_output(output: &str) -> Vec<ContainerEntry> {
    let lines: Vec<&str> = output.trim().lines().collect();
    if lines.len() < 2 {
        return Vec::new();
    }
    let mut containers = Vec::new();
    for line in &lines[1..] {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }
        let Ok(vmid) = parts[0].parse::<u32>() else {
            continue;
        };
        containers.push(ContainerEntry {
            vmid,
            status: parts[1].to_string(),
            name: parts[2].to_string(),
        });
    }
    containers
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Running,
    Stopped,
    Unknown,
}

impl ContainerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContainerStatus::Running => "running",
            ContainerStatus::Stopped => "stopped",
            ContainerStatus::Unknown => "unknown",
        }
    }

    /// Parse `pct status` output (e.g. "status: running").
    pub fn from_output(output: &str) -> Self {
        let normalized = output.trim().to_lowercase();
        if normalized.contains("running") {
            ContainerStatus::Running
        } else if normalized.contains("stopped") {
            ContainerStatus::Stopped
        } else {
            ContainerStatus::Unknown
        }
    }
}
