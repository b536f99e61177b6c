pub mod network {
    pub const SSH_DEFAULT_PORT: u16 = 22;
    pub const TIMEOUT_SSH_READY_MS: u64 = 10_000;
    pub const KEEPALIVE_INTERVAL_MS: u64 = 30_000;
    pub const EXEC_POLL_INTERVAL_MS: u64 = 20;
}

pub mod limits {
    pub const DEFAULT_CHARACTER_LIMIT: usize = 25_000;
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
    pub const MAX_COMMAND_LENGTH: usize = 10_000;
    pub const MAX_PATH_LENGTH: usize = 4_096;
    pub const MIN_VMID: u32 = 100;
    pub const MAX_VMID: u32 = 999_999_999;
    pub const JSON_STRUCTURE_OVERHEAD: usize = 500;
    pub const MIN_PAYLOAD_CHARS: usize = 1_000;
}

pub mod timeouts {
    pub const MIN_EXEC_TIMEOUT_SECS: u64 = 1;
    pub const MAX_EXEC_TIMEOUT_SECS: u64 = 300;
    pub const DEFAULT_EXEC_TIMEOUT_SECS: u64 = 30;
}

pub mod staging {
    pub const STAGING_DIR: &str = "/tmp";
    pub const STAGING_PREFIX: &str = "pve-mcp-";
}
