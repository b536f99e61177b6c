use crate::constants::network as network_constants;
use crate::errors::ToolError;
use crate::services::logger::Logger;
use ssh2::{OpenFlags, OpenType, Session};
use std::fs;
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Where and how to reach the Proxmox host. Key auth wins over password when
/// both are present.
#[derive(Clone, Debug)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub key_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
}

struct Connected {
    session: Session,
    // Created on first file transfer, dropped before the session.
    sftp: Option<ssh2::Sftp>,
}

/// One authenticated SSH channel per process. All remote traffic is
/// serialized through the interior mutex, including the SFTP sub-channel.
#[derive(Clone)]
pub struct SshSession {
    logger: Logger,
    target: SshTarget,
    state: Arc<Mutex<Option<Connected>>>,
    remote_calls: Arc<AtomicU64>,
}

impl SshSession {
    pub fn new(logger: Logger, target: SshTarget) -> Self {
        Self {
            logger: logger.child("ssh"),
            target,
            state: Arc::new(Mutex::new(None)),
            remote_calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of remote operations attempted over the channel. Precondition
    /// failures that never reach the host leave this untouched.
    pub fn call_count(&self) -> u64 {
        self.remote_calls.load(Ordering::Relaxed)
    }

    pub fn is_connected(&self) -> bool {
        lock_state_guard(&self.state).is_some()
    }

    /// Establish the channel. A second call while connected is a no-op; a
    /// failed attempt leaves the session disconnected.
    pub async fn connect(&self) -> Result<(), ToolError> {
        let state = self.state.clone();
        let target = self.target.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = lock_state_guard(&state);
            if guard.is_some() {
                return Ok(());
            }
            let session = open_session(&target)?;
            *guard = Some(Connected {
                session,
                sftp: None,
            });
            Ok(())
        })
        .await
        .map_err(|_| ToolError::internal("SSH connect task failed"))?
    }

    /// Release the SFTP sub-channel first, then the session. Safe to call
    /// when not connected.
    pub async fn disconnect(&self) {
        let state = self.state.clone();
        let _ = tokio::task::spawn_blocking(move || {
            let mut guard = lock_state_guard(&state);
            if let Some(mut connected) = guard.take() {
                connected.sftp.take();
                let _ = connected
                    .session
                    .disconnect(None, "session closed", None);
            }
        })
        .await;
    }

    /// Run one command line on the host and capture its output. Timeout
    /// expiry surfaces as an execution error, matching the channel's own
    /// behavior of failing rather than reporting a distinct status.
    pub async fn execute(
        &self,
        command: &str,
        timeout_secs: u64,
    ) -> Result<ExecOutput, ToolError> {
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
        self.logger.debug(
            "execute",
            Some(&serde_json::json!({ "timeout_secs": timeout_secs })),
        );
        let state = self.state.clone();
        let command = command.to_string();
        tokio::task::spawn_blocking(move || {
            let mut guard = lock_state_guard(&state);
            let connected = guard.as_mut().ok_or_else(not_connected_error)?;
            exec_blocking(&connected.session, &command, timeout_secs)
        })
        .await
        .map_err(|_| ToolError::internal("SSH exec task failed"))?
    }

    /// Byte-for-byte copy from the host to the local filesystem, via a
    /// temp sibling that is renamed into place once complete.
    pub async fn get_file(&self, remote_path: &str, local_path: &Path) -> Result<(), ToolError> {
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
        let state = self.state.clone();
        let remote = remote_path.to_string();
        let local = local_path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let mut guard = lock_state_guard(&state);
            let connected = guard.as_mut().ok_or_else(not_connected_error)?;
            let sftp = ensure_sftp(connected)?;
            let mut remote_file = sftp.open(Path::new(&remote)).map_err(|err| {
                ToolError::transfer(format!("Failed to download file from {}: {}", remote, err))
            })?;
            let tmp_path = local.with_extension(format!("tmp-{}", rand::random::<u32>()));
            let mut tmp_file = fs::File::create(&tmp_path).map_err(|err| {
                ToolError::transfer(format!("Failed to create local file: {}", err))
            })?;
            if let Err(err) = std::io::copy(&mut remote_file, &mut tmp_file) {
                let _ = fs::remove_file(&tmp_path);
                return Err(ToolError::transfer(format!(
                    "Failed to download file from {}: {}",
                    remote, err
                )));
            }
            drop(tmp_file);
            if let Err(err) = fs::rename(&tmp_path, &local) {
                let _ = fs::remove_file(&tmp_path);
                return Err(ToolError::transfer(format!(
                    "Failed to finalize download: {}",
                    err
                )));
            }
            Ok(())
        })
        .await
        .map_err(|_| ToolError::internal("SSH download task failed"))?
    }

    /// Byte-for-byte copy from the local filesystem to the host.
    pub async fn put_file(&self, local_path: &Path, remote_path: &str) -> Result<(), ToolError> {
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
        let state = self.state.clone();
        let local = local_path.to_path_buf();
        let remote = remote_path.to_string();
        tokio::task::spawn_blocking(move || {
            let mut guard = lock_state_guard(&state);
            let connected = guard.as_mut().ok_or_else(not_connected_error)?;
            let sftp = ensure_sftp(connected)?;
            let mut local_file = fs::File::open(&local).map_err(|err| {
                ToolError::transfer(format!(
                    "Failed to upload file to {}: {}",
                    remote, err
                ))
            })?;
            let mut remote_file = sftp
                .open_mode(
                    Path::new(&remote),
                    OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
                    0o644,
                    OpenType::File,
                )
                .map_err(|err| {
                    ToolError::transfer(format!("Failed to upload file to {}: {}", remote, err))
                })?;
            std::io::copy(&mut local_file, &mut remote_file).map_err(|err| {
                ToolError::transfer(format!("Failed to upload file to {}: {}", remote, err))
            })?;
            Ok(())
        })
        .await
        .map_err(|_| ToolError::internal("SSH upload task failed"))?
    }

    /// Best-effort removal of a host file. Exists for staging cleanup and
    /// never errors; the return value may be ignored.
    pub async fn remove_remote_file(&self, remote_path: &str) -> bool {
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
        let state = self.state.clone();
        let remote = remote_path.to_string();
        tokio::task::spawn_blocking(move || {
            let mut guard = lock_state_guard(&state);
            let Some(connected) = guard.as_mut() else {
                return false;
            };
            let Ok(sftp) = ensure_sftp(connected) else {
                return false;
            };
            sftp.unlink(Path::new(&remote)).is_ok()
        })
        .await
        .unwrap_or(false)
    }
}

fn not_connected_error() -> ToolError {
    ToolError::not_connected("SSH session not connected. Call connect() first.")
}

fn lock_state_guard(
    state: &Arc<Mutex<Option<Connected>>>,
) -> std::sync::MutexGuard<'_, Option<Connected>> {
    state.lock().unwrap_or_else(|err| err.into_inner())
}

fn ensure_sftp(connected: &mut Connected) -> Result<&ssh2::Sftp, ToolError> {
    if connected.sftp.is_none() {
        let sftp = connected.session.sftp().map_err(|err| {
            ToolError::transfer(format!("Failed to open SFTP channel: {}", err))
        })?;
        connected.sftp = Some(sftp);
    }
    connected
        .sftp
        .as_ref()
        .ok_or_else(|| ToolError::internal("SFTP channel unavailable"))
}

fn open_session(target: &SshTarget) -> Result<Session, ToolError> {
    let addr = format!("{}:{}", target.host, target.port);
    let resolved = addr
        .to_socket_addrs()
        .map_err(|err| {
            ToolError::connection(format!(
                "Failed to connect to Proxmox host {}: {}",
                target.host, err
            ))
        })?
        .next()
        .ok_or_else(|| {
            ToolError::connection(format!(
                "Failed to connect to Proxmox host {}: address did not resolve",
                target.host
            ))
        })?;
    let ready_timeout = Duration::from_millis(network_constants::TIMEOUT_SSH_READY_MS);
    let tcp = TcpStream::connect_timeout(&resolved, ready_timeout).map_err(|err| {
        ToolError::connection(format!(
            "Failed to connect to Proxmox host {}: {}",
            target.host, err
        ))
    })?;
    tcp.set_read_timeout(Some(ready_timeout)).ok();
    tcp.set_write_timeout(Some(ready_timeout)).ok();

    let mut session = Session::new().map_err(|err| {
        ToolError::connection(format!(
            "Failed to connect to Proxmox host {}: {}",
            target.host, err
        ))
    })?;
    session.set_tcp_stream(tcp);
    session.handshake().map_err(|err| {
        ToolError::connection(format!(
            "Failed to connect to Proxmox host {}: {}",
            target.host, err
        ))
    })?;

    if let Some(key_path) = target.key_path.as_ref() {
        session
            .userauth_pubkey_file(&target.username, None, key_path, None)
            .map_err(|err| {
                ToolError::connection(format!(
                    "Failed to connect to Proxmox host {}: key auth failed: {}",
                    target.host, err
                ))
            })?;
    } else if let Some(password) = target.password.as_ref() {
        session
            .userauth_password(&target.username, password)
            .map_err(|err| {
                ToolError::connection(format!(
                    "Failed to connect to Proxmox host {}: password auth failed: {}",
                    target.host, err
                ))
            })?;
    }

    if !session.authenticated() {
        return Err(ToolError::connection(format!(
            "Failed to connect to Proxmox host {}: authentication failed",
            target.host
        )));
    }
    let interval =
        std::cmp::max(1, (network_constants::KEEPALIVE_INTERVAL_MS / 1000) as u32);
    session.set_keepalive(true, interval);
    Ok(session)
}

fn exec_blocking(
    session: &Session,
    command: &str,
    timeout_secs: u64,
) -> Result<ExecOutput, ToolError> {
    let mut channel = session.channel_session().map_err(|err| {
        ToolError::execution(format!("Failed to open exec channel: {}", err))
    })?;
    channel.exec(command).map_err(|err| {
        ToolError::execution(format!("Failed to execute command: {}", err))
    })?;
    session.set_blocking(false);

    let started = Instant::now();
    let timeout = Duration::from_secs(timeout_secs);
    let poll = Duration::from_millis(network_constants::EXEC_POLL_INTERVAL_MS);
    let mut stdout_buf: Vec<u8> = Vec::new();
    let mut stderr_buf: Vec<u8> = Vec::new();

    loop {
        let mut progressed = false;
        let mut buf = [0u8; 8192];
        match channel.read(&mut buf) {
            Ok(n) if n > 0 => {
                stdout_buf.extend_from_slice(&buf[..n]);
                progressed = true;
            }
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(err) => {
                session.set_blocking(true);
                return Err(ToolError::execution(format!(
                    "Failed to execute command: stdout read failed: {}",
                    err
                )));
            }
        }
        {
            let mut stderr_stream = channel.stderr();
            match stderr_stream.read(&mut buf) {
                Ok(n) if n > 0 => {
                    stderr_buf.extend_from_slice(&buf[..n]);
                    progressed = true;
                }
                Ok(_) => {}
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(err) => {
                    session.set_blocking(true);
                    return Err(ToolError::execution(format!(
                        "Failed to execute command: stderr read failed: {}",
                        err
                    )));
                }
            }
        }

        if channel.eof() {
            break;
        }
        if started.elapsed() > timeout {
            let _ = channel.close();
            session.set_blocking(true);
            return Err(ToolError::execution(format!(
                "Command timed out after {} seconds",
                timeout_secs
            )));
        }
        if !progressed {
            std::thread::sleep(poll);
        }
    }

    session.set_blocking(true);
    let _ = channel.wait_close();
    let exit_code = i64::from(channel.exit_status().unwrap_or(-1));
    Ok(ExecOutput {
        stdout: String::from_utf8_lossy(&stdout_buf).to_string(),
        stderr: String::from_utf8_lossy(&stderr_buf).to_string(),
        exit_code,
    })
}
