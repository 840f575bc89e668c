//! Container engine operations
//!
//! Verifies the engine is installed and recent enough, and runs the delegate
//! container, feeding the credential bundle to its stdin from a separate task
//! while the launcher waits on the process.

use std::process::{ExitStatus, Stdio};
use std::sync::OnceLock;

use regex::Regex;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::DelegateInvocation;
use crate::error::HandoffError;

/// Oldest engine major version the delegate image supports
pub const MIN_ENGINE_MAJOR: u32 = 18;

/// Lifecycle of the delegate process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffPhase {
    Building,
    PipeOpened,
    Started,
    Running,
    Exited(i32),
    FailedToStart,
}

/// Extract the major version from `docker --version` output
///
/// Example: "Docker version 24.0.7, build afdd53b" -> 24
pub fn parse_engine_version(output: &str) -> Option<u32> {
    static VERSION: OnceLock<Option<Regex>> = OnceLock::new();
    let re = VERSION
        .get_or_init(|| Regex::new(r"(?i)version\s+v?(\d+)\.").ok())
        .as_ref()?;
    re.captures(output)?.get(1)?.as_str().parse().ok()
}

/// Reject engines older than [`MIN_ENGINE_MAJOR`]
pub fn ensure_supported(major: u32) -> Result<u32, HandoffError> {
    if major < MIN_ENGINE_MAJOR {
        return Err(HandoffError::EngineTooOld {
            found: major,
            required: MIN_ENGINE_MAJOR,
        });
    }
    Ok(major)
}

/// Map a process exit status to the launcher's own exit code
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Write the bundle and close the pipe
///
/// The pipe is closed when `stdin` drops, on success or failure.
async fn write_bundle(mut stdin: ChildStdin, payload: Vec<u8>) -> std::io::Result<()> {
    stdin.write_all(&payload).await?;
    stdin.shutdown().await?;
    Ok(())
}

/// Client for the container engine
pub struct DockerEngine {
    program: String,
}

impl DockerEngine {
    /// Create a client for the engine binary at `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Check the engine is installed and at least [`MIN_ENGINE_MAJOR`]
    pub async fn check_version(&self) -> Result<u32, HandoffError> {
        let unavailable = |message: String| HandoffError::EngineUnavailable {
            program: self.program.clone(),
            message,
        };

        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(unavailable(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let major = parse_engine_version(&stdout)
            .ok_or_else(|| unavailable(format!("unrecognized version: {}", stdout.trim())))?;

        debug!("Container engine major version {}", major);
        ensure_supported(major)
    }
}

/// Run the delegate and wait for it to exit
///
/// With a `payload`, the child's stdin is a pipe fed by a separate task so
/// that starting and waiting on the child never blocks on the write. A failed
/// write is logged and does not change the returned exit code. Interactive
/// invocations inherit the launcher's stdin instead and receive no payload.
pub async fn launch(
    invocation: &DelegateInvocation,
    payload: Option<Vec<u8>>,
) -> Result<i32, HandoffError> {
    let mut phase = HandoffPhase::Building;

    let payload = match payload {
        Some(_) if invocation.interactive => {
            warn!("Interactive session: credential bundle is not delivered over stdin");
            None
        }
        other => other,
    };

    let stdin = if payload.is_some() {
        phase = HandoffPhase::PipeOpened;
        Stdio::piped()
    } else if invocation.interactive {
        Stdio::inherit()
    } else {
        Stdio::null()
    };
    debug!("Delegate phase: {:?}", phase);

    let mut child = match Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(stdin)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
    {
        Ok(child) => child,
        Err(source) => {
            debug!("Delegate phase: {:?}", HandoffPhase::FailedToStart);
            return Err(HandoffError::Spawn {
                program: invocation.program.clone(),
                source,
            });
        }
    };
    phase = HandoffPhase::Started;
    debug!("Delegate phase: {:?}", phase);

    let writer: Option<JoinHandle<std::io::Result<()>>> = match (payload, child.stdin.take()) {
        (Some(payload), Some(pipe)) => Some(tokio::spawn(write_bundle(pipe, payload))),
        _ => None,
    };

    phase = HandoffPhase::Running;
    debug!("Delegate phase: {:?}", phase);

    let status = child.wait().await.map_err(|source| HandoffError::Wait {
        program: invocation.program.clone(),
        source,
    })?;

    if let Some(writer) = writer {
        match writer.await {
            Ok(Ok(())) => debug!("Credential bundle delivered"),
            Ok(Err(e)) => warn!("Failed to deliver credential bundle to delegate: {}", e),
            Err(e) => warn!("Credential bundle writer did not complete: {}", e),
        }
    }

    let code = exit_code(status);
    phase = HandoffPhase::Exited(code);
    debug!("Delegate phase: {:?}", phase);

    Ok(code)
}
