//! Client side of the native-messaging bridge.
//!
//! Each query spawns the configured host program, writes one framed
//! `getLogins` request, reads one framed response and normalizes it. There
//! is no internal timeout — callers own cancellation — but the child is
//! killed on drop so an abandoned query never leaks a process.

use std::process::Stdio;

use crate::error::{NativeError, Result};
use crate::framing;
use crate::normalize::{NativeCredentials, normalize_response};

/// How to launch the external native host.
#[derive(Debug, Clone)]
pub struct NativeHostConfig {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
}

impl NativeHostConfig {
    /// Config for a host launched with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }
}

/// Fallback lookup path through an external native-messaging host.
#[derive(Debug, Clone)]
pub struct NativeBridge {
    config: NativeHostConfig,
}

impl NativeBridge {
    /// Create a bridge for the given host configuration.
    pub fn new(config: NativeHostConfig) -> Self {
        Self { config }
    }

    /// Ask the native host for credentials matching `origin`/`url`.
    ///
    /// Sends the fixed `{action:"getLogins", origin, url}` request and
    /// normalizes whatever shape comes back.
    ///
    /// # Errors
    ///
    /// [`NativeError::Spawn`] when the host cannot be launched,
    /// [`NativeError::NoResponse`] when it exits without answering, and the
    /// normalization errors from [`normalize_response`].
    pub async fn get_logins(
        &self,
        origin: Option<&str>,
        url: Option<&str>,
    ) -> Result<NativeCredentials> {
        let request = serde_json::json!({
            "action": "getLogins",
            "origin": origin.unwrap_or(""),
            "url": url.unwrap_or(""),
        });

        tracing::debug!(
            program = %self.config.program,
            origin = origin.unwrap_or(""),
            "querying native host"
        );

        let mut child = tokio::process::Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NativeError::Spawn {
                reason: e.to_string(),
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| NativeError::Spawn {
            reason: "stdin unavailable".to_string(),
        })?;
        let mut stdout = child.stdout.take().ok_or_else(|| NativeError::Spawn {
            reason: "stdout unavailable".to_string(),
        })?;

        match framing::write_frame(&mut stdin, &request).await {
            Ok(()) => {}
            // A host that exits before reading closes the pipe; whatever it
            // already wrote (or EOF) is still the answer.
            Err(NativeError::Io(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                tracing::debug!("native host closed stdin before reading the request");
            }
            Err(e) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(e);
            }
        }
        // Close the pipe so single-shot hosts see EOF after the request.
        drop(stdin);

        let response = framing::read_frame(&mut stdout).await;

        // One request, one response: the host is done either way.
        let _ = child.start_kill();
        let _ = child.wait().await;

        match response? {
            Some(value) => normalize_response(&value),
            None => Err(NativeError::NoResponse),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
