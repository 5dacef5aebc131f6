//! MCP transport layer.
//!
//! An MCP server is a child process speaking newline-delimited JSON-RPC over
//! stdin/stdout. All pipe state lives in a [`Link`] behind one lock, so an
//! exchange (write request, read until the matching reply) is atomic by
//! construction — concurrent callers queue on the link and can never read
//! each other's replies.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::sync::Mutex;

use crate::protocol::{InboundFrame, OutboundFrame, RpcFailure};

/// How an MCP server process is launched.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl McpServerConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Errors that can occur on the link to an MCP server.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O on server pipes: {0}")]
    Io(#[from] std::io::Error),

    /// The server answered, but with its `error` object.
    #[error(transparent)]
    Rejected(#[from] RpcFailure),

    #[error("server process exited{}", stderr_suffix(.0))]
    Exited(String),

    #[error("no reply within {0:?}")]
    TimedOut(Duration),

    #[error("server wrote {0} non-protocol lines during one exchange, giving up")]
    Flooded(usize),
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!("; stderr: {stderr}")
    }
}

/// Trait for MCP server transports. The production implementation is
/// [`StdioTransport`]; tests substitute an in-memory one.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Perform one request/reply exchange and return the reply's `result`.
    async fn request(&self, method: &str, params: Option<Value>)
        -> Result<Value, TransportError>;

    /// Fire a notification; nothing comes back.
    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), TransportError>;

    /// Whether the server is still believed reachable.
    fn is_alive(&self) -> bool;

    /// Terminate the server and wait for it to exit.
    async fn shutdown(&self);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Stdio transport
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// How long a server gets between stdin closing and SIGKILL.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Unparseable stdout lines tolerated per exchange before the server is
/// declared broken (a misconfigured server logging to stdout).
const STDOUT_NOISE_BUDGET: usize = 128;

/// Everything an exchange needs, owned by whoever holds the lock: the pipes,
/// the child handle, and the id counter for the next request.
struct Link {
    child: Child,
    /// `None` once shutdown has closed the pipe.
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    stderr: Option<ChildStderr>,
    next_id: u64,
}

impl Link {
    async fn write_frame(&mut self, frame: &OutboundFrame) -> Result<(), TransportError> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(TransportError::Exited(String::new()));
        };
        let mut line = frame.encode();
        line.push('\n');
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Read lines until the reply with our id shows up. Stale replies and
    /// server-initiated messages are skipped; noise counts against a budget.
    async fn read_reply(&mut self, id: u64) -> Result<Value, TransportError> {
        let mut noise = 0usize;
        loop {
            let mut line = String::new();
            if self.stdout.read_line(&mut line).await? == 0 {
                return Err(self.exited().await);
            }
            if line.trim().is_empty() {
                continue;
            }

            match InboundFrame::classify(&line) {
                InboundFrame::Reply { id: got, outcome } if got == id => {
                    return Ok(outcome?);
                }
                InboundFrame::Reply { id: got, .. } => {
                    tracing::debug!(expected = id, got, "reply for another exchange, skipping");
                }
                InboundFrame::ServerMessage { method } => {
                    tracing::debug!(method, "ignoring server-initiated message");
                }
                InboundFrame::Noise => {
                    noise += 1;
                    if noise > STDOUT_NOISE_BUDGET {
                        return Err(TransportError::Flooded(noise));
                    }
                    tracing::debug!(line = %line.trim(), "non-protocol output on server stdout");
                }
            }
        }
    }

    /// Build an `Exited` error carrying whatever the child managed to write
    /// to stderr, so a misconfigured server fails with a useful message.
    async fn exited(&mut self) -> TransportError {
        let mut tail = String::new();
        if let Some(stderr) = self.stderr.as_mut() {
            if tokio::time::timeout(Duration::from_millis(250), stderr.read_to_string(&mut tail))
                .await
                .is_err()
            {
                tail.push_str("(stderr read timed out)");
            }
        }
        TransportError::Exited(tail.trim().to_owned())
    }
}

/// Child-process transport: one JSON-RPC message per line.
pub struct StdioTransport {
    link: Mutex<Link>,
    reply_timeout: Duration,
    healthy: AtomicBool,
}

impl StdioTransport {
    /// Spawn the server process described by `config`.
    pub fn spawn(config: &McpServerConfig) -> Result<Self, TransportError> {
        let mut command = tokio::process::Command::new(&config.command);
        command
            .args(&config.args)
            .envs(&config.env)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let mut child = command.spawn()?;
        let stdin = child.stdin.take().ok_or_else(|| pipe_error("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| pipe_error("stdout"))?;
        let stderr = child.stderr.take();

        tracing::info!(command = %config.command, "spawned MCP server process");

        Ok(Self {
            link: Mutex::new(Link {
                child,
                stdin: Some(stdin),
                stdout: BufReader::new(stdout),
                stderr,
                next_id: 1,
            }),
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            healthy: AtomicBool::new(true),
        })
    }

    /// Override the per-exchange reply deadline.
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// An I/O-level failure means the link is gone for good; a rejection or
    /// timeout leaves it usable.
    fn note_failure(&self, error: &TransportError) {
        if matches!(
            error,
            TransportError::Io(_) | TransportError::Exited(_) | TransportError::Flooded(_)
        ) {
            self.healthy.store(false, Ordering::SeqCst);
        }
    }
}

fn pipe_error(which: &str) -> TransportError {
    TransportError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        format!("failed to capture child {which}"),
    ))
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, TransportError> {
        if !self.is_alive() {
            return Err(TransportError::Exited(String::new()));
        }

        let mut link = self.link.lock().await;
        let id = link.next_id;
        link.next_id += 1;
        tracing::debug!(id, method, "MCP request");

        if let Err(error) = link
            .write_frame(&OutboundFrame::request(id, method, params))
            .await
        {
            self.note_failure(&error);
            return Err(error);
        }

        let reply = match tokio::time::timeout(self.reply_timeout, link.read_reply(id)).await {
            Ok(reply) => reply,
            Err(_) => Err(TransportError::TimedOut(self.reply_timeout)),
        };
        if let Err(error) = &reply {
            self.note_failure(error);
        }
        reply
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), TransportError> {
        if !self.is_alive() {
            return Err(TransportError::Exited(String::new()));
        }

        let mut link = self.link.lock().await;
        tracing::debug!(method, "MCP notification");
        let result = link
            .write_frame(&OutboundFrame::notification(method, params))
            .await;
        if let Err(error) = &result {
            self.note_failure(error);
        }
        result
    }

    fn is_alive(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    async fn shutdown(&self) {
        self.healthy.store(false, Ordering::SeqCst);
        let mut link = self.link.lock().await;

        // Dropping stdin closes the pipe — the polite way to ask an MCP
        // server to exit.
        drop(link.stdin.take());

        match tokio::time::timeout(SHUTDOWN_GRACE, link.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(?status, "MCP server process exited");
            }
            Ok(Err(error)) => {
                tracing::warn!(%error, "error waiting for MCP server process");
            }
            Err(_) => {
                tracing::warn!(grace = ?SHUTDOWN_GRACE, "MCP server ignored stdin close, killing");
                if let Err(error) = link.child.kill().await {
                    tracing::warn!(%error, "failed to kill MCP server process");
                }
            }
        }
    }
}
