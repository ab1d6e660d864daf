//! [`ModuleHost`] backed by a long-lived `node` process.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use super::protocol::{RemoteError, Request, Response};
use super::{ModuleHost, ModuleIdentity};
use crate::error::{ConfigError, Result};
use crate::value::FunctionHandle;

/// Environment variable naming the `node` binary to run.
pub const NODE_ENV_VAR: &str = "WINDPACK_NODE";

const BRIDGE: &str = include_str!("bridge.mjs");

struct NodeProcess {
    // Held so the child is killed when the process handle is dropped
    _child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

/// Runs configs and plugin hooks in a `node` child process.
///
/// The process is started on first use and reused for every later request,
/// including across pipeline runs. Requests are serialized. If the process
/// exits, the failing request reports it and the next one starts a new
/// process.
pub struct NodeHost {
    program: PathBuf,
    process: Mutex<Option<NodeProcess>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for NodeHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHost")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

impl Default for NodeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeHost {
    /// Host running `$WINDPACK_NODE`, or `node` from `PATH`.
    pub fn new() -> Self {
        let program = std::env::var_os(NODE_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("node"));
        Self::with_program(program)
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            process: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn spawn(&self) -> Result<NodeProcess> {
        tracing::debug!("starting {}", self.program.display());

        let mut child = Command::new(&self.program)
            .arg("--enable-source-maps")
            .arg("--input-type=module")
            .arg("--eval")
            .arg(BRIDGE)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                ConfigError::Runtime(format!(
                    "failed to start {}: {}",
                    self.program.display(),
                    err
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ConfigError::Runtime("node stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ConfigError::Runtime("node stdout unavailable".into()))?;

        Ok(NodeProcess {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        })
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn request(&self, request: Request<'_>) -> Result<Response> {
        let mut guard = self.process.lock().await;
        if guard.is_none() {
            *guard = Some(self.spawn()?);
        }

        let result = match guard.as_mut() {
            Some(process) => exchange(process, &request).await,
            None => Err(ConfigError::Runtime("node process unavailable".into())),
        };

        if result.is_err() {
            // Start over with a fresh process next time
            *guard = None;
        }
        result
    }
}

async fn exchange(process: &mut NodeProcess, request: &Request<'_>) -> Result<Response> {
    let mut line = serde_json::to_string(request)?;
    line.push('\n');
    tracing::trace!("-> {}", line.trim_end());

    process
        .stdin
        .write_all(line.as_bytes())
        .await
        .map_err(|err| ConfigError::Runtime(format!("failed to write to node: {err}")))?;
    process
        .stdin
        .flush()
        .await
        .map_err(|err| ConfigError::Runtime(format!("failed to write to node: {err}")))?;

    loop {
        let Some(line) = process
            .stdout
            .next_line()
            .await
            .map_err(|err| ConfigError::Runtime(format!("failed to read from node: {err}")))?
        else {
            return Err(ConfigError::Runtime("node exited unexpectedly".into()));
        };

        match serde_json::from_str::<Response>(&line) {
            Ok(response) if response.id == request.id() => {
                tracing::trace!("<- {}", line);
                return Ok(response);
            }
            Ok(response) => {
                tracing::debug!("ignoring stale response {}", response.id);
            }
            // Something other than the bridge wrote to stdout
            Err(_) => tracing::info!("{}", line),
        }
    }
}

#[async_trait]
impl ModuleHost for NodeHost {
    async fn evaluate(&self, identity: &ModuleIdentity, source: &Path) -> Result<Value> {
        let response = self
            .request(Request::Load {
                id: self.next_id(),
                url: identity.url(),
                scope: identity.token(),
            })
            .await?;

        response
            .into_result()
            .map_err(|err| ConfigError::Evaluation {
                path: source.to_path_buf(),
                message: describe(err),
            })
    }

    async fn call(&self, function: &FunctionHandle, args: Vec<Value>) -> Result<Value> {
        let response = self
            .request(Request::Call {
                id: self.next_id(),
                function: function.0,
                args: &args,
            })
            .await?;

        response.into_result().map_err(|err| ConfigError::Call {
            message: describe(err),
        })
    }

    async fn release(&self, identity: &ModuleIdentity) -> Result<()> {
        // Nothing to release in a process that was never started
        if self.process.lock().await.is_none() {
            return Ok(());
        }

        let response = self
            .request(Request::Release {
                id: self.next_id(),
                scope: identity.token(),
            })
            .await?;
        response
            .into_result()
            .map(drop)
            .map_err(|err| ConfigError::Runtime(err.message))
    }
}

/// Error message followed by the first stack frame, which source maps point
/// at the user's file.
fn describe(err: RemoteError) -> String {
    let Some(stack) = err.stack else {
        return err.message;
    };
    tracing::debug!("{}", stack);

    match stack.lines().map(str::trim).find(|line| line.starts_with("at ")) {
        Some(frame) => format!("{}\n    {}", err.message, frame),
        None => err.message,
    }
}
