//! Container engine boundary and its local process-backed implementation.

use crate::engine::EngineLoader;
use crate::errors::ExecError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;

/// Virtual project tree: path within the project root mapped to file
/// contents.
pub type FileTree = HashMap<String, String>;

/// Boundary of the process-isolated container runtime.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Mounts the project tree into the engine's filesystem.
    async fn mount(&self, tree: &FileTree) -> Result<(), ExecError>;

    /// Spawns a process inside the mounted tree.
    async fn spawn(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<Box<dyn ContainerProcess>, ExecError>;
}

/// Handle on one spawned process: a writable input stream, a readable
/// combined-output stream, and an awaitable exit code.
#[async_trait]
pub trait ContainerProcess: Send {
    /// Writes `data` to the process input stream, then releases the writer
    /// so the stream closes cleanly. At most one write per process.
    async fn write_input(&mut self, data: &str) -> Result<(), ExecError>;

    /// Next chunk of combined stdout/stderr output, in arrival order.
    /// `None` once the stream ends.
    async fn next_chunk(&mut self) -> Option<String>;

    /// Waits for the process to finish and returns its exit code.
    async fn wait(&mut self) -> Result<i64, ExecError>;
}

/// Container engine backed by a local Node.js installation and a scratch
/// project root.
///
/// The same root is reused by every job on this engine instance; mounted
/// files overwrite same-named files from earlier jobs, which matches the
/// shared-filesystem semantics of the singleton engine.
pub struct LocalNodeEngine {
    node: PathBuf,
    root: tempfile::TempDir,
}

#[async_trait]
impl ContainerEngine for LocalNodeEngine {
    async fn mount(&self, tree: &FileTree) -> Result<(), ExecError> {
        for (path, contents) in tree {
            if Path::new(path).is_absolute() || path.split(['/', '\\']).any(|seg| seg == "..") {
                return Err(ExecError::Io(format!(
                    "refusing to mount outside the project root: {}",
                    path
                )));
            }
            let dest = self.root.path().join(path);
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&dest, contents).await?;
        }
        Ok(())
    }

    async fn spawn(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<Box<dyn ContainerProcess>, ExecError> {
        let binary = if program == "node" {
            self.node.clone()
        } else {
            PathBuf::from(program)
        };
        let mut child = Command::new(&binary)
            .args(args)
            .current_dir(self.root.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecError::Io(format!("failed to spawn {}: {}", program, e)))?;

        let (tx, rx) = mpsc::channel(64);
        if let Some(stdout) = child.stdout.take() {
            pump(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            pump(stderr, tx);
        }
        let stdin = child.stdin.take();

        Ok(Box::new(LocalProcess {
            child,
            stdin,
            output: rx,
        }))
    }
}

/// Forwards raw chunks from one pipe into the combined output channel.
fn pump(stream: impl AsyncRead + Unpin + Send + 'static, tx: mpsc::Sender<String>) {
    tokio::spawn(async move {
        let mut stream = stream;
        let mut buf = [0u8; 4096];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                    if tx.send(chunk).await.is_err() {
                        break;
                    }
                }
            }
        }
    });
}

struct LocalProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    output: mpsc::Receiver<String>,
}

#[async_trait]
impl ContainerProcess for LocalProcess {
    async fn write_input(&mut self, data: &str) -> Result<(), ExecError> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.write_all(data.as_bytes()).await?;
            stdin.shutdown().await?;
        }
        Ok(())
    }

    async fn next_chunk(&mut self) -> Option<String> {
        self.output.recv().await
    }

    async fn wait(&mut self) -> Result<i64, ExecError> {
        let status = self.child.wait().await?;
        Ok(i64::from(status.code().unwrap_or(-1)))
    }
}

/// Boots the local container runtime: resolves the Node.js binary and
/// prepares the project root.
pub struct NodeProcessLoader {
    pub binary: Option<PathBuf>,
}

#[async_trait]
impl EngineLoader<dyn ContainerEngine> for NodeProcessLoader {
    async fn boot(&self) -> Result<Arc<dyn ContainerEngine>, ExecError> {
        let node = match &self.binary {
            Some(path) => path.clone(),
            None => which::which("node").map_err(|_| {
                ExecError::RuntimeUnavailable(
                    "no Node.js runtime found on this system".to_string(),
                )
            })?,
        };
        let root = tempfile::tempdir().map_err(|e| {
            ExecError::RuntimeUnavailable(format!("could not create project root: {}", e))
        })?;
        log::debug!("container engine using {}", node.display());
        Ok(Arc::new(LocalNodeEngine { node, root }))
    }
}
