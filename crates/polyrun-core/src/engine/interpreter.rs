//! Interpreter engine boundary and its local process-backed implementation.

use crate::engine::EngineLoader;
use crate::errors::ExecError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::Mutex;

/// Receives one line of interpreter output, without the trailing newline.
pub type LineSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Boundary of the interpreted-language engine.
///
/// Mirrors what a sandboxed interpreter runtime offers the router: a
/// virtual-filesystem write keyed by filename, a global binding visible to
/// the next program run, and a run-program operation with pluggable
/// standard-output and standard-error line sinks bound for the duration of
/// the call.
#[async_trait]
pub trait InterpreterEngine: Send + Sync {
    /// Writes an auxiliary module into the engine's virtual filesystem so
    /// the entry file can import it as a sibling.
    async fn write_module(&self, name: &str, content: &str) -> Result<(), ExecError>;

    /// Binds a global visible to the next program run.
    async fn bind_global(&self, name: &str, value: &str) -> Result<(), ExecError>;

    /// Runs `source` as a top-level program, feeding output lines to the
    /// given sinks, and returns the value of the final expression when the
    /// engine reports one.
    async fn eval(
        &self,
        source: &str,
        stdout: LineSink,
        stderr: LineSink,
    ) -> Result<Option<String>, ExecError>;
}

const ENTRY_MODULE: &str = "__entry__.py";

/// Interpreter engine backed by a local CPython installation.
///
/// The virtual filesystem is a scratch directory shared by every job that
/// runs on this engine instance, matching the shared-state semantics of the
/// singleton engine. Globals surface to the program as environment
/// variables under the upper-cased name.
pub struct LocalPythonEngine {
    python: PathBuf,
    workdir: tempfile::TempDir,
    globals: Mutex<HashMap<String, String>>,
}

fn reject_escaping_path(name: &str) -> Result<(), ExecError> {
    if Path::new(name).is_absolute() || name.split(['/', '\\']).any(|seg| seg == "..") {
        return Err(ExecError::Io(format!(
            "refusing to write outside the engine filesystem: {}",
            name
        )));
    }
    Ok(())
}

#[async_trait]
impl InterpreterEngine for LocalPythonEngine {
    async fn write_module(&self, name: &str, content: &str) -> Result<(), ExecError> {
        reject_escaping_path(name)?;
        let dest = self.workdir.path().join(name);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, content).await?;
        Ok(())
    }

    async fn bind_global(&self, name: &str, value: &str) -> Result<(), ExecError> {
        self.globals
            .lock()
            .await
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn eval(
        &self,
        source: &str,
        stdout: LineSink,
        stderr: LineSink,
    ) -> Result<Option<String>, ExecError> {
        let entry_path = self.workdir.path().join(ENTRY_MODULE);
        tokio::fs::write(&entry_path, source).await?;

        let mut command = Command::new(&self.python);
        command
            .arg("-u")
            .arg(ENTRY_MODULE)
            .current_dir(self.workdir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (name, value) in self.globals.lock().await.iter() {
            command.env(name.to_ascii_uppercase(), value);
        }

        let mut child = command
            .spawn()
            .map_err(|e| ExecError::Io(format!("failed to start interpreter: {}", e)))?;

        let out_pipe = child.stdout.take();
        let err_pipe = child.stderr.take();
        let read_stdout = async {
            if let Some(pipe) = out_pipe {
                let mut lines = BufReader::new(pipe).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    stdout(&line);
                }
            }
        };
        let read_stderr = async {
            if let Some(pipe) = err_pipe {
                let mut lines = BufReader::new(pipe).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    stderr(&line);
                }
            }
        };
        tokio::join!(read_stdout, read_stderr);

        let status = child.wait().await?;
        log::debug!("interpreter run finished with status {}", status);

        // A process-backed interpreter has no last-expression value to hand
        // back; runtime errors already reached the caller via the stderr
        // sink.
        Ok(None)
    }
}

/// Boots the local interpreter: resolves the binary and prepares the
/// virtual filesystem root.
pub struct PythonProcessLoader {
    pub binary: Option<PathBuf>,
}

#[async_trait]
impl EngineLoader<dyn InterpreterEngine> for PythonProcessLoader {
    async fn boot(&self) -> Result<Arc<dyn InterpreterEngine>, ExecError> {
        let python = match &self.binary {
            Some(path) => path.clone(),
            None => which::which("python3")
                .or_else(|_| which::which("python"))
                .map_err(|_| {
                    ExecError::RuntimeUnavailable(
                        "no Python interpreter found on this system".to_string(),
                    )
                })?,
        };
        let workdir = tempfile::tempdir().map_err(|e| {
            ExecError::RuntimeUnavailable(format!("could not create interpreter filesystem: {}", e))
        })?;
        log::debug!("interpreter engine using {}", python.display());
        Ok(Arc::new(LocalPythonEngine {
            python,
            workdir,
            globals: Mutex::new(HashMap::new()),
        }))
    }
}
