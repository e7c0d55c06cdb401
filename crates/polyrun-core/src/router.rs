//! Backend selection and the uniform execution entry point.

use crate::backends::{ContainerBackend, ExecutionBackend, InterpreterBackend, RemoteBackend};
use crate::config::ExecConfig;
use crate::core_types::{ExecutionResult, Job, OutputSink, SourceFile};
use crate::engine::EngineRegistry;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Interpreter,
    Container,
    Remote,
}

/// Static language-capability table. Fixed at build time; anything not
/// runnable by an in-browser engine defers to the remote service.
pub fn backend_for(language: &str) -> BackendKind {
    match language.to_ascii_lowercase().as_str() {
        "python" | "python3" => BackendKind::Interpreter,
        "javascript" | "typescript" | "nodejs" | "node" => BackendKind::Container,
        _ => BackendKind::Remote,
    }
}

/// Routes each job to the backend its language maps to and returns the
/// backend's result unchanged.
pub struct HybridRouter {
    interpreter: InterpreterBackend,
    container: ContainerBackend,
    remote: RemoteBackend,
}

impl HybridRouter {
    pub fn new(registry: Arc<EngineRegistry>, config: &ExecConfig) -> Self {
        Self {
            interpreter: InterpreterBackend::new(registry.clone()),
            container: ContainerBackend::new(registry),
            remote: RemoteBackend::new(config),
        }
    }

    /// Router wired to the process-backed engines discovered on this
    /// machine.
    pub fn local(config: &ExecConfig) -> Self {
        Self::new(Arc::new(EngineRegistry::local(config)), config)
    }

    /// Runs one job to settlement. This call never fails: every backend
    /// folds its failures into the resolved output, so callers only branch
    /// on the content of the result.
    pub async fn execute(
        &self,
        language: &str,
        files: Vec<SourceFile>,
        entry_file_id: &str,
        stdin: &str,
        sink: OutputSink,
    ) -> ExecutionResult {
        let job = Job {
            language: language.to_string(),
            files,
            entry_file_id: entry_file_id.to_string(),
            stdin: stdin.to_string(),
            sink,
        };

        let kind = backend_for(&job.language);
        log::debug!("dispatching {} job to {:?} backend", job.language, kind);

        let backend: &dyn ExecutionBackend = match kind {
            BackendKind::Interpreter => &self.interpreter,
            BackendKind::Container => &self.container,
            BackendKind::Remote => {
                job.emit(&format!(
                    "System: Deferring to server for {} execution...\n",
                    job.language
                ));
                &self.remote
            }
        };
        backend.run(&job).await
    }
}
