//! Backend for the single-process interpreted-language engine.

use super::{elapsed_ms, error_result, ExecutionBackend, OutputBuffer, ERROR_PREFIX};
use crate::core_types::{ExecutionResult, Job};
use crate::engine::{EngineRegistry, LineSink};
use crate::errors::ExecError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Global under which the job's stdin is exposed to the running program.
const STDIN_GLOBAL: &str = "input_data";

pub struct InterpreterBackend {
    registry: Arc<EngineRegistry>,
}

impl InterpreterBackend {
    pub fn new(registry: Arc<EngineRegistry>) -> Self {
        Self { registry }
    }

    async fn try_run(&self, job: &Job, out: &OutputBuffer) -> Result<Option<String>, ExecError> {
        // A bad entry reference is a request error; it must not touch
        // engine state.
        let entry = job
            .entry_file()
            .ok_or_else(|| ExecError::EntryFileMissing(job.entry_file_id.clone()))?;

        let engine = self.registry.interpreter.acquire(&job.sink).await?;

        // Auxiliary files go into the engine's virtual filesystem under
        // their given names so the entry file can import them as siblings.
        for file in &job.files {
            if file.id != job.entry_file_id {
                engine.write_module(&file.name, &file.content).await?;
            }
        }

        if !job.stdin.is_empty() {
            engine.bind_global(STDIN_GLOBAL, &job.stdin).await?;
        }

        let stdout_sink: LineSink = {
            let out = out.clone();
            Arc::new(move |line: &str| out.emit(&format!("{}\n", line)))
        };
        let stderr_sink: LineSink = {
            let out = out.clone();
            Arc::new(move |line: &str| out.emit(&format!("{}{}\n", ERROR_PREFIX, line)))
        };

        engine.eval(&entry.content, stdout_sink, stderr_sink).await
    }
}

#[async_trait]
impl ExecutionBackend for InterpreterBackend {
    async fn run(&self, job: &Job) -> ExecutionResult {
        let started = Instant::now();
        let out = OutputBuffer::new(job.sink.clone());
        match self.try_run(job, &out).await {
            Ok(trailing) => {
                let mut output = out.into_output();
                // The interpreter may hand back the value of the final
                // expression; it becomes the result only when the program
                // printed nothing itself.
                if let Some(value) = trailing {
                    if output.is_empty() {
                        output = format!("{}\n", value);
                        job.emit(&output);
                    }
                }
                ExecutionResult {
                    output,
                    elapsed_ms: elapsed_ms(started),
                }
            }
            Err(err) => error_result(&err, started, &job.sink),
        }
    }
}
