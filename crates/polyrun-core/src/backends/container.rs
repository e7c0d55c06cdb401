//! Backend for the process-isolated container runtime.

use super::{elapsed_ms, error_result, ExecutionBackend, OutputBuffer};
use crate::core_types::{ExecutionResult, Job, SourceFile};
use crate::engine::{EngineRegistry, FileTree};
use crate::errors::ExecError;
use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;

const MANIFEST_NAME: &str = "package.json";

/// Best-effort classification of the project as legacy CommonJS-style
/// versus modern ES modules, by pattern-matching the concatenated sources.
/// A `require(...)` call or a `module.exports` assignment appearing inside
/// a string literal or comment still counts; this is a heuristic, not a
/// parse.
fn uses_legacy_modules(files: &[SourceFile]) -> bool {
    let require_call = Regex::new(r"(?:^|[^.\w])require\s*\(").unwrap();
    let all_code = files
        .iter()
        .map(|f| f.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    require_call.is_match(&all_code) || all_code.contains("module.exports")
}

/// Minimal manifest naming the entry file as the start script. Declares a
/// modern-module package unless legacy patterns were detected.
fn synthesize_manifest(entry_name: &str, legacy: bool) -> String {
    let mut pkg = serde_json::json!({
        "name": "polyrun-job",
        "scripts": { "start": format!("node {}", entry_name) },
    });
    if !legacy {
        pkg["type"] = serde_json::Value::String("module".to_string());
    }
    pkg.to_string()
}

pub struct ContainerBackend {
    registry: Arc<EngineRegistry>,
}

impl ContainerBackend {
    pub fn new(registry: Arc<EngineRegistry>) -> Self {
        Self { registry }
    }

    async fn try_run(&self, job: &Job, out: &OutputBuffer) -> Result<(), ExecError> {
        let entry = job
            .entry_file()
            .ok_or_else(|| ExecError::EntryFileMissing(job.entry_file_id.clone()))?;
        let entry_name = entry.name.clone();

        let engine = self.registry.container.acquire(&job.sink).await?;

        let mut tree: FileTree = job
            .files
            .iter()
            .map(|f| (f.name.clone(), f.content.clone()))
            .collect();
        // A user-supplied manifest is mounted verbatim; synthesis only
        // happens in its absence.
        if !tree.contains_key(MANIFEST_NAME) {
            let legacy = uses_legacy_modules(&job.files);
            tree.insert(
                MANIFEST_NAME.to_string(),
                synthesize_manifest(&entry_name, legacy),
            );
        }
        engine.mount(&tree).await?;

        let mut process = engine.spawn("node", &[entry_name]).await?;
        if !job.stdin.is_empty() {
            process.write_input(&job.stdin).await?;
        }
        while let Some(chunk) = process.next_chunk().await {
            out.emit(&chunk);
        }

        let exit_code = process.wait().await?;
        if exit_code != 0 {
            // A non-zero exit is a program-level outcome, not a backend
            // failure; note it and settle normally.
            out.emit(&format!("\nProcess exited with code {}\n", exit_code));
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutionBackend for ContainerBackend {
    async fn run(&self, job: &Job) -> ExecutionResult {
        let started = Instant::now();
        let out = OutputBuffer::new(job.sink.clone());
        match self.try_run(job, &out).await {
            Ok(()) => ExecutionResult {
                output: out.into_output(),
                elapsed_ms: elapsed_ms(started),
            },
            Err(err) => error_result(&err, started, &job.sink),
        }
    }
}
