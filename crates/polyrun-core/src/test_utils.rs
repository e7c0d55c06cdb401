//! Shared fakes for exercising the router and backends without real
//! engines.

use crate::core_types::{Job, OutputSink, SourceFile};
use crate::engine::{
    ContainerEngine, ContainerProcess, EngineHandle, EngineLoader, EngineRegistry, FileTree,
    InterpreterEngine, LineSink,
};
use crate::errors::ExecError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn file(id: &str, name: &str, content: &str) -> SourceFile {
    SourceFile {
        id: id.to_string(),
        name: name.to_string(),
        content: content.to_string(),
    }
}

pub fn job_for(
    language: &str,
    files: Vec<SourceFile>,
    entry_file_id: &str,
    stdin: &str,
    sink: OutputSink,
) -> Job {
    Job {
        language: language.to_string(),
        files,
        entry_file_id: entry_file_id.to_string(),
        stdin: stdin.to_string(),
        sink,
    }
}

/// Sink that records every chunk it receives.
#[derive(Clone, Default)]
pub struct RecordingSink {
    chunks: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(&self) -> OutputSink {
        let chunks = self.chunks.clone();
        Arc::new(move |chunk: &str| chunks.lock().unwrap().push(chunk.to_string()))
    }

    pub fn chunks(&self) -> Vec<String> {
        self.chunks.lock().unwrap().clone()
    }

    pub fn concatenated(&self) -> String {
        self.chunks.lock().unwrap().concat()
    }
}

/// Scripted interpreter engine: records filesystem writes and global
/// bindings, then replays configured output lines on `eval`.
#[derive(Clone, Default)]
pub struct FakeInterpreterEngine {
    pub modules: Arc<Mutex<HashMap<String, String>>>,
    pub globals: Arc<Mutex<HashMap<String, String>>>,
    pub evaluated: Arc<Mutex<Vec<String>>>,
    stdout_lines: Vec<String>,
    stderr_lines: Vec<String>,
    trailing: Option<String>,
    eval_delay: Duration,
}

impl FakeInterpreterEngine {
    pub fn with_stdout_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stdout_lines = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_stderr_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stderr_lines = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_trailing(mut self, value: &str) -> Self {
        self.trailing = Some(value.to_string());
        self
    }

    pub fn with_eval_delay(mut self, delay: Duration) -> Self {
        self.eval_delay = delay;
        self
    }
}

#[async_trait]
impl InterpreterEngine for FakeInterpreterEngine {
    async fn write_module(&self, name: &str, content: &str) -> Result<(), ExecError> {
        self.modules
            .lock()
            .unwrap()
            .insert(name.to_string(), content.to_string());
        Ok(())
    }

    async fn bind_global(&self, name: &str, value: &str) -> Result<(), ExecError> {
        self.globals
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn eval(
        &self,
        source: &str,
        stdout: LineSink,
        stderr: LineSink,
    ) -> Result<Option<String>, ExecError> {
        if !self.eval_delay.is_zero() {
            tokio::time::sleep(self.eval_delay).await;
        }
        self.evaluated.lock().unwrap().push(source.to_string());
        for line in &self.stdout_lines {
            stdout(line);
        }
        for line in &self.stderr_lines {
            stderr(line);
        }
        Ok(self.trailing.clone())
    }
}

pub struct FakeInterpreterLoader {
    engine: Arc<FakeInterpreterEngine>,
    pub boots: Arc<AtomicUsize>,
    boot_delay: Duration,
    fail_next: Arc<AtomicUsize>,
}

impl FakeInterpreterLoader {
    pub fn new(engine: FakeInterpreterEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            boots: Arc::new(AtomicUsize::new(0)),
            boot_delay: Duration::ZERO,
            fail_next: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_boot_delay(mut self, delay: Duration) -> Self {
        self.boot_delay = delay;
        self
    }

    pub fn failing_next_boots(self, count: usize) -> Self {
        self.fail_next.store(count, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl EngineLoader<dyn InterpreterEngine> for FakeInterpreterLoader {
    async fn boot(&self) -> Result<Arc<dyn InterpreterEngine>, ExecError> {
        if !self.boot_delay.is_zero() {
            tokio::time::sleep(self.boot_delay).await;
        }
        self.boots.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.load(Ordering::SeqCst) > 0 {
            self.fail_next.fetch_sub(1, Ordering::SeqCst);
            return Err(ExecError::RuntimeUnavailable(
                "engine download failed".to_string(),
            ));
        }
        Ok(self.engine.clone())
    }
}

/// Scripted container engine: records the mounted tree, spawned commands,
/// and piped stdin, then replays configured output chunks.
#[derive(Clone, Default)]
pub struct FakeContainerEngine {
    pub mounted: Arc<Mutex<Option<FileTree>>>,
    pub spawned: Arc<Mutex<Vec<(String, Vec<String>)>>>,
    pub stdin_seen: Arc<Mutex<Option<String>>>,
    output_chunks: Vec<String>,
    exit_code: i64,
}

impl FakeContainerEngine {
    pub fn with_output_chunks<I, S>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_chunks = chunks.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_exit_code(mut self, code: i64) -> Self {
        self.exit_code = code;
        self
    }
}

#[async_trait]
impl ContainerEngine for FakeContainerEngine {
    async fn mount(&self, tree: &FileTree) -> Result<(), ExecError> {
        *self.mounted.lock().unwrap() = Some(tree.clone());
        Ok(())
    }

    async fn spawn(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<Box<dyn ContainerProcess>, ExecError> {
        self.spawned
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));
        Ok(Box::new(FakeProcess {
            chunks: self.output_chunks.iter().cloned().collect(),
            exit_code: self.exit_code,
            stdin_seen: self.stdin_seen.clone(),
        }))
    }
}

struct FakeProcess {
    chunks: VecDeque<String>,
    exit_code: i64,
    stdin_seen: Arc<Mutex<Option<String>>>,
}

#[async_trait]
impl ContainerProcess for FakeProcess {
    async fn write_input(&mut self, data: &str) -> Result<(), ExecError> {
        *self.stdin_seen.lock().unwrap() = Some(data.to_string());
        Ok(())
    }

    async fn next_chunk(&mut self) -> Option<String> {
        self.chunks.pop_front()
    }

    async fn wait(&mut self) -> Result<i64, ExecError> {
        Ok(self.exit_code)
    }
}

pub struct FakeContainerLoader {
    engine: Arc<FakeContainerEngine>,
    pub boots: Arc<AtomicUsize>,
    fail_next: Arc<AtomicUsize>,
}

impl FakeContainerLoader {
    pub fn new(engine: FakeContainerEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            boots: Arc::new(AtomicUsize::new(0)),
            fail_next: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_next_boots(self, count: usize) -> Self {
        self.fail_next.store(count, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl EngineLoader<dyn ContainerEngine> for FakeContainerLoader {
    async fn boot(&self) -> Result<Arc<dyn ContainerEngine>, ExecError> {
        self.boots.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.load(Ordering::SeqCst) > 0 {
            self.fail_next.fetch_sub(1, Ordering::SeqCst);
            return Err(ExecError::RuntimeUnavailable(
                "engine boot failed".to_string(),
            ));
        }
        Ok(self.engine.clone())
    }
}

/// Registry whose interpreter side is the given fake and whose container
/// side always fails to boot.
pub fn registry_with_interpreter(loader: FakeInterpreterLoader) -> Arc<EngineRegistry> {
    Arc::new(EngineRegistry::new(
        interpreter_handle(loader),
        container_handle(
            FakeContainerLoader::new(FakeContainerEngine::default()).failing_next_boots(usize::MAX),
        ),
    ))
}

/// Registry whose container side is the given fake and whose interpreter
/// side always fails to boot.
pub fn registry_with_container(loader: FakeContainerLoader) -> Arc<EngineRegistry> {
    Arc::new(EngineRegistry::new(
        interpreter_handle(
            FakeInterpreterLoader::new(FakeInterpreterEngine::default())
                .failing_next_boots(usize::MAX),
        ),
        container_handle(loader),
    ))
}

pub fn interpreter_handle(loader: FakeInterpreterLoader) -> EngineHandle<dyn InterpreterEngine> {
    EngineHandle::new(
        "Python",
        "System: Preparing the Python runtime (first run only)...\n",
        Box::new(loader),
    )
}

pub fn container_handle(loader: FakeContainerLoader) -> EngineHandle<dyn ContainerEngine> {
    EngineHandle::new(
        "Node.js sandbox",
        "System: Booting the Node.js sandbox environment...\n",
        Box::new(loader),
    )
}
