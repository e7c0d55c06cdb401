//! Execution backends: the three strategies implementing the job-running
//! contract.
//!
//! Every backend entry point is total from the caller's perspective: it
//! always settles with an `ExecutionResult` and never returns an error.
//! Failures are folded into the result as `ERROR: `-tagged output at the
//! backend boundary, so the router and callers only ever branch on the
//! content of `output`.

use crate::core_types::{ExecutionResult, Job, OutputSink};
use crate::errors::ExecError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Instant;

pub mod container;
pub mod interpreter;
pub mod remote;

pub use container::ContainerBackend;
pub use interpreter::InterpreterBackend;
pub use remote::RemoteBackend;

/// Textual failure marker; a result whose output starts with this is the
/// de facto failure signal downstream.
pub const ERROR_PREFIX: &str = "ERROR: ";

#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Runs one job to settlement. Never fails: any error is encoded in
    /// the returned output.
    async fn run(&self, job: &Job) -> ExecutionResult;
}

/// Accumulates the result buffer while forwarding each chunk to the job's
/// sink, keeping the two byte-for-byte identical.
#[derive(Clone)]
pub(crate) struct OutputBuffer {
    buf: Arc<Mutex<String>>,
    sink: OutputSink,
}

impl OutputBuffer {
    pub(crate) fn new(sink: OutputSink) -> Self {
        Self {
            buf: Arc::new(Mutex::new(String::new())),
            sink,
        }
    }

    pub(crate) fn emit(&self, chunk: &str) {
        self.buf.lock().unwrap().push_str(chunk);
        (self.sink)(chunk);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.buf.lock().unwrap().is_empty()
    }

    pub(crate) fn into_output(self) -> String {
        let output = self.buf.lock().unwrap().clone();
        output
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Folds a backend failure into the uniform result shape: the sink sees an
/// error-tagged line and the result carries the same tagged message plus
/// the time elapsed so far.
pub(crate) fn error_result(err: &ExecError, started: Instant, sink: &OutputSink) -> ExecutionResult {
    let message = err.to_string();
    sink(&format!("\n{}{}\n", ERROR_PREFIX, message));
    ExecutionResult {
        output: format!("{}{}", ERROR_PREFIX, message),
        elapsed_ms: elapsed_ms(started),
    }
}
