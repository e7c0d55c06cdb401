//! Core type definitions for the job execution contract.
//!
//! These types form the contract between callers and the hybrid router: a
//! `Job` is one execution request over a set of `SourceFile`s, and every
//! backend settles it with the same `ExecutionResult` shape regardless of
//! how the job actually ran.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type FileId = String;
pub type LanguageId = String;

/// Callback receiving output chunks as a job produces them.
///
/// Chunks arrive in the order the underlying engine emits them; the final
/// `ExecutionResult::output` is their ordered concatenation.
pub type OutputSink = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub id: FileId,
    pub name: String,
    pub content: String,
}

/// One execution request: a set of files, an entry point, optional input,
/// and an output sink. Ephemeral; never persisted by this crate.
#[derive(Clone)]
pub struct Job {
    pub language: LanguageId,
    pub files: Vec<SourceFile>,
    pub entry_file_id: FileId,
    pub stdin: String,
    pub sink: OutputSink,
}

impl Job {
    pub fn entry_file(&self) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.id == self.entry_file_id)
    }

    /// Forwards one chunk to the caller's sink.
    pub fn emit(&self, chunk: &str) {
        (self.sink)(chunk);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub output: String,
    /// Wall-clock time from job acceptance to settlement.
    pub elapsed_ms: u64,
}
