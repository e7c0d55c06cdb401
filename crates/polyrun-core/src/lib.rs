//! Hybrid execution router for multi-file code snippets.
//!
//! This crate decides which of three backends runs a given job (a
//! single-process interpreted-language engine, a process-isolated
//! container runtime, or a remote execution service) and normalizes
//! their structurally different outcomes into one uniform result
//! contract.
//!
//! # Architecture Overview
//!
//! - **Engine handles**: each heavy engine is a lazily-booted,
//!   process-wide singleton; concurrent first calls suspend on a single
//!   in-flight boot and share its outcome.
//! - **Backends**: the three execution strategies behind one job-running
//!   trait; every entry point settles with a result and never fails,
//!   encoding errors in the output text instead.
//! - **Router**: static language-capability dispatch over the three
//!   backends, streaming output chunks back to the caller as they arrive.
//!
//! The engines themselves are external collaborators reached through the
//! `InterpreterEngine` and `ContainerEngine` traits; process-backed
//! implementations over locally discovered runtimes ship in
//! [`engine::interpreter`] and [`engine::container`].

pub mod backends;
pub mod config;
pub mod core_types;
pub mod engine;
pub mod errors;
pub mod router;

pub use backends::{
    ContainerBackend, ExecutionBackend, InterpreterBackend, RemoteBackend, ERROR_PREFIX,
};
pub use config::ExecConfig;
pub use core_types::{ExecutionResult, FileId, Job, LanguageId, OutputSink, SourceFile};
pub use engine::{
    ContainerEngine, ContainerProcess, EngineHandle, EngineLoader, EngineRegistry, FileTree,
    InterpreterEngine, LineSink,
};
pub use errors::ExecError;
pub use router::{backend_for, BackendKind, HybridRouter};

#[cfg(test)]
pub mod test_utils;
