//! Lazy singleton lifecycle for the heavy execution engines.
//!
//! Each engine kind gets exactly one `EngineHandle`, which owns at most one
//! underlying engine instance for the life of the process. The first
//! `acquire` performs the expensive boot; callers arriving while that boot
//! is in flight suspend and share its outcome instead of starting a second
//! one. A failed boot resets the handle to unloaded so a later job can
//! retry.

use crate::core_types::OutputSink;
use crate::errors::ExecError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

pub mod container;
pub mod interpreter;

pub use container::{ContainerEngine, ContainerProcess, FileTree, NodeProcessLoader};
pub use interpreter::{InterpreterEngine, LineSink, PythonProcessLoader};

use crate::config::ExecConfig;

/// Boots one underlying engine instance.
///
/// Implementations perform the expensive first-time initialization: runtime
/// discovery, downloads, filesystem preparation. The handle guarantees
/// `boot` is never invoked while another boot for the same handle is still
/// in flight.
#[async_trait]
pub trait EngineLoader<E: ?Sized + Send + Sync>: Send + Sync {
    async fn boot(&self) -> Result<Arc<E>, ExecError>;
}

type BootOutcome<E> = Option<Result<Arc<E>, ExecError>>;

enum Slot<E: ?Sized> {
    Unloaded,
    Loading(watch::Receiver<BootOutcome<E>>),
    Ready(Arc<E>),
}

pub struct EngineHandle<E: ?Sized + Send + Sync> {
    name: &'static str,
    boot_notice: String,
    loader: Box<dyn EngineLoader<E>>,
    slot: Mutex<Slot<E>>,
}

impl<E: ?Sized + Send + Sync> EngineHandle<E> {
    pub fn new(
        name: &'static str,
        boot_notice: impl Into<String>,
        loader: Box<dyn EngineLoader<E>>,
    ) -> Self {
        Self {
            name,
            boot_notice: boot_notice.into(),
            loader,
            slot: Mutex::new(Slot::Unloaded),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the ready singleton instance, booting it on first call.
    ///
    /// Boot progress notices go through `sink` only for the caller that
    /// initiates the boot; waiters and post-boot acquisitions are silent.
    pub async fn acquire(&self, sink: &OutputSink) -> Result<Arc<E>, ExecError> {
        enum Plan<E: ?Sized> {
            Hit(Arc<E>),
            Wait(watch::Receiver<BootOutcome<E>>),
            Boot(watch::Sender<BootOutcome<E>>),
        }

        let plan = {
            let mut slot = self.slot.lock().await;
            match &*slot {
                Slot::Ready(engine) => Plan::Hit(engine.clone()),
                Slot::Loading(rx) => Plan::Wait(rx.clone()),
                Slot::Unloaded => {
                    let (tx, rx) = watch::channel(None);
                    *slot = Slot::Loading(rx);
                    Plan::Boot(tx)
                }
            }
        };

        match plan {
            Plan::Hit(engine) => Ok(engine),
            Plan::Wait(rx) => self.wait_for_boot(rx).await,
            Plan::Boot(tx) => self.boot(sink, tx).await,
        }
    }

    async fn boot(
        &self,
        sink: &OutputSink,
        tx: watch::Sender<BootOutcome<E>>,
    ) -> Result<Arc<E>, ExecError> {
        log::info!("booting {} engine", self.name);
        sink(&self.boot_notice);

        let outcome = self.loader.boot().await;

        {
            let mut slot = self.slot.lock().await;
            match &outcome {
                Ok(engine) => *slot = Slot::Ready(engine.clone()),
                Err(err) => {
                    log::warn!("{} engine failed to boot: {}", self.name, err);
                    *slot = Slot::Unloaded;
                }
            }
        }
        if outcome.is_ok() {
            sink(&format!("System: {} ready!\n\n", self.name));
            log::info!("{} engine ready", self.name);
        }
        let _ = tx.send(Some(outcome.clone()));
        outcome
    }

    async fn wait_for_boot(
        &self,
        mut rx: watch::Receiver<BootOutcome<E>>,
    ) -> Result<Arc<E>, ExecError> {
        loop {
            let settled = rx.borrow().clone();
            if let Some(outcome) = settled {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // The booting caller went away without settling. Clear the
                // stale loading state so the next job can retry.
                let mut slot = self.slot.lock().await;
                if let Slot::Loading(current) = &*slot {
                    if current.has_changed().is_err() {
                        *slot = Slot::Unloaded;
                    }
                }
                return Err(ExecError::RuntimeUnavailable(format!(
                    "{} boot was abandoned",
                    self.name
                )));
            }
        }
    }
}

/// One handle per engine kind, passed by reference to the router at
/// construction time. Keeping the handles in an explicit registry (instead
/// of module-level globals) makes them injectable and resettable per test.
pub struct EngineRegistry {
    pub interpreter: EngineHandle<dyn InterpreterEngine>,
    pub container: EngineHandle<dyn ContainerEngine>,
}

impl EngineRegistry {
    pub fn new(
        interpreter: EngineHandle<dyn InterpreterEngine>,
        container: EngineHandle<dyn ContainerEngine>,
    ) -> Self {
        Self {
            interpreter,
            container,
        }
    }

    /// Registry wired to the process-backed engines discovered on this
    /// machine.
    pub fn local(config: &ExecConfig) -> Self {
        Self::new(
            EngineHandle::new(
                "Python",
                "System: Preparing the Python runtime (first run only)...\n",
                Box::new(PythonProcessLoader {
                    binary: config.python_binary.clone(),
                }),
            ),
            EngineHandle::new(
                "Node.js sandbox",
                "System: Booting the Node.js sandbox environment...\n",
                Box::new(NodeProcessLoader {
                    binary: config.node_binary.clone(),
                }),
            ),
        )
    }
}
