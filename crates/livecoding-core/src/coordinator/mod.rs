//! Single-flight compile coordinator.
//!
//! Bridges any number of caller threads to the one build executor thread:
//!
//! - [`CompileCoordinator::try_begin_compile`] is the admission gate. It
//!   checks and sets the busy flag in one critical section and never touches
//!   the engine.
//! - [`CompileCoordinator::execute_on_build_executor`] runs one cycle on the
//!   build executor: preconditions, capture window, blocking compile, publish,
//!   and only then release of the busy flag.
//! - [`CompileCoordinator::get_snapshot`] hands out copies of the last
//!   published cycle plus the live in-flight flag.
//!
//! The busy flag and the snapshot sit behind separate locks that are never
//! held at the same time.

mod cycle;
pub mod messages;
mod snapshot;

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

pub use cycle::CycleStage;
pub use snapshot::CompileSnapshot;

use crate::{
    config::CaptureConfig,
    diagnostics::{DiagnosticsSink, ListenerId, LogListener},
    engine::{BuildEngine, CompileOutcome, EngineCode},
    executor::BuildExecutor,
    log_capture::LogWindowCapture,
    types::{CompileResult, LogEntry},
    Error, Result,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct CoordinatorInner {
    engine: Arc<dyn BuildEngine>,
    sink: DiagnosticsSink,
    capture: Arc<LogWindowCapture>,
    listener: Mutex<Option<ListenerId>>,
    stage: Mutex<CycleStage>,
    snapshot: Mutex<CompileSnapshot>,
}

/// Outcome of one cycle before it is published
struct CycleOutcome {
    entries: Vec<LogEntry>,
    result: CompileResult,
    error_message: Option<String>,
}

impl CycleOutcome {
    fn precondition_failed(result: CompileResult, message: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            result,
            error_message: Some(message.into()),
        }
    }
}

/// Arms the capture for the lifetime of the guard; disarms on every exit path.
struct CaptureWindow<'a> {
    capture: &'a LogWindowCapture,
    open: bool,
}

impl<'a> CaptureWindow<'a> {
    fn open(capture: &'a LogWindowCapture) -> Self {
        capture.start_capture();
        Self {
            capture,
            open: true,
        }
    }

    fn close(mut self) -> Vec<LogEntry> {
        self.open = false;
        self.capture.stop_capture()
    }
}

impl Drop for CaptureWindow<'_> {
    fn drop(&mut self) {
        if self.open {
            drop(self.capture.stop_capture());
        }
    }
}

impl CoordinatorInner {
    fn stage(&self) -> CycleStage {
        *lock(&self.stage)
    }

    fn advance(&self, next: CycleStage) -> Result<()> {
        let mut stage = lock(&self.stage);
        if !stage.can_transition_to(next) {
            let from = *stage;
            drop(stage);
            tracing::error!(
                %from,
                to = %next,
                allowed = ?from.valid_next_states(),
                "Rejected compile cycle transition"
            );
            return Err(Error::InvalidTransition { from, to: next });
        }
        *stage = next;
        Ok(())
    }

    /// Release the busy flag for a ticket that will never finish its cycle
    fn abandon(&self) {
        let mut stage = lock(&self.stage);
        let from = *stage;
        *stage = CycleStage::Idle;
        drop(stage);
        if from.is_busy() {
            tracing::warn!(%from, "Compile ticket dropped before its cycle completed; releasing");
        }
    }

    fn is_initialized(&self) -> bool {
        lock(&self.listener).is_some()
    }

    fn publish(&self, snapshot: CompileSnapshot) {
        *lock(&self.snapshot) = snapshot;
    }

    fn run_cycle(&self) -> CycleOutcome {
        if !self.is_initialized() {
            tracing::error!("{}", messages::CAPTURE_UNAVAILABLE);
            return CycleOutcome::precondition_failed(
                CompileResult::NotStarted,
                messages::CAPTURE_UNAVAILABLE,
            );
        }

        let engine = &self.engine;
        if !engine.is_available() {
            tracing::error!("{}", messages::ENGINE_UNAVAILABLE);
            return CycleOutcome::precondition_failed(
                CompileResult::NotStarted,
                messages::ENGINE_UNAVAILABLE,
            );
        }

        if let Err(reason) = engine.can_enable() {
            let message = messages::cannot_enable(&reason);
            tracing::error!("{message}");
            return CycleOutcome::precondition_failed(CompileResult::NotStarted, message);
        }

        if !engine.is_enabled() {
            engine.enable();
        }
        if !engine.has_started() {
            engine.enable();
        }

        if engine.is_compiling() {
            tracing::warn!("{}", messages::ENGINE_ALREADY_COMPILING);
            return CycleOutcome::precondition_failed(
                CompileResult::AlreadyActive,
                messages::ENGINE_ALREADY_COMPILING,
            );
        }

        tracing::info!("Live Coding compile started via HTTP endpoint.");

        let window = CaptureWindow::open(&self.capture);
        let compiled = panic::catch_unwind(AssertUnwindSafe(|| engine.compile(true)));
        let entries = window.close();

        match compiled {
            Ok(outcome) => Self::classify(outcome, entries),
            Err(_) => {
                tracing::error!("{}", messages::ENGINE_PANICKED);
                CycleOutcome {
                    entries,
                    result: CompileResult::Failure,
                    error_message: Some(messages::ENGINE_PANICKED.to_string()),
                }
            }
        }
    }

    fn classify(outcome: CompileOutcome, entries: Vec<LogEntry>) -> CycleOutcome {
        let result = outcome.code.to_compile_result();

        if !outcome.accepted {
            tracing::error!("{}", messages::REQUEST_REJECTED);
            return CycleOutcome {
                entries,
                result,
                error_message: Some(messages::REQUEST_REJECTED.to_string()),
            };
        }

        let error_message = messages::outcome_error(outcome.code);
        match (outcome.code, error_message) {
            (EngineCode::Success, _) => tracing::info!("{}", messages::COMPLETED_WITH_CHANGES),
            (EngineCode::NoChanges, _) => {
                tracing::info!("{}", messages::COMPLETED_WITHOUT_CHANGES);
            }
            (
                EngineCode::InProgress
                | EngineCode::CompileStillActive
                | EngineCode::Cancelled
                | EngineCode::Unrecognized(_),
                Some(message),
            ) => tracing::warn!("{message}"),
            (_, Some(message)) => tracing::error!("{message}"),
            (_, None) => {}
        }

        CycleOutcome {
            entries,
            result,
            error_message: error_message.map(str::to_string),
        }
    }
}

/// Proof that [`CompileCoordinator::try_begin_compile`] admitted a cycle.
///
/// Consumed by [`CompileCoordinator::execute_on_build_executor`]. Dropping an
/// unexecuted ticket releases the busy flag.
#[must_use = "an admitted compile must be executed or it only holds the busy flag until dropped"]
pub struct CompileTicket {
    inner: Arc<CoordinatorInner>,
    finished: bool,
}

impl fmt::Debug for CompileTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileTicket")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Drop for CompileTicket {
    fn drop(&mut self) {
        if !self.finished {
            self.inner.abandon();
        }
    }
}

/// Cheap-clone handle to the process-wide compile coordinator
#[derive(Clone)]
pub struct CompileCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl fmt::Debug for CompileCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileCoordinator")
            .field("stage", &self.inner.stage())
            .field("initialized", &self.inner.is_initialized())
            .field("marker", &self.inner.capture.marker())
            .finish_non_exhaustive()
    }
}

impl CompileCoordinator {
    /// Create a coordinator. Call [`Self::initialize`] before executing cycles.
    #[must_use]
    pub fn new(engine: Arc<dyn BuildEngine>, sink: DiagnosticsSink, capture: &CaptureConfig) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                engine,
                sink,
                capture: Arc::new(LogWindowCapture::new(capture.category_marker.clone())),
                listener: Mutex::new(None),
                stage: Mutex::new(CycleStage::Idle),
                snapshot: Mutex::new(CompileSnapshot::default()),
            }),
        }
    }

    /// Attach the log capture to the sink and reset the snapshot. Idempotent.
    pub fn initialize(&self) {
        {
            let mut listener = lock(&self.inner.listener);
            if listener.is_none() {
                let capture: Arc<dyn LogListener> = self.inner.capture.clone();
                *listener = Some(self.inner.sink.attach(capture));
            }
        }
        self.inner.publish(CompileSnapshot::default());
        tracing::debug!(marker = self.inner.capture.marker(), "Compile coordinator initialized");
    }

    /// Detach the log capture and clear the snapshot. Idempotent.
    pub fn shutdown(&self) {
        let detached = lock(&self.inner.listener).take();
        if let Some(id) = detached {
            self.inner.sink.detach(id);
            drop(self.inner.capture.stop_capture());
            tracing::debug!(%id, "Compile coordinator shut down");
        }
        self.inner.publish(CompileSnapshot::default());
    }

    /// Whether the log capture is attached
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.is_initialized()
    }

    /// Current cycle stage
    #[must_use]
    pub fn stage(&self) -> CycleStage {
        self.inner.stage()
    }

    /// Whether a cycle is reserved or executing
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.stage().is_busy()
    }

    /// The capture this coordinator arms around each compile
    #[must_use]
    pub fn capture(&self) -> Arc<LogWindowCapture> {
        Arc::clone(&self.inner.capture)
    }

    /// Admit a compile cycle if none is in flight.
    ///
    /// Returns in bounded time from any thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyActive`] if a cycle is already reserved or running.
    pub fn try_begin_compile(&self) -> Result<CompileTicket> {
        let mut stage = lock(&self.inner.stage);
        if stage.is_busy() {
            return Err(Error::AlreadyActive);
        }
        *stage = CycleStage::Reserved;
        drop(stage);

        Ok(CompileTicket {
            inner: Arc::clone(&self.inner),
            finished: false,
        })
    }

    /// Run one admitted cycle and publish its snapshot.
    ///
    /// Must run on the build executor; blocks for the whole compile. The busy
    /// flag is released only after the snapshot is published. Returns the
    /// published snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ForeignTicket`] for a ticket from another coordinator and
    /// [`Error::InvalidTransition`] if the cycle state was corrupted.
    pub fn execute_on_build_executor(&self, mut ticket: CompileTicket) -> Result<CompileSnapshot> {
        if !Arc::ptr_eq(&ticket.inner, &self.inner) {
            return Err(Error::ForeignTicket);
        }
        if !BuildExecutor::is_executor_thread() {
            tracing::warn!("Compile cycle running outside the build executor thread");
        }

        self.inner.advance(CycleStage::Executing)?;
        let outcome = self.inner.run_cycle();

        self.inner.advance(CycleStage::Publishing)?;
        let snapshot =
            CompileSnapshot::completed(outcome.entries, outcome.result, outcome.error_message);
        self.inner.publish(snapshot.clone());

        self.inner.advance(CycleStage::Idle)?;
        ticket.finished = true;

        Ok(snapshot)
    }

    /// Copy of the current snapshot with the live in-flight flag. Never blocks
    /// on a running compile.
    #[must_use]
    pub fn get_snapshot(&self) -> CompileSnapshot {
        // Read the busy flag before the snapshot: publish happens before release,
        // so an idle reading here guarantees the snapshot below is fresh.
        let in_progress = self.is_busy();
        let mut snapshot = lock(&self.inner.snapshot).clone();
        snapshot.in_progress = in_progress;
        snapshot
    }
}
