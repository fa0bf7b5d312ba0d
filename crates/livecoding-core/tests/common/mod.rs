//! Shared fixtures for coordinator integration tests

#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc, Arc, Mutex,
    },
    time::Duration,
};

use livecoding_core::{
    BuildEngine, BuildExecutor, CaptureConfig, CompileCoordinator, CompileOutcome,
    DiagnosticsSink, EngineCode, Severity,
};

pub const CATEGORY: &str = "live_coding";

/// Engine whose behaviour is set per test.
///
/// When built with [`FakeEngine::gated`], every compile emits its lines,
/// signals `started`, then blocks until the test sends on the gate.
pub struct FakeEngine {
    sink: DiagnosticsSink,
    pub available: AtomicBool,
    pub compiling: AtomicBool,
    pub enabled: AtomicBool,
    /// Reported by `has_started`; `enable` sets it
    pub session_started: AtomicBool,
    /// `can_enable` fails with this reason when set
    pub enable_error: Mutex<Option<String>>,
    pub enable_calls: AtomicUsize,
    pub lines: Vec<(Severity, String)>,
    pub outcome: Mutex<CompileOutcome>,
    pub compiles: AtomicUsize,
    /// Whether the last compile ran on the build executor thread
    pub compiled_on_executor: AtomicBool,
    gate: Mutex<Option<mpsc::Receiver<()>>>,
    started: Mutex<Option<mpsc::Sender<()>>>,
}

impl FakeEngine {
    pub fn new(sink: DiagnosticsSink, outcome: CompileOutcome) -> Self {
        Self {
            sink,
            available: AtomicBool::new(true),
            compiling: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
            session_started: AtomicBool::new(true),
            enable_error: Mutex::new(None),
            enable_calls: AtomicUsize::new(0),
            lines: Vec::new(),
            outcome: Mutex::new(outcome),
            compiles: AtomicUsize::new(0),
            compiled_on_executor: AtomicBool::new(false),
            gate: Mutex::new(None),
            started: Mutex::new(None),
        }
    }

    pub fn with_lines(mut self, lines: &[(Severity, &str)]) -> Self {
        self.lines = lines
            .iter()
            .map(|(severity, text)| (*severity, (*text).to_string()))
            .collect();
        self
    }

    /// Returns `(release, started)`: send on `release` to let a compile finish,
    /// receive on `started` to know a compile has begun
    pub fn gated(self) -> (Self, mpsc::Sender<()>, mpsc::Receiver<()>) {
        let (release_tx, release_rx) = mpsc::channel();
        let (started_tx, started_rx) = mpsc::channel();
        *self.gate.lock().unwrap() = Some(release_rx);
        *self.started.lock().unwrap() = Some(started_tx);
        (self, release_tx, started_rx)
    }

    pub fn set_outcome(&self, outcome: CompileOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }
}

impl BuildEngine for FakeEngine {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn can_enable(&self) -> Result<(), String> {
        match self.enable_error.lock().unwrap().as_ref() {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn has_started(&self) -> bool {
        self.session_started.load(Ordering::SeqCst)
    }

    fn enable(&self) {
        self.enable_calls.fetch_add(1, Ordering::SeqCst);
        self.enabled.store(true, Ordering::SeqCst);
        self.session_started.store(true, Ordering::SeqCst);
    }

    fn is_compiling(&self) -> bool {
        self.compiling.load(Ordering::SeqCst)
    }

    fn compile(&self, _wait_for_completion: bool) -> CompileOutcome {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        self.compiled_on_executor
            .store(BuildExecutor::is_executor_thread(), Ordering::SeqCst);
        for (severity, text) in &self.lines {
            self.sink.broadcast(text, *severity, CATEGORY);
        }
        if let Some(started) = self.started.lock().unwrap().as_ref() {
            let _ = started.send(());
        }
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            let _ = gate.recv_timeout(Duration::from_secs(10));
        }
        *self.outcome.lock().unwrap()
    }
}

/// Initialized coordinator over `engine`
pub fn coordinator(engine: Arc<FakeEngine>, sink: DiagnosticsSink) -> CompileCoordinator {
    let coordinator = CompileCoordinator::new(engine, sink, &CaptureConfig::default());
    coordinator.initialize();
    coordinator
}

pub fn success() -> CompileOutcome {
    CompileOutcome::accepted(EngineCode::Success)
}
