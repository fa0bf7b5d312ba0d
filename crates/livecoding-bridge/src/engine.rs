//! Build engine backed by an external command such as `cargo build`.
//!
//! Output lines are re-emitted as tracing events under the `live_coding`
//! target, where the diagnostics layer hands them to the log window.

use std::{
    io::{BufRead, BufReader, Read},
    path::PathBuf,
    process::{Child, Command, ExitStatus, Stdio},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread,
    time::{Duration, Instant},
};

use livecoding_core::{BuildEngine, CompileOutcome, EngineCode, EngineConfig};

/// Tracing target for compiler output
pub const OUTPUT_TARGET: &str = "live_coding";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long output readers may keep draining after a timed-out child is killed
const READER_GRACE: Duration = Duration::from_millis(500);

/// Runs the configured build command for every compile
#[derive(Debug)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
    enabled: AtomicBool,
    compiling: Arc<AtomicBool>,
}

/// Clears the compiling flag when a run ends, however it ends
struct CompilingGuard(Arc<AtomicBool>);

impl Drop for CompilingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
struct Invocation {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl CommandEngine {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            working_dir: config.working_dir.clone(),
            timeout: config.timeout_secs.map(Duration::from_secs),
            enabled: AtomicBool::new(false),
            compiling: Arc::new(AtomicBool::new(false)),
        }
    }

    fn invocation(&self) -> Invocation {
        Invocation {
            program: self.program.clone(),
            args: self.args.clone(),
            working_dir: self.working_dir.clone(),
            timeout: self.timeout,
        }
    }
}

impl BuildEngine for CommandEngine {
    fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    fn can_enable(&self) -> Result<(), String> {
        match &self.working_dir {
            Some(dir) if !dir.is_dir() => Err(format!(
                "working directory {} does not exist",
                dir.display()
            )),
            _ => Ok(()),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn enable(&self) {
        if !self.enabled.swap(true, Ordering::SeqCst) {
            tracing::info!(program = %self.program, "Build command enabled for this session");
        }
    }

    fn is_compiling(&self) -> bool {
        self.compiling.load(Ordering::SeqCst)
    }

    fn compile(&self, wait_for_completion: bool) -> CompileOutcome {
        if self.compiling.swap(true, Ordering::SeqCst) {
            return CompileOutcome::rejected(EngineCode::CompileStillActive);
        }
        let guard = CompilingGuard(Arc::clone(&self.compiling));

        let mut child = match self.invocation().spawn() {
            Ok(child) => child,
            Err(error) => {
                tracing::error!(program = %self.program, %error, "Failed to start build command");
                return CompileOutcome::rejected(EngineCode::NotStarted);
            }
        };

        if wait_for_completion {
            let code = self.invocation().finish(&mut child);
            drop(guard);
            return CompileOutcome::accepted(code);
        }

        let invocation = self.invocation();
        let spawned = thread::Builder::new()
            .name("build-command".to_string())
            .spawn(move || {
                let _guard = guard;
                let code = invocation.finish(&mut child);
                tracing::debug!(?code, "Detached build command finished");
            });
        match spawned {
            Ok(_) => CompileOutcome::accepted(EngineCode::InProgress),
            Err(error) => {
                tracing::error!(%error, "Failed to start build command watcher");
                CompileOutcome::rejected(EngineCode::NotStarted)
            }
        }
    }
}

impl Invocation {
    fn spawn(&self) -> std::io::Result<Child> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        tracing::debug!(program = %self.program, args = ?self.args, "Spawning build command");
        command.spawn()
    }

    /// Stream output, wait for exit or timeout, and map the exit to a code
    fn finish(&self, child: &mut Child) -> EngineCode {
        let saw_compiling = Arc::new(AtomicBool::new(false));
        // Disconnects once every reader thread has exited
        let (alive_tx, readers_done) = mpsc::channel::<()>();
        if let Some(out) = child.stdout.take() {
            forward_lines(out, Arc::clone(&saw_compiling), alive_tx.clone());
        }
        if let Some(err) = child.stderr.take() {
            forward_lines(err, Arc::clone(&saw_compiling), alive_tx.clone());
        }
        drop(alive_tx);

        let started = Instant::now();
        let waited = match self.timeout {
            Some(timeout) => wait_with_timeout(child, timeout),
            None => child.wait().map(Some),
        };

        // Grandchildren can outlive the child and keep the pipes open, so a
        // configured timeout also bounds how long output is drained
        match self.timeout {
            Some(timeout) => {
                let drain_deadline = started + timeout + READER_GRACE;
                let remaining = drain_deadline.saturating_duration_since(Instant::now());
                if let Err(mpsc::RecvTimeoutError::Timeout) = readers_done.recv_timeout(remaining) {
                    tracing::warn!(
                        program = %self.program,
                        "Build command output still open past the timeout; detaching readers"
                    );
                }
            }
            None => {
                let _ = readers_done.recv();
            }
        }

        match waited {
            Ok(Some(status)) => exit_code(status, saw_compiling.load(Ordering::SeqCst)),
            Ok(None) => {
                tracing::warn!(program = %self.program, "Build command timed out; killed");
                EngineCode::InProgress
            }
            Err(error) => {
                tracing::error!(program = %self.program, %error, "Lost track of build command");
                EngineCode::Failure
            }
        }
    }
}

/// `Ok(None)` when the deadline passed and the child was killed
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            child.kill()?;
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn exit_code(status: ExitStatus, saw_compiling: bool) -> EngineCode {
    match status.code() {
        Some(0) if saw_compiling => EngineCode::Success,
        Some(0) => EngineCode::NoChanges,
        Some(_) => EngineCode::Failure,
        None => EngineCode::Cancelled,
    }
}

fn forward_lines<R>(stream: R, saw_compiling: Arc<AtomicBool>, alive: mpsc::Sender<()>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let _alive = alive;
        for line in BufReader::new(stream).lines().map_while(Result::ok) {
            let trimmed = line.trim_start();
            if trimmed.starts_with("Compiling ") {
                saw_compiling.store(true, Ordering::SeqCst);
            }
            emit_line(trimmed);
        }
    });
}

fn emit_line(line: &str) {
    if line.starts_with("error") {
        tracing::error!(target: OUTPUT_TARGET, "{line}");
    } else if line.starts_with("warning") {
        tracing::warn!(target: OUTPUT_TARGET, "{line}");
    } else {
        tracing::info!(target: OUTPUT_TARGET, "{line}");
    }
}
