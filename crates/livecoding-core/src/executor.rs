//! Build executor: the one thread allowed to call into the build engine.
//!
//! Jobs are queued on a single-consumer channel and run strictly in order on a
//! dedicated OS thread. Dispatching never blocks the caller.
//!
//! # Example
//!
//! ```ignore
//! let executor = BuildExecutor::spawn()?;
//! executor.dispatch(move || { coordinator.execute_on_build_executor(ticket); })?;
//! executor.shutdown();
//! ```

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{Mutex, PoisonError},
    thread::{self, JoinHandle},
};

use tokio::sync::mpsc;

use crate::{Error, Result};

/// Name of the build executor thread
pub const EXECUTOR_THREAD_NAME: &str = "build-executor";

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to the dedicated build executor thread
pub struct BuildExecutor {
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for BuildExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildExecutor")
            .field("running", &self.is_running())
            .finish()
    }
}

impl BuildExecutor {
    /// Start the executor thread
    ///
    /// # Errors
    ///
    /// Returns error if the OS refuses to spawn the thread
    pub fn spawn() -> Result<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        let handle = thread::Builder::new()
            .name(EXECUTOR_THREAD_NAME.to_string())
            .spawn(move || {
                while let Some(job) = receiver.blocking_recv() {
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        tracing::error!("Build executor job panicked; continuing with next job");
                    }
                }
                tracing::debug!("Build executor queue closed");
            })
            .map_err(|e| Error::IoError(format!("Failed to spawn build executor thread: {e}")))?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            thread: Mutex::new(Some(handle)),
        })
    }

    /// Queue a job to run on the executor thread
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExecutorUnavailable`] after shutdown or if the thread died.
    /// The job is dropped without running.
    pub fn dispatch<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = sender.as_ref() else {
            return Err(Error::ExecutorUnavailable(
                "build executor has shut down".to_string(),
            ));
        };
        sender
            .send(Box::new(job))
            .map_err(|_| Error::ExecutorUnavailable("build executor thread exited".to_string()))
    }

    /// Whether the executor still accepts jobs
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|sender| !sender.is_closed())
    }

    /// Whether the calling thread is the executor thread
    #[must_use]
    pub fn is_executor_thread() -> bool {
        thread::current().name() == Some(EXECUTOR_THREAD_NAME)
    }

    /// Stop accepting jobs, let queued jobs finish, and join the thread.
    ///
    /// Blocks until the running job returns. Idempotent.
    pub fn shutdown(&self) {
        drop(
            self.sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        let handle = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("Build executor thread terminated abnormally");
            }
        }
    }
}

impl Drop for BuildExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
