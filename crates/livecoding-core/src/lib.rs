//! # Live Coding Core
//!
//! Single-flight compile coordination for a non-reentrant build engine.
//!
//! ## Laws (Compiler Enforced)
//!
//! - No `unwrap()` - returns `Result` instead
//! - No `expect()` - returns `Result` instead
//! - No `panic!()` - returns `Result` instead
//! - No `unsafe` - safe Rust only
//!
//! ## Components
//!
//! - [`LogWindowCapture`]: buffers matching diagnostics while armed
//! - [`CompileCoordinator`]: admission control, execution and snapshot publishing
//! - [`BuildExecutor`]: the one thread allowed to call into the build engine
//! - [`DiagnosticsSink`]: process-wide log fan-out the capture attaches to

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![forbid(unsafe_code)]

pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod engine;
mod error;
pub mod executor;
pub mod log_capture;
pub mod types;

pub use config::{load_config, BridgeConfig, CaptureConfig, EngineConfig, ServerConfig};
pub use coordinator::{CompileCoordinator, CompileSnapshot, CompileTicket, CycleStage};
pub use diagnostics::{DiagnosticsLayer, DiagnosticsSink, ListenerId, LogListener};
pub use engine::{BuildEngine, CompileOutcome, EngineCode};
pub use error::{Error, Result};
pub use executor::BuildExecutor;
pub use log_capture::LogWindowCapture;
pub use types::{CompileResult, LogEntry, Severity};
