//! Error types for livecoding-core

use thiserror::Error;

use crate::coordinator::CycleStage;

/// Core error type for compile coordination
#[derive(Debug, Error)]
pub enum Error {
    /// A compile cycle is already reserved or running
    #[error("Live Coding compile already in progress.")]
    AlreadyActive,

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Filesystem or OS errors
    #[error("IO error: {0}")]
    IoError(String),

    /// The build executor refused or lost a job
    #[error("Build executor unavailable: {0}")]
    ExecutorUnavailable(String),

    /// A ticket was handed to a coordinator that did not issue it
    #[error("Compile ticket was issued by a different coordinator")]
    ForeignTicket,

    /// The compile cycle was asked to move along an edge it does not have
    #[error("Invalid compile cycle transition: {from} -> {to}")]
    InvalidTransition {
        /// Stage the cycle was in
        from: CycleStage,
        /// Stage that was requested
        to: CycleStage,
    },
}

/// Result type alias for livecoding-core operations
pub type Result<T> = std::result::Result<T, Error>;
