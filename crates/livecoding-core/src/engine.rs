//! Build engine contract.
//!
//! The engine is the non-reentrant compiler the coordinator fronts. It is only
//! ever called from the build executor thread. Engines should emit their
//! diagnostics under a category containing the capture marker so the log
//! window picks them up.

use serde::{Deserialize, Serialize};

use crate::types::CompileResult;

/// Raw result code reported by a build engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineCode {
    /// Compiled and patched changes
    Success,
    /// Nothing to compile
    NoChanges,
    /// Still compiling when the engine stopped waiting
    InProgress,
    /// A compile started elsewhere still owns the engine
    CompileStillActive,
    /// The compile never started
    NotStarted,
    /// The compile failed
    Failure,
    /// The compile was cancelled
    Cancelled,
    /// A code this coordinator does not know
    Unrecognized(u32),
}

impl EngineCode {
    /// Map the engine's code onto the published compile result.
    ///
    /// An engine-side `InProgress` means the engine gave up waiting, which is
    /// published as `TimedOut` and never as the coordinator's own in-flight state.
    #[must_use]
    pub const fn to_compile_result(self) -> CompileResult {
        match self {
            Self::Success => CompileResult::Success,
            Self::NoChanges => CompileResult::NoChanges,
            Self::InProgress => CompileResult::TimedOut,
            Self::CompileStillActive => CompileResult::AlreadyActive,
            Self::NotStarted => CompileResult::NotStarted,
            Self::Failure | Self::Unrecognized(_) => CompileResult::Failure,
            Self::Cancelled => CompileResult::Cancelled,
        }
    }
}

/// What a blocking `compile` call returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOutcome {
    /// Whether the engine accepted the compile request at all
    pub accepted: bool,
    /// Result code reported by the engine
    pub code: EngineCode,
}

impl CompileOutcome {
    #[must_use]
    pub const fn accepted(code: EngineCode) -> Self {
        Self {
            accepted: true,
            code,
        }
    }

    #[must_use]
    pub const fn rejected(code: EngineCode) -> Self {
        Self {
            accepted: false,
            code,
        }
    }
}

/// The compiler the coordinator drives.
pub trait BuildEngine: Send + Sync {
    /// Whether the engine is present at all
    fn is_available(&self) -> bool;

    /// Whether the engine can be enabled for this session; `Err` carries the reason
    fn can_enable(&self) -> Result<(), String>;

    fn is_enabled(&self) -> bool;

    fn enable(&self);

    /// Whether the engine finished starting after being enabled
    fn has_started(&self) -> bool {
        true
    }

    /// Whether a compile is running, including one started by another caller
    fn is_compiling(&self) -> bool;

    /// Run a compile. Blocks until it finishes when `wait_for_completion` is set.
    fn compile(&self, wait_for_completion: bool) -> CompileOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_timeout_is_not_in_progress() {
        assert_eq!(
            EngineCode::InProgress.to_compile_result(),
            CompileResult::TimedOut
        );
        assert!(EngineCode::InProgress.to_compile_result().is_final());
    }

    #[test]
    fn test_mapping_covers_every_code() {
        let cases = [
            (EngineCode::Success, CompileResult::Success),
            (EngineCode::NoChanges, CompileResult::NoChanges),
            (EngineCode::CompileStillActive, CompileResult::AlreadyActive),
            (EngineCode::NotStarted, CompileResult::NotStarted),
            (EngineCode::Failure, CompileResult::Failure),
            (EngineCode::Cancelled, CompileResult::Cancelled),
            (EngineCode::Unrecognized(42), CompileResult::Failure),
        ];
        for (code, expected) in cases {
            assert_eq!(code.to_compile_result(), expected, "{code:?}");
        }
    }
}
