//! Fixed, user-visible messages for every compile outcome.
//!
//! These strings are stable: they appear both in the log and in the JSON
//! `message` field.

use crate::engine::EngineCode;

pub const CAPTURE_UNAVAILABLE: &str = "Live Coding log capture is not available.";
pub const ENGINE_UNAVAILABLE: &str =
    "Live Coding module is unavailable. Enable Live Coding first.";
pub const ENGINE_ALREADY_COMPILING: &str = "A Live Coding compile is already in progress.";
pub const REQUEST_REJECTED: &str = "Live Coding compile request was rejected.";
pub const ENGINE_PANICKED: &str = "Live Coding compile aborted: the build engine panicked.";

pub const COMPLETED_WITH_CHANGES: &str = "Live Coding compile completed with changes.";
pub const COMPLETED_WITHOUT_CHANGES: &str = "Live Coding compile completed with no changes.";
pub const COMPILE_STARTED: &str = "Live Coding compile started.";
pub const COMPILE_IN_PROGRESS: &str = "Live Coding compile in progress.";
pub const NO_RESULT_YET: &str = "No Live Coding compile has run yet.";

/// Message for an engine that refuses to be enabled
#[must_use]
pub fn cannot_enable(reason: &str) -> String {
    format!("Live Coding cannot be enabled: {reason}")
}

/// Error message for an accepted compile's result code; `None` for clean results
#[must_use]
pub const fn outcome_error(code: EngineCode) -> Option<&'static str> {
    match code {
        EngineCode::Success | EngineCode::NoChanges => None,
        EngineCode::InProgress => {
            Some("Live Coding compile did not complete within the allotted time.")
        }
        EngineCode::CompileStillActive => Some("Another Live Coding compile is still active."),
        EngineCode::NotStarted => Some("Live Coding compile could not be started."),
        EngineCode::Failure => Some("Live Coding compile failed. See log for details."),
        EngineCode::Cancelled => Some("Live Coding compile was cancelled."),
        EngineCode::Unrecognized(_) => Some("Live Coding compile result is unknown."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_results_have_no_error() {
        assert_eq!(outcome_error(EngineCode::Success), None);
        assert_eq!(outcome_error(EngineCode::NoChanges), None);
    }

    #[test]
    fn test_unrecognized_code_gets_generic_message() {
        assert_eq!(
            outcome_error(EngineCode::Unrecognized(99)),
            Some("Live Coding compile result is unknown.")
        );
    }

    #[test]
    fn test_every_failure_code_has_distinct_message() {
        let codes = [
            EngineCode::InProgress,
            EngineCode::CompileStillActive,
            EngineCode::NotStarted,
            EngineCode::Failure,
            EngineCode::Cancelled,
            EngineCode::Unrecognized(0),
        ];
        let mut messages: Vec<_> = codes.iter().filter_map(|c| outcome_error(*c)).collect();
        messages.sort_unstable();
        messages.dedup();
        assert_eq!(messages.len(), codes.len());
    }
}
