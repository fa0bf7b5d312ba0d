//! The unit of truth exposed to pollers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::messages;
use crate::types::{CompileResult, LogEntry};

/// Latest published compile outcome plus the live in-flight flag.
///
/// Entries, result and timestamp always come from the same cycle; the
/// coordinator replaces the whole value under one lock.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompileSnapshot {
    /// Records captured during the cycle's compile window
    pub entries: Vec<LogEntry>,
    /// When the cycle was published; `None` before the first result
    pub timestamp: Option<DateTime<Utc>>,
    /// Result of the cycle
    pub result: CompileResult,
    /// Whether any cycle has ever been published
    pub has_result: bool,
    /// Error message for the cycle, `None` on clean results
    pub error_message: Option<String>,
    /// Whether a cycle is reserved or executing right now
    pub in_progress: bool,
}

impl CompileSnapshot {
    /// Snapshot of a finished cycle
    #[must_use]
    pub fn completed(
        entries: Vec<LogEntry>,
        result: CompileResult,
        error_message: Option<String>,
    ) -> Self {
        Self {
            entries,
            timestamp: Some(Utc::now()),
            result,
            has_result: true,
            error_message,
            in_progress: false,
        }
    }

    /// Human-readable message describing this snapshot
    #[must_use]
    pub fn status_message(&self) -> String {
        if self.in_progress {
            return messages::COMPILE_IN_PROGRESS.to_string();
        }
        if let Some(error) = &self.error_message {
            return error.clone();
        }
        if !self.has_result {
            return messages::NO_RESULT_YET.to_string();
        }
        match self.result {
            CompileResult::NoChanges => messages::COMPLETED_WITHOUT_CHANGES.to_string(),
            _ => messages::COMPLETED_WITH_CHANGES.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_has_no_result() {
        let snapshot = CompileSnapshot::default();
        assert!(!snapshot.has_result);
        assert!(snapshot.timestamp.is_none());
        assert_eq!(snapshot.result, CompileResult::NotStarted);
        assert_eq!(snapshot.status_message(), messages::NO_RESULT_YET);
    }

    #[test]
    fn test_error_message_describes_finished_cycle() {
        let snapshot = CompileSnapshot::completed(
            Vec::new(),
            CompileResult::Failure,
            Some("boom".to_string()),
        );
        assert_eq!(snapshot.status_message(), "boom");
    }

    #[test]
    fn test_in_progress_message_over_stale_error() {
        let mut snapshot = CompileSnapshot::completed(
            Vec::new(),
            CompileResult::Failure,
            Some("boom".to_string()),
        );
        snapshot.in_progress = true;
        assert_eq!(snapshot.status_message(), messages::COMPILE_IN_PROGRESS);
        assert_eq!(snapshot.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_in_progress_message_over_stale_result() {
        let mut snapshot = CompileSnapshot::completed(Vec::new(), CompileResult::Success, None);
        snapshot.in_progress = true;
        assert_eq!(snapshot.status_message(), messages::COMPILE_IN_PROGRESS);
    }

    #[test]
    fn test_clean_results_describe_changes() {
        let changed = CompileSnapshot::completed(Vec::new(), CompileResult::Success, None);
        let unchanged = CompileSnapshot::completed(Vec::new(), CompileResult::NoChanges, None);
        assert_eq!(changed.status_message(), messages::COMPLETED_WITH_CHANGES);
        assert_eq!(unchanged.status_message(), messages::COMPLETED_WITHOUT_CHANGES);
    }
}
