//! Compile outcomes and captured log records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Terminal outcome of one compile cycle.
///
/// `InProgress` is the coordinator's own "a cycle is running" signal and is
/// never stored as a finished result. An engine that gives up waiting is
/// reported as `TimedOut` instead, so the two can never be confused in a
/// snapshot.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
)]
pub enum CompileResult {
    /// No compile has been attempted, or a precondition stopped it
    #[default]
    NotStarted,
    /// A cycle is currently reserved or executing
    InProgress,
    /// Compiled and patched changes
    Success,
    /// Compiled, nothing changed
    NoChanges,
    /// Compile failed
    Failure,
    /// The engine cancelled the compile
    Cancelled,
    /// The engine stopped waiting before the compile finished
    TimedOut,
    /// Another compile owned the engine
    AlreadyActive,
}

impl CompileResult {
    /// Whether this result may be published as the outcome of a finished cycle
    #[must_use]
    pub const fn is_final(self) -> bool {
        !matches!(self, Self::InProgress)
    }

    /// Whether the compile produced usable code
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::NoChanges)
    }
}

/// Severity of a diagnostic record
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
)]
pub enum Severity {
    Display,
    Warning,
    Error,
    Verbose,
}

impl From<tracing::Level> for Severity {
    fn from(level: tracing::Level) -> Self {
        if level == tracing::Level::ERROR {
            Self::Error
        } else if level == tracing::Level::WARN {
            Self::Warning
        } else if level == tracing::Level::INFO {
            Self::Display
        } else {
            Self::Verbose
        }
    }
}

/// One diagnostic record captured during a compile window.
///
/// Entries are never mutated after creation; snapshots hold their own copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the record reached the capture
    pub timestamp: DateTime<Utc>,
    /// Category (tracing target) the record was emitted under
    pub category: String,
    /// Severity of the record
    pub severity: Severity,
    /// Rendered message text
    pub message: String,
}

impl LogEntry {
    /// Create an entry stamped with the current time
    #[must_use]
    pub fn new(category: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            category: category.into(),
            severity,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_result_names_round_trip_through_strings() {
        for result in CompileResult::iter() {
            let parsed = CompileResult::from_str(result.as_ref());
            assert_eq!(parsed.ok(), Some(result));
        }
    }

    #[test]
    fn test_only_in_progress_is_transient() {
        let transient: Vec<_> = CompileResult::iter().filter(|r| !r.is_final()).collect();
        assert_eq!(transient, vec![CompileResult::InProgress]);
    }

    #[test]
    fn test_success_covers_no_changes() {
        assert!(CompileResult::Success.is_success());
        assert!(CompileResult::NoChanges.is_success());
        assert!(!CompileResult::TimedOut.is_success());
        assert!(!CompileResult::AlreadyActive.is_success());
    }

    #[test]
    fn test_severity_from_tracing_level() {
        assert_eq!(Severity::from(tracing::Level::ERROR), Severity::Error);
        assert_eq!(Severity::from(tracing::Level::WARN), Severity::Warning);
        assert_eq!(Severity::from(tracing::Level::INFO), Severity::Display);
        assert_eq!(Severity::from(tracing::Level::DEBUG), Severity::Verbose);
        assert_eq!(Severity::from(tracing::Level::TRACE), Severity::Verbose);
    }

    #[test]
    fn test_result_serializes_as_variant_name() -> serde_json::Result<()> {
        let json = serde_json::to_string(&CompileResult::AlreadyActive)?;
        assert_eq!(json, "\"AlreadyActive\"");
        Ok(())
    }
}
