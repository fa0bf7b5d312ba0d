//! JSON bodies for the trigger and status routes

use chrono::{DateTime, SecondsFormat, Utc};
use livecoding_core::{CompileResult, CompileSnapshot, LogEntry, Severity};
use serde::{Deserialize, Serialize};

/// `status` field of every response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// One captured log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogLinePayload {
    pub time_utc: String,
    pub category: String,
    pub verbosity: Severity,
    pub message: String,
}

impl From<&LogEntry> for LogLinePayload {
    fn from(entry: &LogEntry) -> Self {
        Self {
            time_utc: format_utc(entry.timestamp),
            category: entry.category.clone(),
            verbosity: entry.severity,
            message: entry.message.clone(),
        }
    }
}

/// Snapshot as it goes over the wire.
///
/// `compileStarted` is only present on an accepted trigger; `timestampUtc`
/// only once a result has been published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilePayload {
    pub status: ResponseStatus,
    pub compile_result: CompileResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile_started: Option<bool>,
    pub compile_in_progress: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_utc: Option<String>,
    pub log: Vec<LogLinePayload>,
    pub has_previous_result: bool,
    pub route: String,
}

impl CompilePayload {
    /// Plain rendering of a snapshot, as served by the status route
    #[must_use]
    pub fn from_snapshot(snapshot: &CompileSnapshot, route: &str) -> Self {
        Self {
            status: ResponseStatus::Ok,
            compile_result: snapshot.result,
            compile_started: None,
            compile_in_progress: snapshot.in_progress,
            message: snapshot.status_message(),
            timestamp_utc: snapshot.timestamp.map(format_utc),
            log: snapshot.entries.iter().map(LogLinePayload::from).collect(),
            has_previous_result: snapshot.has_result,
            route: route.to_string(),
        }
    }

    /// Acknowledgement for an admitted trigger; the snapshot predates the new cycle
    #[must_use]
    pub fn accepted(snapshot: &CompileSnapshot, route: &str, message: &str) -> Self {
        Self {
            compile_started: Some(true),
            compile_in_progress: true,
            message: message.to_string(),
            ..Self::from_snapshot(snapshot, route)
        }
    }

    /// Error body; keeps the snapshot fields so callers see what is running
    #[must_use]
    pub fn error(
        snapshot: &CompileSnapshot,
        route: &str,
        compile_result: CompileResult,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: ResponseStatus::Error,
            compile_result,
            message: message.into(),
            ..Self::from_snapshot(snapshot, route)
        }
    }
}

/// RFC 3339, UTC, millisecond precision
#[must_use]
pub fn format_utc(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
