//! Log window capture.
//!
//! While armed, buffers every record whose category contains the configured
//! marker. Arming, filtering, appending and the final hand-over all happen
//! under one lock, so a record is either fully in the window or fully out of
//! it and the buffer keeps arrival order.

use std::sync::{Mutex, PoisonError};

use crate::{
    diagnostics::LogListener,
    types::{LogEntry, Severity},
};

/// Default marker a record category must contain to be captured
pub const DEFAULT_CATEGORY_MARKER: &str = "live_coding";

#[derive(Debug, Default)]
struct CaptureState {
    armed: bool,
    entries: Vec<LogEntry>,
}

/// Buffers matching diagnostics for exactly one compile window.
#[derive(Debug)]
pub struct LogWindowCapture {
    marker: String,
    state: Mutex<CaptureState>,
}

impl Default for LogWindowCapture {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORY_MARKER)
    }
}

impl LogWindowCapture {
    /// Create a disarmed capture filtering on `marker`
    #[must_use]
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            state: Mutex::new(CaptureState::default()),
        }
    }

    /// The category marker this capture filters on
    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Clear any previous buffer and arm the capture.
    ///
    /// Calling this while already armed just resets the buffer.
    pub fn start_capture(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.entries.clear();
        state.armed = true;
    }

    /// Offer one record to the capture. Non-matching or out-of-window records
    /// are dropped without effect.
    pub fn record(&self, entry: LogEntry) {
        if !self.matches(&entry.category) {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.armed {
            state.entries.push(entry);
        }
    }

    /// Disarm and take the buffered records in arrival order.
    pub fn stop_capture(&self) -> Vec<LogEntry> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.armed = false;
        std::mem::take(&mut state.entries)
    }

    /// Whether the capture is currently armed
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .armed
    }

    fn matches(&self, category: &str) -> bool {
        !category.is_empty() && category.contains(self.marker.as_str())
    }
}

impl LogListener for LogWindowCapture {
    fn receive(&self, text: &str, severity: Severity, category: &str) {
        // Filter before stamping so unrelated traffic costs one substring check.
        if !self.matches(category) {
            return;
        }
        self.record(LogEntry::new(category, severity, text));
    }
}
