//! Process-wide diagnostics fan-out.
//!
//! Every log record in the process flows through a [`DiagnosticsSink`], which
//! hands it to each attached [`LogListener`] on the thread that emitted it.
//! [`DiagnosticsLayer`] plugs the sink into a `tracing` subscriber so that
//! ordinary `tracing` events reach the listeners.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, PoisonError, RwLock,
    },
};

use tracing::{
    field::{Field, Visit},
    Event, Subscriber,
};
use tracing_subscriber::layer::Context;

use crate::types::Severity;

/// Receives every record broadcast through a [`DiagnosticsSink`].
///
/// Called from whichever thread emitted the record, so implementations must
/// be cheap and must not block on the build engine.
pub trait LogListener: Send + Sync {
    fn receive(&self, text: &str, severity: Severity, category: &str);
}

/// Handle returned by [`DiagnosticsSink::attach`], used to detach later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

#[derive(Default)]
struct SinkInner {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn LogListener>)>>,
    next_id: AtomicU64,
}

/// Cheap-clone fan-out of log records to attached listeners.
#[derive(Clone, Default)]
pub struct DiagnosticsSink {
    inner: Arc<SinkInner>,
}

impl fmt::Debug for DiagnosticsSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticsSink")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl DiagnosticsSink {
    /// Create a sink with no listeners
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener; it receives every record broadcast from now on
    pub fn attach(&self, listener: Arc<dyn LogListener>) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Detach a listener. Returns false if it was not attached.
    pub fn detach(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let initial_len = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != initial_len
    }

    /// Number of attached listeners
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver a record to every attached listener.
    pub fn broadcast(&self, text: &str, severity: Severity, category: &str) {
        // Listeners run outside the lock: one that logs must not deadlock the sink.
        let listeners: Vec<Arc<dyn LogListener>> = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener.receive(text, severity, category);
        }
    }
}

/// A [`tracing_subscriber::Layer`] that forwards every event to a [`DiagnosticsSink`].
///
/// The event target becomes the record category and the level maps onto
/// [`Severity`].
#[derive(Debug, Clone)]
pub struct DiagnosticsLayer {
    sink: DiagnosticsSink,
}

impl DiagnosticsLayer {
    #[must_use]
    pub const fn new(sink: DiagnosticsSink) -> Self {
        Self { sink }
    }
}

/// Visitor for extracting the message and remaining fields from events.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl MessageVisitor {
    fn into_text(self) -> String {
        if self.fields.is_empty() {
            return self.message;
        }
        let fields = self
            .fields
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(" ");
        if self.message.is_empty() {
            fields
        } else {
            format!("{} {{{fields}}}", self.message)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields
                .push((field.name().to_string(), format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields
                .push((field.name().to_string(), value.to_string()));
        }
    }
}

impl<S> tracing_subscriber::Layer<S> for DiagnosticsLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        self.sink.broadcast(
            &visitor.into_text(),
            Severity::from(*metadata.level()),
            metadata.target(),
        );
    }
}
