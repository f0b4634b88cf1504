//! Observability subsystem for corpusdb
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Monotonic counters
//!
//! Observability is read-only: nothing here feeds back into control flow.
//!
//! ```ignore
//! use corpusdb::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::SegmentClosed, &[("segment", "4f1c...")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

fn severity_for(event: Event) -> Severity {
    match event {
        Event::IndexBuildFailed => Severity::Error,
        Event::AccessDenied | Event::SegmentReleasePending => Severity::Warn,
        Event::IndexBuildStart | Event::OwnerRegistered | Event::OwnerDeregistered => {
            Severity::Trace
        }
        _ => Severity::Info,
    }
}

/// Log a lifecycle event
pub fn log_event(event: Event) {
    Logger::log(severity_for(event), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity_for(event), event.as_str(), fields);
}
