//! Observability subsystem for kek
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Monotonic counters
//!
//! Observability is read-only: nothing here feeds back into engine behavior,
//! and a failed log write never fails an operation.
//!
//! ```ignore
//! use kek::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::DocumentCreateCommit, &[("id", "dd1")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

fn severity_for(event: Event) -> Severity {
    match event {
        Event::QueryOperatorIgnored => Severity::Warn,
        e if e.is_failure() => Severity::Error,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_for_events() {
        assert_eq!(severity_for(Event::DocumentUpdateFailed), Severity::Error);
        assert_eq!(severity_for(Event::ChainAppend), Severity::Info);
        assert_eq!(severity_for(Event::QueryOperatorIgnored), Severity::Warn);
    }

    #[test]
    fn test_log_event_does_not_panic() {
        log_event(Event::QueryBegin);
        log_event_with_fields(Event::QueryComplete, &[("returned", "0")]);
    }
}
