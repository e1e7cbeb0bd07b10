//! Observability subsystem for plinthdb
//!
//! - Structured logging (JSON lines)
//! - Monotonic planner metrics
//! - Lifecycle event tracing
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on planning or execution
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use plinthdb::observability::{Logger, Event, MetricsRegistry, ObservationScope};
//!
//! Logger::info("TABLE_CREATED", &[("table", "t")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_optimal_plans();
//!
//! let scope = ObservationScope::new("PLAN_OPTIMAL");
//! scope.complete();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::TableCreated);
        log_event_with_fields(Event::IndexBuilt, &[("table", "t"), ("column", "c")]);
    }
}
