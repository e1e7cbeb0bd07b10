//! Observability events for plinthdb
//!
//! Events are explicit and typed. Each carries its own severity so that
//! high-volume planner detail stays below the default threshold.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Catalog
    /// Table created
    TableCreated,
    /// Index built over existing records
    IndexBuilt,

    // Planning
    /// Access path picked for one relation
    AccessPathSelected,
    /// One join algorithm costed for an operand pair
    JoinCandidateCosted,
    /// One join-order pass finished
    JoinPassComplete,
    /// Single-table query answered by an index scan without search
    IndexFastPath,
    /// Planning aborted
    PlanRejected,

    // Execution
    /// Record stream yielded an error
    ExecutionFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::TableCreated => "TABLE_CREATED",
            Event::IndexBuilt => "INDEX_BUILT",
            Event::AccessPathSelected => "ACCESS_PATH_SELECTED",
            Event::JoinCandidateCosted => "JOIN_CANDIDATE_COSTED",
            Event::JoinPassComplete => "JOIN_PASS_COMPLETE",
            Event::IndexFastPath => "INDEX_FAST_PATH",
            Event::PlanRejected => "PLAN_REJECTED",
            Event::ExecutionFailed => "EXECUTION_FAILED",
        }
    }

    /// Severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::AccessPathSelected | Event::JoinCandidateCosted | Event::JoinPassComplete => {
                Severity::Trace
            }
            Event::TableCreated | Event::IndexBuilt | Event::IndexFastPath => Severity::Info,
            Event::PlanRejected => Severity::Warn,
            Event::ExecutionFailed => Severity::Error,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
