//! Planner error types
//!
//! Error codes:
//! - PLINTH_PLAN_INVALID (REJECT)
//! - PLINTH_PLAN_MULTIPLE_PROJECTIONS (REJECT)
//! - PLINTH_PLAN_EMPTY_PROJECTION (REJECT)
//! - PLINTH_PLAN_PROJECTION_CONFLICT (REJECT)
//! - PLINTH_PLAN_UNSUPPORTED_JOIN (REJECT)
//! - PLINTH_PLAN_DISCONNECTED_JOIN (REJECT)
//! - PLINTH_PLAN_UNKNOWN_COLUMN (REJECT)
//! - PLINTH_PLAN_AGGREGATE_TYPE (REJECT)
//! - PLINTH_CATALOG_FAILURE (ERROR)

use std::fmt;

use crate::catalog::CatalogError;
use crate::schema::DataType;

/// Severity levels for planner errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Query rejected; the caller must change it
    Reject,
    /// A collaborator failed while planning
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Planner-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// Malformed query structure
    PlinthPlanInvalid,
    /// Projection requested more than once
    PlinthPlanMultipleProjections,
    /// Projection with no columns
    PlinthPlanEmptyProjection,
    /// Projection incompatible with the group-by column
    PlinthPlanProjectionConflict,
    /// Join algorithm that cannot be planned
    PlinthPlanUnsupportedJoin,
    /// Join clauses do not connect every relation
    PlinthPlanDisconnectedJoin,
    /// Column resolves against no relation in scope
    PlinthPlanUnknownColumn,
    /// Bare column resolves against more than one relation
    PlinthPlanAmbiguousColumn,
    /// Aggregate over a non-numeric column
    PlinthPlanAggregateType,
    /// Table or index metadata lookup failed
    PlinthCatalogFailure,
}

impl PlannerErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::PlinthPlanInvalid => "PLINTH_PLAN_INVALID",
            PlannerErrorCode::PlinthPlanMultipleProjections => "PLINTH_PLAN_MULTIPLE_PROJECTIONS",
            PlannerErrorCode::PlinthPlanEmptyProjection => "PLINTH_PLAN_EMPTY_PROJECTION",
            PlannerErrorCode::PlinthPlanProjectionConflict => "PLINTH_PLAN_PROJECTION_CONFLICT",
            PlannerErrorCode::PlinthPlanUnsupportedJoin => "PLINTH_PLAN_UNSUPPORTED_JOIN",
            PlannerErrorCode::PlinthPlanDisconnectedJoin => "PLINTH_PLAN_DISCONNECTED_JOIN",
            PlannerErrorCode::PlinthPlanUnknownColumn => "PLINTH_PLAN_UNKNOWN_COLUMN",
            PlannerErrorCode::PlinthPlanAmbiguousColumn => "PLINTH_PLAN_AMBIGUOUS_COLUMN",
            PlannerErrorCode::PlinthPlanAggregateType => "PLINTH_PLAN_AGGREGATE_TYPE",
            PlannerErrorCode::PlinthCatalogFailure => "PLINTH_CATALOG_FAILURE",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            PlannerErrorCode::PlinthCatalogFailure => Severity::Error,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Planner error type with full context
#[derive(Debug, Clone)]
pub struct PlannerError {
    /// Error code
    code: PlannerErrorCode,
    /// Human-readable message
    message: String,
    /// Column name if applicable
    column: Option<String>,
    /// Underlying catalog failure, if any
    source: Option<CatalogError>,
}

impl PlannerError {
    fn new(code: PlannerErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            column: None,
            source: None,
        }
    }

    /// Create a query invalid error
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::new(PlannerErrorCode::PlinthPlanInvalid, reason.into())
    }

    /// Create a multiple projections error
    pub fn multiple_projections() -> Self {
        Self::new(
            PlannerErrorCode::PlinthPlanMultipleProjections,
            "Cannot add more than one project operator to this query".into(),
        )
    }

    /// Create an empty projection error
    pub fn empty_projection() -> Self {
        Self::new(
            PlannerErrorCode::PlinthPlanEmptyProjection,
            "Cannot project no columns".into(),
        )
    }

    /// Create a projection conflict error
    pub fn projection_conflict(reason: impl Into<String>) -> Self {
        Self::new(PlannerErrorCode::PlinthPlanProjectionConflict, reason.into())
    }

    /// Create an unsupported join error
    pub fn unsupported_join(algorithm: &str) -> Self {
        Self::new(
            PlannerErrorCode::PlinthPlanUnsupportedJoin,
            format!("Join algorithm {} is not supported", algorithm),
        )
    }

    /// Create a disconnected join error
    pub fn disconnected_join(unreached: &[String]) -> Self {
        Self::new(
            PlannerErrorCode::PlinthPlanDisconnectedJoin,
            format!(
                "Join clauses never connect all relations; unreachable: {}",
                unreached.join(", ")
            ),
        )
    }

    /// Create an unknown column error
    pub fn unknown_column(column: impl Into<String>) -> Self {
        let c = column.into();
        Self {
            column: Some(c.clone()),
            ..Self::new(
                PlannerErrorCode::PlinthPlanUnknownColumn,
                format!("Column '{}' does not resolve against any relation in scope", c),
            )
        }
    }

    /// Create an ambiguous column error
    pub fn ambiguous_column(column: impl Into<String>, relations: &[&str]) -> Self {
        let c = column.into();
        Self {
            column: Some(c.clone()),
            ..Self::new(
                PlannerErrorCode::PlinthPlanAmbiguousColumn,
                format!(
                    "Column '{}' matches more than one relation: {}; qualify it",
                    c,
                    relations.join(", ")
                ),
            )
        }
    }

    /// Create an aggregate type error
    pub fn aggregate_type(aggregate: &str, column: &str, data_type: DataType) -> Self {
        Self {
            column: Some(column.to_string()),
            ..Self::new(
                PlannerErrorCode::PlinthPlanAggregateType,
                format!(
                    "{} requires a numeric column, '{}' is {}",
                    aggregate,
                    column,
                    data_type.type_name()
                ),
            )
        }
    }

    /// Returns the error code
    pub fn code(&self) -> PlannerErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the column name if applicable
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    /// Returns the catalog error this wraps, if any
    pub fn catalog_error(&self) -> Option<&CatalogError> {
        self.source.as_ref()
    }
}

impl From<CatalogError> for PlannerError {
    fn from(err: CatalogError) -> Self {
        Self {
            source: Some(err.clone()),
            ..Self::new(PlannerErrorCode::PlinthCatalogFailure, err.to_string())
        }
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for PlannerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
