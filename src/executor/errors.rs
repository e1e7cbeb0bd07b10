//! Executor error types
//!
//! Error codes:
//! - PLINTH_EXECUTION_FAILED (ERROR)
//! - PLINTH_AGGREGATE_OVERFLOW (ERROR)

use std::fmt;

use crate::catalog::CatalogError;

/// Severity levels for executor errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation failed but the database is healthy
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Executor-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorCode {
    /// Reading from a table or index failed
    PlinthExecutionFailed,
    /// An aggregate result does not fit its output type
    PlinthAggregateOverflow,
}

impl ExecutorErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorErrorCode::PlinthExecutionFailed => "PLINTH_EXECUTION_FAILED",
            ExecutorErrorCode::PlinthAggregateOverflow => "PLINTH_AGGREGATE_OVERFLOW",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for ExecutorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Executor error type with full context
#[derive(Debug, Clone)]
pub struct ExecutorError {
    /// Error code
    code: ExecutorErrorCode,
    /// Human-readable message
    message: String,
    /// Underlying catalog failure, if any
    source: Option<CatalogError>,
}

impl ExecutorError {
    /// Create an execution failed error
    pub fn execution_failed(reason: impl Into<String>) -> Self {
        Self {
            code: ExecutorErrorCode::PlinthExecutionFailed,
            message: reason.into(),
            source: None,
        }
    }

    /// Create an aggregate overflow error
    pub fn aggregate_overflow(aggregate: &str) -> Self {
        Self {
            code: ExecutorErrorCode::PlinthAggregateOverflow,
            message: format!("{} overflowed its result type", aggregate),
            source: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> ExecutorErrorCode {
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

    /// Returns the catalog error this wraps, if any
    pub fn catalog_error(&self) -> Option<&CatalogError> {
        self.source.as_ref()
    }
}

impl From<CatalogError> for ExecutorError {
    fn from(err: CatalogError) -> Self {
        Self {
            code: ExecutorErrorCode::PlinthExecutionFailed,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl fmt::Display for ExecutorError {
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

impl std::error::Error for ExecutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ExecutorErrorCode::PlinthExecutionFailed.code(),
            "PLINTH_EXECUTION_FAILED"
        );
        assert_eq!(
            ExecutorErrorCode::PlinthAggregateOverflow.code(),
            "PLINTH_AGGREGATE_OVERFLOW"
        );
    }

    #[test]
    fn test_catalog_error_is_source() {
        let err = ExecutorError::from(CatalogError::UnknownTable("t".into()));
        assert_eq!(err.code(), ExecutorErrorCode::PlinthExecutionFailed);
        assert_eq!(
            err.catalog_error(),
            Some(&CatalogError::UnknownTable("t".into()))
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_display() {
        let err = ExecutorError::aggregate_overflow("sumAgg");
        let display = format!("{}", err);
        assert!(display.starts_with("[ERROR] PLINTH_AGGREGATE_OVERFLOW"));
        assert!(display.contains("sumAgg"));
    }
}
