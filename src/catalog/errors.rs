//! # Catalog Errors
//!
//! Error types for table and index metadata lookups and data access.

use thiserror::Error;

use crate::storage::RecordId;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog and storage errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    // ==================
    // Table Errors
    // ==================

    /// No table with this name
    #[error("Table '{0}' does not exist")]
    UnknownTable(String),

    /// A table with this name already exists
    #[error("Table '{0}' already exists")]
    TableExists(String),

    /// Column is not part of the table's schema
    #[error("Column '{column}' does not exist in table '{table}'")]
    UnknownColumn { table: String, column: String },

    // ==================
    // Index Errors
    // ==================

    /// An index on this column already exists
    #[error("Index on '{table}.{column}' already exists")]
    IndexExists { table: String, column: String },

    // ==================
    // Record Errors
    // ==================

    /// Values do not match the table's schema
    #[error("Record does not match schema of table '{table}': {reason}")]
    SchemaMismatch { table: String, reason: String },

    /// Record id is past the end of the table
    #[error("Record {id} does not exist in table '{table}'")]
    UnknownRecord { table: String, id: RecordId },
}

impl CatalogError {
    /// Create an unknown column error
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        CatalogError::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }
}
