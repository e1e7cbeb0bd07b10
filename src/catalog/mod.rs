//! Catalog subsystem for plinthdb
//!
//! The planner and executor never reach into storage directly. They see
//! tables through two narrow contracts:
//!
//! - [`Catalog`]: metadata needed to build and cost a plan
//! - [`TableAccess`]: data needed to execute a plan
//!
//! [`Database`] implements both over in-memory heap tables.

mod database;
mod errors;

pub use database::Database;
pub use errors::{CatalogError, CatalogResult};

use crate::config::EngineConfig;
use crate::observability::MetricsRegistry;
use crate::planner::PredicateOperator;
use crate::schema::{TableSchema, Value};
use crate::storage::{Record, RecordId, TableStats};

/// Table metadata used during planning
pub trait Catalog {
    /// Page geometry and buffer budget for cost estimation
    fn config(&self) -> &EngineConfig;

    /// Schema of a base table (bare column names)
    fn table_schema(&self, table: &str) -> CatalogResult<&TableSchema>;

    /// Current statistics of a base table
    fn table_stats(&self, table: &str) -> CatalogResult<TableStats>;

    /// Returns true if `table.column` has a secondary index
    fn index_exists(&self, table: &str, column: &str) -> bool;

    /// Registry that planning outcomes are counted in, if any
    fn metrics(&self) -> Option<&MetricsRegistry> {
        None
    }
}

/// Table data used during execution
pub trait TableAccess {
    /// All records of a table in storage order
    fn scan(&self, table: &str) -> CatalogResult<&[Record]>;

    /// Ids of the records whose `column` satisfies `<op> value`, ascending
    fn index_lookup(
        &self,
        table: &str,
        column: &str,
        op: PredicateOperator,
        value: &Value,
    ) -> CatalogResult<Vec<RecordId>>;

    /// A single record by id
    fn fetch(&self, table: &str, id: RecordId) -> CatalogResult<&Record>;
}
