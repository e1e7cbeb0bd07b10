//! plinthdb - An embedded relational engine with a cost-based query planner
//!
//! Tables live in memory. Queries are described through a builder, planned
//! either naively or by System-R style join order search, and executed as
//! lazy record streams.
//!
//! ```
//! use plinthdb::catalog::Database;
//! use plinthdb::planner::PredicateOperator;
//! use plinthdb::schema::{DataType, TableSchema, Value};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut db = Database::default();
//! db.create_table(
//!     TableSchema::new()
//!         .with_column("id", DataType::Int)
//!         .with_column("customer", DataType::Int)
//!         .with_column("total", DataType::Int),
//!     "orders",
//! )?;
//! db.create_table(TableSchema::new().with_column("id", DataType::Int), "customers")?;
//! for i in 0..4 {
//!     db.add_record("customers", vec![Value::Int(i)])?;
//!     db.add_record("orders", vec![Value::Int(i), Value::Int(i), Value::Int(i * 60)])?;
//! }
//!
//! let mut query = db.query("orders");
//! query.join("customers", "orders.customer", "customers.id");
//! query.select("total", PredicateOperator::GreaterThan, 100);
//! let mut matched = 0;
//! for record in query.execute_optimal()? {
//!     record?;
//!     matched += 1;
//! }
//! assert_eq!(matched, 2);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod executor;
pub mod index;
pub mod observability;
pub mod planner;
pub mod schema;
pub mod storage;

pub use catalog::{Catalog, CatalogError, Database, TableAccess};
pub use config::{ConfigError, EngineConfig};
pub use planner::{PlannerError, PlannerResult, PredicateOperator, QueryPlan};
