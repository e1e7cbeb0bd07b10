//! Storage subsystem for plinthdb
//!
//! In-memory heap tables of fixed-width records, laid out in pages whose
//! geometry comes from [`EngineConfig`](crate::config::EngineConfig).
//!
//! # Design Principles
//!
//! - Append-only heaps: record ids are dense and stable
//! - Statistics are exact for base tables and estimated for operator outputs
//! - Page counts, not bytes, are the unit of cost

mod record;
mod stats;
mod table;

pub use record::{Record, RecordId};
pub use stats::{ColumnStats, TableStats};
pub use table::HeapTable;
