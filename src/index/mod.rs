//! Index subsystem for plinthdb
//!
//! Secondary indexes are in-memory ordered maps from column value to record
//! ids, kept current by the database on every insert.
//!
//! # Design Principles
//!
//! - Deterministic: BTreeMap iteration order, sorted record ids
//! - Derived state: an index mirrors its table, never the source of truth

mod btree;

pub use btree::{IndexKey, IndexTree};
