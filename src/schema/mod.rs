//! Schema subsystem for plinthdb
//!
//! Column types, literal values and ordered table schemas.
//!
//! # Naming
//!
//! - Base tables use bare column names (`int`)
//! - Operator outputs use qualified names (`t.int`)
//! - References resolve exactly when qualified, by column part when bare

mod table;
mod types;

pub use table::{Column, ColumnRef, TableSchema};
pub use types::{DataType, Value};
