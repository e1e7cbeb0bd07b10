//! Query Executor subsystem for plinthdb
//!
//! Operator trees built by the planner, their cost model, their canonical
//! text rendering, and the record streams they produce.
//!
//! # Cost model (page I/Os)
//!
//! | Operator                  | Cost                           |
//! |---------------------------|--------------------------------|
//! | SEQSCAN                   | pages                          |
//! | INDEXSCAN                 | index height + matching records |
//! | SELECT, GROUPBY, PROJECT  | child cost                     |
//! | PNLJ                      | L + L·R                        |
//! | BNLJ                      | L + ⌈L / (B−2)⌉·R              |
//! | GRACEHASH                 | 3·(L + R)                      |
//!
//! L and R are the estimated page counts of the join inputs and B is the
//! buffer budget.

mod errors;
mod filters;
mod operator;
mod stream;

pub use errors::{ExecutorError, ExecutorErrorCode, ExecutorResult};
pub use filters::PredicateFilter;
pub use operator::{
    AggregateColumn, Aggregates, JoinAlgorithm, OperatorKind, QueryOperator, AVERAGE_COLUMN,
    COUNT_COLUMN, SUM_COLUMN,
};
pub use stream::RecordStream;
