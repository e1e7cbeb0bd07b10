//! Query Planner subsystem for plinthdb
//!
//! Turns one single-block query (a base table, equi-joins, selections, an
//! optional group-by and an optional projection or aggregation) into an
//! executable operator tree.
//!
//! # Design Principles
//!
//! - Deterministic: same clauses and statistics give the same tree
//! - Cost-based: access paths and join algorithms compete on estimated I/O
//! - Explicit: an unplannable query is an error, never an empty plan
//!
//! # Optimal planning
//!
//! 1. Index fast path for single-table, ungrouped queries
//! 2. Pass 1: cheapest access path per relation, predicates pushed down
//! 3. Pass k: extend every (k-1)-relation plan by one joined relation
//! 4. Group-by, then projection and aggregation

mod access;
mod ast;
mod epilogue;
mod errors;
mod explain;
mod join_order;
mod planner;

pub use ast::{AggregateRequest, JoinClause, PredicateOperator, SelectPredicate};
pub use epilogue::Epilogue;
pub use errors::{PlannerError, PlannerErrorCode, PlannerResult, Severity};
pub use explain::ExplainPlan;
pub use join_order::TableSet;
pub use planner::{PlanStrategy, QueryPlan};
