//! Single-table access path selection and predicate pushdown
//!
//! A predicate belongs to a table when its column resolves against that
//! table's qualified schema. Predicates are always layered in declaration
//! order. An index-consumed predicate is skipped by its position, so a
//! duplicate of it is still applied as a filter.

use crate::catalog::Catalog;
use crate::executor::QueryOperator;
use crate::observability::{log_event_with_fields, Event};

use super::ast::SelectPredicate;
use super::errors::PlannerResult;

/// Returns true if `predicate` can be answered by an index scan of `table`
pub(super) fn index_eligible<C: Catalog>(
    catalog: &C,
    table: &str,
    predicate: &SelectPredicate,
) -> bool {
    predicate.op.is_indexable()
        && predicate.column.may_refer_to(table)
        && catalog.index_exists(table, &predicate.column.column)
}

/// Wrap `source` in one select per predicate that resolves against it,
/// skipping the predicate at position `except`
pub(super) fn push_down_selects(
    source: QueryOperator,
    predicates: &[SelectPredicate],
    except: Option<usize>,
) -> PlannerResult<QueryOperator> {
    let mut operator = source;
    for (position, predicate) in predicates.iter().enumerate() {
        if Some(position) == except || operator.resolve(&predicate.column).is_err() {
            continue;
        }
        operator = QueryOperator::select(
            operator,
            &predicate.column,
            predicate.op,
            predicate.value.clone(),
        )?;
    }
    Ok(operator)
}

/// Cheapest scan of `table` with its predicates pushed onto it.
///
/// An index scan replaces the sequential scan only when strictly cheaper,
/// so ties keep the earliest candidate.
pub(super) fn min_cost_access<C: Catalog>(
    catalog: &C,
    table: &str,
    predicates: &[SelectPredicate],
) -> PlannerResult<QueryOperator> {
    let mut best = QueryOperator::seq_scan(catalog, table)?;
    let mut consumed = None;

    for (position, predicate) in predicates.iter().enumerate() {
        if !index_eligible(catalog, table, predicate) {
            continue;
        }
        let candidate = QueryOperator::index_scan(
            catalog,
            table,
            &predicate.column.column,
            predicate.op,
            predicate.value.clone(),
        )?;
        if candidate.estimate_io_cost() < best.estimate_io_cost() {
            best = candidate;
            consumed = Some(position);
        }
    }

    let cost = best.estimate_io_cost().to_string();
    log_event_with_fields(
        Event::AccessPathSelected,
        &[("table", table), ("access", best.type_name()), ("cost", &cost)],
    );

    push_down_selects(best, predicates, consumed)
}
