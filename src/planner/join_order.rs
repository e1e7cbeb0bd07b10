//! Dynamic-programming join order search
//!
//! Pass 1 picks the cheapest access path for every relation. Pass k
//! extends each (k-1)-relation plan by one more relation through a declared
//! join clause, keeping the cheapest plan per relation set. Memos are
//! ordered maps keyed by [`TableSet`], so every scan and every tie-break
//! follows the sorted order of the sets and never depends on hashing.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::executor::{JoinAlgorithm, QueryOperator};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::schema::ColumnRef;

use super::access::min_cost_access;
use super::ast::{JoinClause, SelectPredicate};
use super::errors::{PlannerError, PlannerResult};

/// An unordered set of relation names, compared by content
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableSet(BTreeSet<String>);

impl TableSet {
    pub fn singleton(table: &str) -> Self {
        let mut set = BTreeSet::new();
        set.insert(table.to_string());
        Self(set)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.0.contains(table)
    }

    /// This set plus `table`
    pub fn with(&self, table: &str) -> Self {
        let mut set = self.0.clone();
        set.insert(table.to_string());
        Self(set)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns true if `column` is qualified by a member of this set
    fn covers(&self, column: &ColumnRef) -> bool {
        column.table.as_deref().is_some_and(|t| self.contains(t))
    }

    /// The single member of a singleton set
    fn only(&self) -> Option<&str> {
        match self.0.len() {
            1 => self.iter().next(),
            _ => None,
        }
    }
}

impl<S: Into<String>> FromIterator<S> for TableSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for TableSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.iter().collect::<Vec<_>>().join(", "))
    }
}

/// One pass's cheapest plan per relation set
type Memo = BTreeMap<TableSet, QueryOperator>;

/// Cheapest join of `left` and `right` on `left_column = right_column`.
///
/// Every candidate algorithm is costed before any operator is built; ties
/// keep the earlier algorithm in [`JoinAlgorithm::CANDIDATES`].
pub(super) fn min_cost_join(
    config: &EngineConfig,
    left: &QueryOperator,
    right: &QueryOperator,
    left_column: &ColumnRef,
    right_column: &ColumnRef,
    metrics: Option<&MetricsRegistry>,
) -> PlannerResult<QueryOperator> {
    let mut best = JoinAlgorithm::CANDIDATES[0];
    let mut best_cost = u64::MAX;

    for algorithm in JoinAlgorithm::CANDIDATES {
        let cost = algorithm.estimate(left, right, config)?;
        let cost_text = cost.to_string();
        let left_text = left_column.to_string();
        let right_text = right_column.to_string();
        log_event_with_fields(
            Event::JoinCandidateCosted,
            &[
                ("algorithm", algorithm.as_str()),
                ("cost", &cost_text),
                ("left_column", &left_text),
                ("right_column", &right_text),
            ],
        );
        if cost < best_cost {
            best = algorithm;
            best_cost = cost;
        }
    }

    if let Some(metrics) = metrics {
        metrics.add_join_candidates(JoinAlgorithm::CANDIDATES.len() as u64);
    }

    QueryOperator::join(
        config,
        left.clone(),
        right.clone(),
        left_column,
        right_column,
        best,
    )
}

/// Join order search over one query's relations
pub(super) struct JoinOrderSearch<'q, C: Catalog> {
    catalog: &'q C,
    /// Base table first, then joined tables in declaration order
    relations: &'q [String],
    joins: &'q [JoinClause],
    predicates: &'q [SelectPredicate],
}

impl<'q, C: Catalog> JoinOrderSearch<'q, C> {
    pub(super) fn new(
        catalog: &'q C,
        relations: &'q [String],
        joins: &'q [JoinClause],
        predicates: &'q [SelectPredicate],
    ) -> Self {
        Self {
            catalog,
            relations,
            joins,
            predicates,
        }
    }

    /// Run every pass and return the cheapest plan covering all relations
    pub(super) fn run(&self) -> PlannerResult<QueryOperator> {
        let base = self.pass_one()?;
        let mut memo = base.clone();

        for pass in 2..=self.relations.len() {
            let next = self.pass_k(&memo, &base)?;
            self.record_pass(pass, &next);

            if next.is_empty() {
                return Err(PlannerError::disconnected_join(&self.unreached(&memo)));
            }
            memo = next;
        }

        let mut best: Option<QueryOperator> = None;
        for operator in memo.into_values() {
            if best
                .as_ref()
                .map_or(true, |b| operator.estimate_io_cost() < b.estimate_io_cost())
            {
                best = Some(operator);
            }
        }
        best.ok_or_else(|| PlannerError::invalid("Query names no relations"))
    }

    /// Cheapest access path for every single relation
    fn pass_one(&self) -> PlannerResult<Memo> {
        let mut memo = Memo::new();
        for table in self.relations {
            let operator = min_cost_access(self.catalog, table, self.predicates)?;
            memo.insert(TableSet::singleton(table), operator);
        }
        self.record_pass(1, &memo);
        Ok(memo)
    }

    /// Extend every plan in `previous` by one relation from `base`
    fn pass_k(&self, previous: &Memo, base: &Memo) -> PlannerResult<Memo> {
        let config = self.catalog.config();
        let metrics = self.catalog.metrics();
        let mut next = Memo::new();

        for (covered, left) in previous {
            for (single, right) in base {
                let added = match single.only() {
                    Some(t) if !covered.contains(t) => t,
                    _ => continue,
                };

                let mut best: Option<QueryOperator> = None;
                for clause in self.joins {
                    let (left_column, right_column) =
                        match clause.link(added, |c| covered.covers(c)) {
                            Some(columns) => columns,
                            None => continue,
                        };
                    let candidate =
                        min_cost_join(config, left, right, left_column, right_column, metrics)?;
                    if best
                        .as_ref()
                        .map_or(true, |b| candidate.estimate_io_cost() < b.estimate_io_cost())
                    {
                        best = Some(candidate);
                    }
                }

                if let Some(candidate) = best {
                    let key = covered.with(added);
                    let replace = next
                        .get(&key)
                        .map_or(true, |existing| candidate.estimate_io_cost() < existing.estimate_io_cost());
                    if replace {
                        next.insert(key, candidate);
                    }
                }
            }
        }

        Ok(next)
    }

    fn record_pass(&self, pass: usize, memo: &Memo) {
        if let Some(metrics) = self.catalog.metrics() {
            metrics.increment_join_passes();
        }
        let pass_text = pass.to_string();
        let entries = memo.len().to_string();
        log_event_with_fields(
            Event::JoinPassComplete,
            &[("entries", &entries), ("pass", &pass_text)],
        );
    }

    /// Relations outside the first set of the last non-empty pass
    fn unreached(&self, memo: &Memo) -> Vec<String> {
        let reached = memo.keys().next().cloned().unwrap_or_default();
        self.relations
            .iter()
            .filter(|r| !reached.contains(r))
            .cloned()
            .collect()
    }
}
