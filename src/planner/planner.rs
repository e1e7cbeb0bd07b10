//! Query plans
//!
//! A [`QueryPlan`] accumulates one query's clauses, then produces either a
//! declaration-ordered naive operator tree or a cost-based one.
//!
//! Optimal planning order:
//! 1. Index fast path (single table, no group-by, an indexable predicate)
//! 2. Join order search over cost-ranked access paths
//! 3. Epilogue (group-by, then projection and aggregation)
//!
//! Planning reads the catalog and never mutates the plan, so the same
//! clauses always give the same tree.

use crate::catalog::{Catalog, TableAccess};
use crate::executor::{JoinAlgorithm, QueryOperator, RecordStream};
use crate::observability::{log_event_with_fields, Event, ObservationScope, Severity};
use crate::schema::{ColumnRef, TableSchema, Value};

use super::access::{index_eligible, push_down_selects};
use super::ast::{AggregateRequest, JoinClause, PredicateOperator, SelectPredicate};
use super::epilogue::Epilogue;
use super::errors::{PlannerError, PlannerResult};
use super::join_order::JoinOrderSearch;

/// How a plan's operator tree was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStrategy {
    /// Declaration-ordered page nested loops, filters on top
    Naive,
    /// Single index scan plus filters, no search
    IndexFastPath,
    /// Cost-based join order search
    DynamicProgramming,
}

impl PlanStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStrategy::Naive => "NAIVE",
            PlanStrategy::IndexFastPath => "INDEX_FAST_PATH",
            PlanStrategy::DynamicProgramming => "DYNAMIC_PROGRAMMING",
        }
    }
}

/// A single-block query over one base table
pub struct QueryPlan<'a, C: Catalog> {
    catalog: &'a C,
    table: String,
    joins: Vec<JoinClause>,
    predicates: Vec<SelectPredicate>,
    projection: Option<Vec<String>>,
    group_by: Option<ColumnRef>,
    aggregates: AggregateRequest,
    final_operator: Option<QueryOperator>,
}

impl<'a, C: Catalog> QueryPlan<'a, C> {
    /// Start a query over `table`
    pub fn new(catalog: &'a C, table: &str) -> Self {
        Self {
            catalog,
            table: table.to_string(),
            joins: Vec::new(),
            predicates: Vec::new(),
            projection: None,
            group_by: None,
            aggregates: AggregateRequest::default(),
            final_operator: None,
        }
    }

    /// Project onto `columns`. Allowed once, never empty.
    pub fn project(&mut self, columns: &[&str]) -> PlannerResult<()> {
        if self.projection.is_some() {
            return Err(PlannerError::multiple_projections());
        }
        if columns.is_empty() {
            return Err(PlannerError::empty_projection());
        }
        self.projection = Some(columns.iter().map(|c| c.to_string()).collect());
        Ok(())
    }

    /// Filter on `column <op> value`
    pub fn select(&mut self, column: &str, op: PredicateOperator, value: impl Into<Value>) {
        self.predicates
            .push(SelectPredicate::new(column, op, value.into()));
    }

    /// Group on `column`, replacing any earlier group-by
    pub fn group_by(&mut self, column: &str) {
        self.group_by = Some(ColumnRef::parse(column));
    }

    pub fn count(&mut self) {
        self.aggregates.count = true;
    }

    /// Sum `column`, replacing any earlier sum
    pub fn sum(&mut self, column: &str) {
        self.aggregates.sum = Some(ColumnRef::parse(column));
    }

    /// Average `column`, replacing any earlier average
    pub fn average(&mut self, column: &str) {
        self.aggregates.average = Some(ColumnRef::parse(column));
    }

    /// Join `table` on `left_column = right_column`, both `table.column`
    pub fn join(&mut self, table: &str, left_column: &str, right_column: &str) {
        self.joins
            .push(JoinClause::new(table, left_column, right_column));
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn predicates(&self) -> &[SelectPredicate] {
        &self.predicates
    }

    pub fn joins(&self) -> &[JoinClause] {
        &self.joins
    }

    /// Root of the tree built by the last `execute` or `execute_optimal`
    pub fn final_operator(&self) -> Option<&QueryOperator> {
        self.final_operator.as_ref()
    }

    // ==================
    // Planning
    // ==================

    /// Declaration-ordered plan: page nested loops in join order, every
    /// predicate on top, then the epilogue
    pub fn plan_naive(&self) -> PlannerResult<QueryOperator> {
        self.plan_observed("PLAN_NAIVE", || self.build_naive().map(|op| (op, PlanStrategy::Naive)))
            .map(|(op, _)| op)
    }

    /// Cheapest plan found by the index fast path or join order search
    pub fn plan_optimal(&self) -> PlannerResult<QueryOperator> {
        self.plan_optimal_with_strategy().map(|(op, _)| op)
    }

    /// Cheapest plan together with how it was found
    pub fn plan_optimal_with_strategy(&self) -> PlannerResult<(QueryOperator, PlanStrategy)> {
        self.plan_observed("PLAN_OPTIMAL", || self.build_optimal())
    }

    fn plan_observed<F>(&self, name: &str, build: F) -> PlannerResult<(QueryOperator, PlanStrategy)>
    where
        F: FnOnce() -> PlannerResult<(QueryOperator, PlanStrategy)>,
    {
        let scope = ObservationScope::with_fields(name, &[("table", &self.table)]);
        let metrics = self.catalog.metrics();

        match build() {
            Ok((operator, strategy)) => {
                if let Some(metrics) = metrics {
                    match strategy {
                        PlanStrategy::Naive => metrics.increment_naive_plans(),
                        PlanStrategy::IndexFastPath => {
                            metrics.increment_index_fast_path();
                            metrics.increment_optimal_plans();
                        }
                        PlanStrategy::DynamicProgramming => metrics.increment_optimal_plans(),
                    }
                }
                let cost = operator.estimate_io_cost().to_string();
                scope.complete_with_fields(&[
                    ("cost", &cost),
                    ("root", operator.type_name()),
                    ("strategy", strategy.as_str()),
                ]);
                Ok((operator, strategy))
            }
            Err(err) => {
                if let Some(metrics) = metrics {
                    metrics.increment_plans_rejected();
                }
                scope.fail(Severity::Warn, err.code().code(), err.message());
                log_event_with_fields(
                    Event::PlanRejected,
                    &[("code", err.code().code()), ("table", &self.table)],
                );
                Err(err)
            }
        }
    }

    fn build_naive(&self) -> PlannerResult<QueryOperator> {
        let epilogue = self.validate()?;
        let config = self.catalog.config();

        let mut operator = QueryOperator::seq_scan(self.catalog, &self.table)?;
        for clause in &self.joins {
            let right = QueryOperator::seq_scan(self.catalog, &clause.table)?;
            // the column on the newly joined table goes on the right
            let (left_column, right_column) =
                if clause.right.table.as_deref() == Some(clause.table.as_str()) {
                    (&clause.left, &clause.right)
                } else {
                    (&clause.right, &clause.left)
                };
            operator = QueryOperator::join(
                config,
                operator,
                right,
                left_column,
                right_column,
                JoinAlgorithm::PageNestedLoop,
            )?;
        }

        for predicate in &self.predicates {
            operator = QueryOperator::select(
                operator,
                &predicate.column,
                predicate.op,
                predicate.value.clone(),
            )?;
        }

        epilogue.apply(config, operator)
    }

    fn build_optimal(&self) -> PlannerResult<(QueryOperator, PlanStrategy)> {
        let epilogue = self.validate()?;
        let config = self.catalog.config();

        if let Some(operator) = self.index_fast_path(&epilogue)? {
            let operator = epilogue.apply(config, operator)?;
            return Ok((operator, PlanStrategy::IndexFastPath));
        }

        let relations = self.relations();
        let search = JoinOrderSearch::new(self.catalog, &relations, &self.joins, &self.predicates);
        let operator = epilogue.apply(config, search.run()?)?;
        Ok((operator, PlanStrategy::DynamicProgramming))
    }

    /// Index scan for the first indexable predicate of a single-table,
    /// ungrouped query, with the other predicates layered on top in order
    fn index_fast_path(&self, epilogue: &Epilogue) -> PlannerResult<Option<QueryOperator>> {
        if self.predicates.is_empty() || !self.joins.is_empty() || epilogue.has_group_by() {
            return Ok(None);
        }

        let position = match self
            .predicates
            .iter()
            .position(|p| index_eligible(self.catalog, &self.table, p))
        {
            Some(position) => position,
            None => return Ok(None),
        };

        let predicate = &self.predicates[position];
        let scan = QueryOperator::index_scan(
            self.catalog,
            &self.table,
            &predicate.column.column,
            predicate.op,
            predicate.value.clone(),
        )?;

        let column = predicate.column.to_string();
        log_event_with_fields(
            Event::IndexFastPath,
            &[("column", &column), ("table", &self.table)],
        );

        push_down_selects(scan, &self.predicates, Some(position)).map(Some)
    }

    /// Base table first, then joined tables in declaration order
    fn relations(&self) -> Vec<String> {
        std::iter::once(self.table.clone())
            .chain(self.joins.iter().map(|j| j.table.clone()))
            .collect()
    }

    /// Relations whose schema resolves `column`; more than one is an error
    fn resolving<'r>(
        relations: &'r [String],
        schemas: &[TableSchema],
        column: &ColumnRef,
    ) -> PlannerResult<Vec<&'r str>> {
        let matches: Vec<&str> = relations
            .iter()
            .zip(schemas)
            .filter(|(_, schema)| schema.resolve(column).is_some())
            .map(|(relation, _)| relation.as_str())
            .collect();
        if matches.len() > 1 {
            return Err(PlannerError::ambiguous_column(column.to_string(), &matches));
        }
        Ok(matches)
    }

    /// Checks shared by both routines; returns the validated epilogue
    fn validate(&self) -> PlannerResult<Epilogue> {
        let relations = self.relations();
        for (i, relation) in relations.iter().enumerate() {
            if relations[..i].contains(relation) {
                return Err(PlannerError::invalid(format!(
                    "Relation '{}' appears more than once",
                    relation
                )));
            }
        }

        let mut schemas = Vec::with_capacity(relations.len());
        for relation in &relations {
            schemas.push(self.catalog.table_schema(relation)?.qualify(relation));
        }
        for predicate in &self.predicates {
            if Self::resolving(&relations, &schemas, &predicate.column)?.is_empty() {
                return Err(PlannerError::unknown_column(predicate.column.to_string()));
            }
        }

        // join output column order differs between routines, so epilogue
        // columns must bind to one relation as well
        let epilogue_columns = self
            .group_by
            .iter()
            .chain(self.aggregates.sum.iter())
            .chain(self.aggregates.average.iter())
            .cloned()
            .chain(
                self.projection
                    .iter()
                    .flatten()
                    .map(|c| ColumnRef::parse(c)),
            );
        for column in epilogue_columns {
            Self::resolving(&relations, &schemas, &column)?;
        }

        Epilogue::new(
            self.group_by.as_ref(),
            self.projection.as_deref(),
            &self.aggregates,
        )
    }
}

impl<'a, C: Catalog + TableAccess> QueryPlan<'a, C> {
    /// Build the naive plan and stream its records
    pub fn execute(&mut self) -> PlannerResult<RecordStream<'_>> {
        let operator = self.plan_naive()?;
        let catalog: &'a C = self.catalog;
        Ok(self.final_operator.insert(operator).execute(catalog))
    }

    /// Build the optimal plan and stream its records
    pub fn execute_optimal(&mut self) -> PlannerResult<RecordStream<'_>> {
        let operator = self.plan_optimal()?;
        let catalog: &'a C = self.catalog;
        Ok(self.final_operator.insert(operator).execute(catalog))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Database;
    use crate::planner::PlannerErrorCode;
    use crate::schema::{DataType, TableSchema};

    fn db() -> Database {
        let mut db = Database::default();
        for name in ["a", "b"] {
            let schema = TableSchema::new()
                .with_column("id", DataType::Int)
                .with_column("x", DataType::Int);
            db.create_table(schema, name).unwrap();
            for i in 0..20 {
                db.add_record(name, vec![Value::Int(i), Value::Int(i % 4)])
                    .unwrap();
            }
        }
        db
    }

    #[test]
    fn test_project_twice_or_empty() {
        let db = db();
        let mut query = db.query("a");
        assert_eq!(
            query.project(&[]).unwrap_err().code(),
            PlannerErrorCode::PlinthPlanEmptyProjection
        );
        query.project(&["id"]).unwrap();
        assert_eq!(
            query.project(&["x"]).unwrap_err().code(),
            PlannerErrorCode::PlinthPlanMultipleProjections
        );
    }

    #[test]
    fn test_unknown_predicate_column() {
        let db = db();
        let mut query = db.query("a");
        query.select("missing", PredicateOperator::Equals, 1);
        for result in [query.plan_naive(), query.plan_optimal()] {
            assert_eq!(
                result.unwrap_err().code(),
                PlannerErrorCode::PlinthPlanUnknownColumn
            );
        }
    }

    #[test]
    fn test_relation_named_twice() {
        let db = db();
        let mut query = db.query("a");
        query.join("a", "a.id", "a.x");
        assert_eq!(
            query.plan_optimal().unwrap_err().code(),
            PlannerErrorCode::PlinthPlanInvalid
        );
    }

    #[test]
    fn test_unknown_table_is_catalog_failure() {
        let db = db();
        let query = db.query("nope");
        let err = query.plan_optimal().unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::PlinthCatalogFailure);
        assert!(err.catalog_error().is_some());
    }

    #[test]
    fn test_naive_orients_join_columns() {
        let db = db();
        let mut query = db.query("a");
        query.join("b", "b.id", "a.id");
        let rendered = query.plan_naive().unwrap().to_string();
        assert!(rendered.starts_with("type: PNLJ\nleftColumn: a.id\nrightColumn: b.id"));
    }

    #[test]
    fn test_strategy_and_metrics() {
        let mut db = db();
        db.create_index("a", "x").unwrap();

        let mut query = db.query("a");
        query.select("x", PredicateOperator::Equals, 1);
        let (_, strategy) = query.plan_optimal_with_strategy().unwrap();
        assert_eq!(strategy, PlanStrategy::IndexFastPath);

        let mut query = db.query("a");
        query.join("b", "a.id", "b.id");
        let (_, strategy) = query.plan_optimal_with_strategy().unwrap();
        assert_eq!(strategy, PlanStrategy::DynamicProgramming);
        query.plan_naive().unwrap();

        let snapshot = db.metrics().snapshot();
        assert_eq!(snapshot.optimal_plans, 2);
        assert_eq!(snapshot.index_fast_path, 1);
        assert_eq!(snapshot.naive_plans, 1);
    }

    #[test]
    fn test_execute_stores_final_operator() {
        let db = db();
        let mut query = db.query("a");
        query.select("x", PredicateOperator::Equals, 0);
        let rows: Vec<_> = query.execute_optimal().unwrap().collect();
        assert_eq!(rows.len(), 5);
        assert_eq!(query.final_operator().unwrap().type_name(), "SELECT");
    }
}
