//! Explain plan output
//!
//! Produces deterministic, human-readable explain output.

use std::fmt;

use crate::catalog::Catalog;
use crate::executor::QueryOperator;

use super::errors::PlannerError;
use super::planner::{PlanStrategy, QueryPlan};

/// Explain plan output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainPlan {
    /// Whether planning succeeded
    pub accepted: bool,
    /// How the tree was chosen (if accepted)
    pub strategy: Option<String>,
    /// Estimated I/O cost of the root (if accepted)
    pub cost: Option<u64>,
    /// Canonical tree rendering (if accepted)
    pub tree: Option<String>,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Explain the optimal plan of `plan`
    pub fn optimal<C: Catalog>(plan: &QueryPlan<'_, C>) -> Self {
        match plan.plan_optimal_with_strategy() {
            Ok((operator, strategy)) => Self::from_operator(&operator, strategy),
            Err(err) => Self::from_error(&err),
        }
    }

    /// Explain the naive plan of `plan`
    pub fn naive<C: Catalog>(plan: &QueryPlan<'_, C>) -> Self {
        match plan.plan_naive() {
            Ok(operator) => Self::from_operator(&operator, PlanStrategy::Naive),
            Err(err) => Self::from_error(&err),
        }
    }

    /// Creates an explain plan from a built operator tree
    pub fn from_operator(operator: &QueryOperator, strategy: PlanStrategy) -> Self {
        Self {
            accepted: true,
            strategy: Some(strategy.as_str().to_string()),
            cost: Some(operator.estimate_io_cost()),
            tree: Some(operator.to_string()),
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a planning error
    pub fn from_error(err: &PlannerError) -> Self {
        Self {
            accepted: false,
            strategy: None,
            cost: None,
            tree: None,
            rejection_reason: Some(err.message().to_string()),
            rejection_code: Some(err.code().code().to_string()),
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            if let Some(strategy) = &self.strategy {
                writeln!(f, "Strategy: {}", strategy)?;
            }
            if let Some(cost) = self.cost {
                writeln!(f, "Cost: {} pages", cost)?;
            }
            if let Some(tree) = &self.tree {
                writeln!(f, "Plan:")?;
                for line in tree.lines() {
                    writeln!(f, "  {}", line)?;
                }
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Database;
    use crate::planner::PredicateOperator;
    use crate::schema::{DataType, TableSchema, Value};

    fn db() -> Database {
        let mut db = Database::default();
        let schema = TableSchema::new()
            .with_column("id", DataType::Int)
            .with_column("flag", DataType::Bool);
        db.create_table(schema, "t").unwrap();
        for i in 0..5000 {
            db.add_record("t", vec![Value::Int(i), Value::Bool(i % 2 == 0)])
                .unwrap();
        }
        db.create_index("t", "id").unwrap();
        db
    }

    #[test]
    fn test_explain_fast_path() {
        let db = db();
        let mut query = db.query("t");
        query.select("id", PredicateOperator::Equals, 7);

        let explain = ExplainPlan::optimal(&query);
        assert!(explain.accepted);
        assert_eq!(explain.strategy.as_deref(), Some("INDEX_FAST_PATH"));
        // height 2 plus one matching record
        assert_eq!(explain.cost, Some(3));

        let output = format!("{}", explain);
        assert!(output.contains("ACCEPTED"));
        assert!(output.contains("  type: INDEXSCAN"));
    }

    #[test]
    fn test_explain_naive() {
        let db = db();
        let mut query = db.query("t");
        query.select("id", PredicateOperator::Equals, 7);

        let explain = ExplainPlan::naive(&query);
        assert_eq!(explain.strategy.as_deref(), Some("NAIVE"));
        assert!(explain.tree.unwrap().ends_with("\ttype: SEQSCAN\n\ttable: t"));
    }

    #[test]
    fn test_explain_rejected_plan() {
        let db = db();
        let mut query = db.query("t");
        query.group_by("flag");
        query.project(&["id"]).unwrap();

        let explain = ExplainPlan::optimal(&query);
        assert!(!explain.accepted);
        assert_eq!(
            explain.rejection_code.as_deref(),
            Some("PLINTH_PLAN_PROJECTION_CONFLICT")
        );
        let output = format!("{}", explain);
        assert!(output.contains("REJECTED"));
        assert!(output.contains("PLINTH_PLAN_PROJECTION_CONFLICT"));
    }

    #[test]
    fn test_explain_deterministic() {
        let db = db();
        let mut query = db.query("t");
        query.select("flag", PredicateOperator::Equals, true);
        assert_eq!(ExplainPlan::optimal(&query), ExplainPlan::optimal(&query));
    }
}
