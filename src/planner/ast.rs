//! Query description structures
//!
//! The clause lists a caller builds up before asking for a plan.

use std::cmp::Ordering;
use std::fmt;

use crate::executor::{AVERAGE_COLUMN, COUNT_COLUMN, SUM_COLUMN};
use crate::schema::{ColumnRef, Value};

/// Comparison operators usable in selections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateOperator {
    Equals,
    NotEquals,
    LessThan,
    LessThanEquals,
    GreaterThan,
    GreaterThanEquals,
}

impl PredicateOperator {
    /// Returns the operator name used in rendered plans
    pub fn as_str(&self) -> &'static str {
        match self {
            PredicateOperator::Equals => "EQUALS",
            PredicateOperator::NotEquals => "NOT_EQUALS",
            PredicateOperator::LessThan => "LESS_THAN",
            PredicateOperator::LessThanEquals => "LESS_THAN_EQUALS",
            PredicateOperator::GreaterThan => "GREATER_THAN",
            PredicateOperator::GreaterThanEquals => "GREATER_THAN_EQUALS",
        }
    }

    /// Returns true if `value <op> literal` holds when `value.cmp(literal)`
    /// is `ordering`
    pub fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            PredicateOperator::Equals => ordering == Ordering::Equal,
            PredicateOperator::NotEquals => ordering != Ordering::Equal,
            PredicateOperator::LessThan => ordering == Ordering::Less,
            PredicateOperator::LessThanEquals => ordering != Ordering::Greater,
            PredicateOperator::GreaterThan => ordering == Ordering::Greater,
            PredicateOperator::GreaterThanEquals => ordering != Ordering::Less,
        }
    }

    /// Returns true if an index scan can evaluate this operator
    pub fn is_indexable(&self) -> bool {
        *self != PredicateOperator::NotEquals
    }
}

impl fmt::Display for PredicateOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A selection predicate: `column <op> value`
#[derive(Debug, Clone, PartialEq)]
pub struct SelectPredicate {
    /// Bare or qualified column
    pub column: ColumnRef,
    pub op: PredicateOperator,
    pub value: Value,
}

impl SelectPredicate {
    pub fn new(column: &str, op: PredicateOperator, value: Value) -> Self {
        Self {
            column: ColumnRef::parse(column),
            op,
            value,
        }
    }
}

/// An equi-join clause bringing `table` into the query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    /// Table this clause joins in
    pub table: String,
    /// Qualified column on one side
    pub left: ColumnRef,
    /// Qualified column on the other side
    pub right: ColumnRef,
}

impl JoinClause {
    pub fn new(table: &str, left: &str, right: &str) -> Self {
        Self {
            table: table.to_string(),
            left: ColumnRef::parse(left),
            right: ColumnRef::parse(right),
        }
    }

    /// Orient this clause for extending `covered` by `added`.
    ///
    /// Returns `(column in covered, column on added)`, or `None` if the
    /// clause does not join `added` to `covered`.
    pub fn link<'c, F>(&'c self, added: &str, in_covered: F) -> Option<(&'c ColumnRef, &'c ColumnRef)>
    where
        F: Fn(&ColumnRef) -> bool,
    {
        if self.table != added {
            return None;
        }
        let on_added = |c: &ColumnRef| c.table.as_deref() == Some(added);

        if in_covered(&self.left) && on_added(&self.right) {
            Some((&self.left, &self.right))
        } else if in_covered(&self.right) && on_added(&self.left) {
            Some((&self.right, &self.left))
        } else {
            None
        }
    }
}

/// Aggregates requested by the caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateRequest {
    pub count: bool,
    /// Column to sum
    pub sum: Option<ColumnRef>,
    /// Column to average
    pub average: Option<ColumnRef>,
}

impl AggregateRequest {
    pub fn is_empty(&self) -> bool {
        !self.count && self.sum.is_none() && self.average.is_none()
    }

    /// Returns true if `name` is the output column of a requested aggregate
    pub fn produces(&self, name: &str) -> bool {
        (self.count && name == COUNT_COLUMN)
            || (self.sum.is_some() && name == SUM_COLUMN)
            || (self.average.is_some() && name == AVERAGE_COLUMN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_names() {
        assert_eq!(PredicateOperator::Equals.to_string(), "EQUALS");
        assert_eq!(
            PredicateOperator::GreaterThanEquals.to_string(),
            "GREATER_THAN_EQUALS"
        );
        assert!(!PredicateOperator::NotEquals.is_indexable());
        assert!(PredicateOperator::LessThan.is_indexable());
    }

    #[test]
    fn test_operator_accepts() {
        use Ordering::*;
        assert!(PredicateOperator::LessThanEquals.accepts(Equal));
        assert!(PredicateOperator::LessThanEquals.accepts(Less));
        assert!(!PredicateOperator::LessThan.accepts(Equal));
        assert!(PredicateOperator::NotEquals.accepts(Greater));
        assert!(!PredicateOperator::GreaterThan.accepts(Less));
    }

    #[test]
    fn test_join_clause_orientation() {
        let clause = JoinClause::new("b", "b.id", "a.id");
        let in_a = |c: &ColumnRef| c.table.as_deref() == Some("a");

        let (covered, added) = clause.link("b", in_a).unwrap();
        assert_eq!(covered.to_string(), "a.id");
        assert_eq!(added.to_string(), "b.id");

        assert!(clause.link("c", in_a).is_none());
        assert!(clause.link("b", |_: &ColumnRef| false).is_none());
    }

    #[test]
    fn test_aggregate_request_produces() {
        let request = AggregateRequest {
            count: true,
            sum: None,
            average: Some(ColumnRef::bare("x")),
        };
        assert!(request.produces("countAgg"));
        assert!(request.produces("averageAgg"));
        assert!(!request.produces("sumAgg"));
        assert!(!request.produces("x"));
        assert!(AggregateRequest::default().is_empty());
    }
}
