//! Predicate filtering for query execution
//!
//! No type coercion beyond comparing Int and Float numerically.
//! Missing and incomparable values never match.

use crate::planner::PredicateOperator;
use crate::schema::Value;
use crate::storage::Record;

/// Evaluates comparison predicates against record values
pub struct PredicateFilter;

impl PredicateFilter {
    /// Checks if `value <op> literal` holds
    pub fn matches(value: Option<&Value>, op: PredicateOperator, literal: &Value) -> bool {
        let value = match value {
            Some(v) => v,
            None => return false,
        };

        match value.compare(literal) {
            Some(ordering) => op.accepts(ordering),
            None => false,
        }
    }

    /// Checks if a record's column at `index` satisfies `<op> literal`
    pub fn matches_record(
        record: &Record,
        index: usize,
        op: PredicateOperator,
        literal: &Value,
    ) -> bool {
        Self::matches(record.get(index), op, literal)
    }

    /// Equi-join condition between two records
    pub fn join_matches(left: &Record, left_index: usize, right: &Record, right_index: usize) -> bool {
        match right.get(right_index) {
            Some(r) => Self::matches(left.get(left_index), PredicateOperator::Equals, r),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality() {
        let v = Value::Int(5);
        assert!(PredicateFilter::matches(Some(&v), PredicateOperator::Equals, &Value::Int(5)));
        assert!(!PredicateFilter::matches(Some(&v), PredicateOperator::Equals, &Value::Int(6)));
        assert!(PredicateFilter::matches(Some(&v), PredicateOperator::NotEquals, &Value::Int(6)));
    }

    #[test]
    fn test_ranges() {
        let v = Value::string("m");
        assert!(PredicateFilter::matches(Some(&v), PredicateOperator::GreaterThan, &Value::string("a")));
        assert!(PredicateFilter::matches(Some(&v), PredicateOperator::LessThanEquals, &Value::string("m")));
        assert!(!PredicateFilter::matches(Some(&v), PredicateOperator::LessThan, &Value::string("m")));
    }

    #[test]
    fn test_bool_ordering() {
        let t = Value::Bool(true);
        assert!(PredicateFilter::matches(
            Some(&t),
            PredicateOperator::GreaterThanEquals,
            &Value::Bool(true)
        ));
        assert!(!PredicateFilter::matches(
            Some(&Value::Bool(false)),
            PredicateOperator::GreaterThanEquals,
            &Value::Bool(true)
        ));
    }

    #[test]
    fn test_numeric_cross_type() {
        let v = Value::Float(2.5);
        assert!(PredicateFilter::matches(Some(&v), PredicateOperator::GreaterThan, &Value::Int(2)));
    }

    #[test]
    fn test_incomparable_never_matches() {
        let v = Value::Int(1);
        assert!(!PredicateFilter::matches(Some(&v), PredicateOperator::Equals, &Value::string("1")));
        assert!(!PredicateFilter::matches(Some(&v), PredicateOperator::NotEquals, &Value::string("1")));
        assert!(!PredicateFilter::matches(None, PredicateOperator::NotEquals, &Value::Int(1)));
    }

    #[test]
    fn test_join_matches() {
        let left = Record::new(vec![Value::Int(1), Value::string("a")]);
        let right = Record::new(vec![Value::string("a")]);
        assert!(PredicateFilter::join_matches(&left, 1, &right, 0));
        assert!(!PredicateFilter::join_matches(&left, 0, &right, 0));
        assert!(!PredicateFilter::join_matches(&left, 1, &right, 3));
    }
}
