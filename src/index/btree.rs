//! BTreeMap-based index structures
//!
//! Indexes use BTreeMap<IndexKey, Vec<RecordId>> for deterministic ordering.
//! Record ids are always sorted ascending.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::planner::PredicateOperator;
use crate::schema::{DataType, Value};
use crate::storage::RecordId;

/// Index key representing a column value.
///
/// Float keys are stored as order-preserving bits so the key type has a
/// total order. Ordering is deterministic: Bool < Int < Float < String.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    /// Boolean value (false < true)
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Float value (stored as bits for total ordering)
    Float(u64),
    /// String value
    String(String),
}

impl IndexKey {
    pub fn from_bool(v: bool) -> Self {
        IndexKey::Bool(v)
    }

    pub fn from_int(v: i64) -> Self {
        IndexKey::Int(v)
    }

    /// Create a key from a float
    ///
    /// Uses bit representation for total ordering.
    pub fn from_float(v: f64) -> Self {
        let bits = v.to_bits();
        // Negative: flip all bits. Positive: flip the sign bit.
        let ordered = if (bits >> 63) == 1 {
            !bits
        } else {
            bits ^ (1 << 63)
        };
        IndexKey::Float(ordered)
    }

    pub fn from_string(v: impl Into<String>) -> Self {
        IndexKey::String(v.into())
    }

    /// Key for a value exactly as stored
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(b) => IndexKey::from_bool(*b),
            Value::Int(i) => IndexKey::from_int(i64::from(*i)),
            Value::Float(f) => IndexKey::from_float(f64::from(*f)),
            Value::String(s) => IndexKey::from_string(s.as_str()),
        }
    }

    /// Key for a literal probing a column of `data_type`.
    ///
    /// An integer literal probing a float column is widened; any other
    /// mismatch has no key and matches nothing.
    pub fn for_column(value: &Value, data_type: &DataType) -> Option<Self> {
        match (value, data_type) {
            (Value::Int(i), DataType::Float) => Some(IndexKey::from_float(f64::from(*i))),
            (Value::Bool(_), DataType::Bool)
            | (Value::Int(_), DataType::Int)
            | (Value::Float(_), DataType::Float)
            | (Value::String(_), DataType::String(_)) => Some(IndexKey::from_value(value)),
            _ => None,
        }
    }

    /// Key under which two numerically equal values collide, whatever their
    /// numeric type. Used for hashing join inputs.
    pub fn join_key(value: &Value) -> Self {
        match value.as_f64() {
            Some(v) => IndexKey::from_float(v),
            None => IndexKey::from_value(value),
        }
    }
}

/// A single column index using BTreeMap for deterministic ordering.
#[derive(Debug, Default)]
pub struct IndexTree {
    /// Maps key values to sorted lists of record ids
    tree: BTreeMap<IndexKey, Vec<RecordId>>,
}

impl IndexTree {
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }

    /// Insert a record id for a key.
    ///
    /// Maintains sorted ascending order.
    pub fn insert(&mut self, key: IndexKey, id: RecordId) {
        let ids = self.tree.entry(key).or_default();
        match ids.binary_search(&id) {
            Ok(_) => {}
            Err(pos) => ids.insert(pos, id),
        }
    }

    /// Lookup all record ids for an exact key match.
    pub fn lookup_eq(&self, key: &IndexKey) -> Vec<RecordId> {
        self.tree.get(key).cloned().unwrap_or_default()
    }

    /// Lookup record ids whose keys lie between two bounds.
    ///
    /// Returns ids sorted ascending.
    pub fn lookup_range(&self, min: Bound<&IndexKey>, max: Bound<&IndexKey>) -> Vec<RecordId> {
        let mut result: Vec<RecordId> = self
            .tree
            .range((min, max))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        result.sort_unstable();
        result
    }

    /// Lookup record ids whose key satisfies `key_of_record <op> key`.
    pub fn lookup(&self, op: PredicateOperator, key: &IndexKey) -> Vec<RecordId> {
        use Bound::{Excluded, Included, Unbounded};

        match op {
            PredicateOperator::Equals => self.lookup_eq(key),
            PredicateOperator::LessThan => self.lookup_range(Unbounded, Excluded(key)),
            PredicateOperator::LessThanEquals => self.lookup_range(Unbounded, Included(key)),
            PredicateOperator::GreaterThan => self.lookup_range(Excluded(key), Unbounded),
            PredicateOperator::GreaterThanEquals => self.lookup_range(Included(key), Unbounded),
            PredicateOperator::NotEquals => {
                let mut result: Vec<RecordId> = self
                    .tree
                    .iter()
                    .filter(|(k, _)| *k != key)
                    .flat_map(|(_, ids)| ids.iter().copied())
                    .collect();
                result.sort_unstable();
                result
            }
        }
    }

    /// Returns the number of distinct keys
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }

    /// Returns the total number of entries
    pub fn entry_count(&self) -> usize {
        self.tree.values().map(|v| v.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_tree() -> IndexTree {
        let mut tree = IndexTree::new();
        for (i, v) in [5, 1, 4, 2, 3].iter().enumerate() {
            tree.insert(IndexKey::from_int(*v), RecordId(i));
        }
        tree
    }

    #[test]
    fn test_key_ordering() {
        let keys = vec![
            IndexKey::from_bool(false),
            IndexKey::from_bool(true),
            IndexKey::from_int(-100),
            IndexKey::from_int(0),
            IndexKey::from_int(100),
            IndexKey::from_float(-1.5),
            IndexKey::from_float(0.0),
            IndexKey::from_float(2.25),
            IndexKey::from_string("aaa"),
            IndexKey::from_string("zzz"),
        ];

        for i in 1..keys.len() {
            assert!(keys[i - 1] < keys[i], "Keys should be ordered");
        }
    }

    #[test]
    fn test_ids_sorted() {
        let mut tree = IndexTree::new();
        tree.insert(IndexKey::from_int(42), RecordId(3));
        tree.insert(IndexKey::from_int(42), RecordId(1));
        tree.insert(IndexKey::from_int(42), RecordId(2));
        tree.insert(IndexKey::from_int(42), RecordId(2));

        assert_eq!(
            tree.lookup_eq(&IndexKey::from_int(42)),
            vec![RecordId(1), RecordId(2), RecordId(3)]
        );
        assert_eq!(tree.entry_count(), 3);
    }

    #[test]
    fn test_lookup_by_operator() {
        let tree = int_tree();
        let three = IndexKey::from_int(3);

        // values 5,1,4,2,3 live at ids 0..5
        assert_eq!(tree.lookup(PredicateOperator::Equals, &three), vec![RecordId(4)]);
        assert_eq!(
            tree.lookup(PredicateOperator::LessThan, &three),
            vec![RecordId(1), RecordId(3)]
        );
        assert_eq!(
            tree.lookup(PredicateOperator::LessThanEquals, &three),
            vec![RecordId(1), RecordId(3), RecordId(4)]
        );
        assert_eq!(
            tree.lookup(PredicateOperator::GreaterThan, &three),
            vec![RecordId(0), RecordId(2)]
        );
        assert_eq!(
            tree.lookup(PredicateOperator::GreaterThanEquals, &three),
            vec![RecordId(0), RecordId(2), RecordId(4)]
        );
        assert_eq!(
            tree.lookup(PredicateOperator::NotEquals, &three),
            vec![RecordId(0), RecordId(1), RecordId(2), RecordId(3)]
        );
    }

    #[test]
    fn test_for_column_widens_int_literal() {
        assert_eq!(
            IndexKey::for_column(&Value::Int(2), &DataType::Float),
            Some(IndexKey::from_float(2.0))
        );
        assert_eq!(IndexKey::for_column(&Value::Bool(true), &DataType::Int), None);
    }

    #[test]
    fn test_join_key_numeric_collision() {
        assert_eq!(
            IndexKey::join_key(&Value::Int(7)),
            IndexKey::join_key(&Value::Float(7.0))
        );
        assert_ne!(
            IndexKey::join_key(&Value::string("7")),
            IndexKey::join_key(&Value::Int(7))
        );
    }
}
