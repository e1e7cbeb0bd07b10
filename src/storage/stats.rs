//! Table statistics and selectivity estimation
//!
//! Base tables report exact statistics. Operators derive estimated
//! statistics for their outputs from their inputs, so every node of an
//! operator tree can report how many pages it produces.

use crate::config::EngineConfig;
use crate::planner::PredicateOperator;
use crate::schema::{DataType, Value};

/// Selectivity assumed for a range predicate without usable bounds
const DEFAULT_RANGE_SELECTIVITY: f64 = 1.0 / 3.0;

/// Per-column statistics
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    /// Column type
    pub data_type: DataType,
    /// Number of distinct values
    pub distinct: u64,
    /// Smallest numeric value, if the column is numeric and non-empty
    pub min: Option<f64>,
    /// Largest numeric value, if the column is numeric and non-empty
    pub max: Option<f64>,
}

impl ColumnStats {
    /// Statistics of an empty column
    pub fn empty(data_type: DataType) -> Self {
        Self {
            data_type,
            distinct: 0,
            min: None,
            max: None,
        }
    }

    /// Fraction of rows expected to satisfy `column <op> value`
    pub fn reduction_factor(&self, op: PredicateOperator, value: &Value) -> f64 {
        let equality = if self.distinct == 0 {
            0.0
        } else {
            1.0 / self.distinct as f64
        };

        match op {
            PredicateOperator::Equals => equality,
            PredicateOperator::NotEquals => 1.0 - equality,
            _ => match (self.min, self.max, value.as_f64()) {
                (Some(min), Some(max), Some(v)) if self.data_type.is_numeric() => {
                    range_fraction(op, min, max, v)
                }
                _ => DEFAULT_RANGE_SELECTIVITY,
            },
        }
    }

    fn capped(&self, records: u64) -> Self {
        Self {
            distinct: self.distinct.min(records),
            ..self.clone()
        }
    }
}

/// Fraction of a uniform [min, max] distribution satisfying `x <op> v`
fn range_fraction(op: PredicateOperator, min: f64, max: f64, v: f64) -> f64 {
    if max <= min {
        // a single distinct value either passes or it does not
        let passes = match min.partial_cmp(&v) {
            Some(ordering) => op.accepts(ordering),
            None => false,
        };
        return if passes { 1.0 } else { 0.0 };
    }

    let below = ((v - min) / (max - min)).clamp(0.0, 1.0);
    match op {
        PredicateOperator::LessThan | PredicateOperator::LessThanEquals => below,
        _ => 1.0 - below,
    }
}

/// Statistics describing a table or an operator's output
#[derive(Debug, Clone, PartialEq)]
pub struct TableStats {
    num_records: u64,
    record_size: usize,
    records_per_page: u64,
    columns: Vec<ColumnStats>,
}

impl TableStats {
    pub fn new(
        num_records: u64,
        record_size: usize,
        columns: Vec<ColumnStats>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            num_records,
            record_size,
            records_per_page: config.records_per_page(record_size) as u64,
            columns,
        }
    }

    pub fn num_records(&self) -> u64 {
        self.num_records
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn records_per_page(&self) -> u64 {
        self.records_per_page
    }

    /// Pages needed to hold every record
    pub fn num_pages(&self) -> u64 {
        self.num_records.div_ceil(self.records_per_page)
    }

    pub fn column(&self, index: usize) -> Option<&ColumnStats> {
        self.columns.get(index)
    }

    /// Fraction of rows expected to satisfy `column <op> value`.
    ///
    /// An unknown column position selects nothing.
    pub fn reduction_factor(&self, column: usize, op: PredicateOperator, value: &Value) -> f64 {
        self.columns
            .get(column)
            .map_or(0.0, |c| c.reduction_factor(op, value))
    }

    /// Estimated statistics after filtering on `column <op> value`
    pub fn with_predicate(&self, column: usize, op: PredicateOperator, value: &Value) -> Self {
        let factor = self.reduction_factor(column, op, value);
        let records = scale(self.num_records, factor);

        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if i == column && op == PredicateOperator::Equals {
                    let point = value.as_f64();
                    ColumnStats {
                        data_type: c.data_type,
                        distinct: records.min(1),
                        min: point.filter(|_| c.data_type.is_numeric()),
                        max: point.filter(|_| c.data_type.is_numeric()),
                    }
                } else {
                    c.capped(records)
                }
            })
            .collect();

        Self {
            num_records: records,
            columns,
            ..self.clone()
        }
    }

    /// Estimated statistics of an equi-join of `left` and `right`.
    ///
    /// Assumes containment of value sets: the output has
    /// `|L| * |R| / max(distinct_left, distinct_right)` records.
    pub fn join(
        left: &TableStats,
        right: &TableStats,
        left_column: usize,
        right_column: usize,
        config: &EngineConfig,
    ) -> Self {
        let distinct_left = left.columns.get(left_column).map_or(0, |c| c.distinct);
        let distinct_right = right.columns.get(right_column).map_or(0, |c| c.distinct);
        let distinct = distinct_left.max(distinct_right);

        let records = if distinct == 0 {
            0
        } else {
            let product = left.num_records as f64 * right.num_records as f64;
            (product / distinct as f64).ceil() as u64
        };

        let columns = left
            .columns
            .iter()
            .chain(right.columns.iter())
            .map(|c| c.capped(records))
            .collect();

        TableStats::new(records, left.record_size + right.record_size, columns, config)
    }

    /// Statistics of a projection onto `indices`, followed by any extra
    /// computed columns
    pub fn project(
        &self,
        indices: &[usize],
        extra: Vec<ColumnStats>,
        num_records: u64,
        config: &EngineConfig,
    ) -> Self {
        let mut columns: Vec<ColumnStats> = indices
            .iter()
            .filter_map(|i| self.columns.get(*i))
            .map(|c| c.capped(num_records))
            .collect();
        columns.extend(extra);

        let record_size = columns.iter().map(|c| c.data_type.size_bytes()).sum();
        TableStats::new(num_records, record_size, columns, config)
    }
}

/// `records * factor`, rounded up, never more than `records`
fn scale(records: u64, factor: f64) -> u64 {
    let scaled = (records as f64 * factor.clamp(0.0, 1.0)).ceil() as u64;
    scaled.min(records)
}
