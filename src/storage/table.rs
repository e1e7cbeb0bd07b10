//! In-memory heap tables
//!
//! Records are appended in insertion order and never move, so a record id
//! stays valid for the life of the table. Column statistics are maintained
//! incrementally on every insert.

use std::collections::BTreeSet;

use crate::config::EngineConfig;
use crate::index::IndexKey;
use crate::schema::TableSchema;

use super::record::{Record, RecordId};
use super::stats::{ColumnStats, TableStats};

/// Running statistics for one column
#[derive(Debug, Clone, Default)]
struct ColumnTracker {
    distinct: BTreeSet<IndexKey>,
    min: Option<f64>,
    max: Option<f64>,
}

impl ColumnTracker {
    fn observe(&mut self, key: IndexKey, numeric: Option<f64>) {
        self.distinct.insert(key);
        if let Some(v) = numeric {
            self.min = Some(self.min.map_or(v, |m| m.min(v)));
            self.max = Some(self.max.map_or(v, |m| m.max(v)));
        }
    }
}

/// A named heap of fixed-width records
#[derive(Debug)]
pub struct HeapTable {
    name: String,
    schema: TableSchema,
    records: Vec<Record>,
    records_per_page: usize,
    trackers: Vec<ColumnTracker>,
}

impl HeapTable {
    /// Create an empty table laid out for `config`'s page geometry
    pub fn new(name: impl Into<String>, schema: TableSchema, config: &EngineConfig) -> Self {
        let records_per_page = config.records_per_page(schema.record_size());
        let trackers = vec![ColumnTracker::default(); schema.len()];
        Self {
            name: name.into(),
            schema,
            records: Vec::new(),
            records_per_page,
            trackers,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Append a record. The caller has verified it against the schema.
    pub fn insert(&mut self, record: Record) -> RecordId {
        for (tracker, value) in self.trackers.iter_mut().zip(record.values()) {
            tracker.observe(IndexKey::from_value(value), value.as_f64());
        }
        let id = RecordId(self.records.len());
        self.records.push(record);
        id
    }

    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    pub fn records_per_page(&self) -> usize {
        self.records_per_page
    }

    pub fn num_pages(&self) -> usize {
        self.records.len().div_ceil(self.records_per_page)
    }

    /// All records in insertion order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(id.0)
    }

    /// Exact statistics of the current contents
    pub fn stats(&self, config: &EngineConfig) -> TableStats {
        let columns = self
            .schema
            .columns()
            .iter()
            .zip(&self.trackers)
            .map(|(column, tracker)| ColumnStats {
                data_type: column.data_type,
                distinct: tracker.distinct.len() as u64,
                min: tracker.min,
                max: tracker.max,
            })
            .collect();

        TableStats::new(
            self.records.len() as u64,
            self.schema.record_size(),
            columns,
            config,
        )
    }
}
