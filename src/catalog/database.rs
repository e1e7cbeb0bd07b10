//! In-memory database
//!
//! Owns heap tables and their secondary indexes, and hands out query plans
//! bound to itself as both catalog and data source.

use std::collections::BTreeMap;

use crate::config::{ConfigError, EngineConfig};
use crate::index::{IndexKey, IndexTree};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::planner::{PredicateOperator, QueryPlan};
use crate::schema::{ColumnRef, TableSchema, Value};
use crate::storage::{HeapTable, Record, RecordId, TableStats};

use super::errors::{CatalogError, CatalogResult};
use super::{Catalog, TableAccess};

/// A set of named tables with optional single-column indexes
#[derive(Debug)]
pub struct Database {
    config: EngineConfig,
    tables: BTreeMap<String, HeapTable>,
    /// Keyed by (table, column)
    indexes: BTreeMap<(String, String), IndexTree>,
    metrics: MetricsRegistry,
}

impl Default for Database {
    fn default() -> Self {
        Self::with_checked_config(EngineConfig::default())
    }
}

impl Database {
    /// Create an empty database; rejects a config the cost model cannot use
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_checked_config(config))
    }

    fn with_checked_config(config: EngineConfig) -> Self {
        Self {
            config,
            tables: BTreeMap::new(),
            indexes: BTreeMap::new(),
            metrics: MetricsRegistry::new(),
        }
    }

    /// Create an empty table
    pub fn create_table(&mut self, schema: TableSchema, name: &str) -> CatalogResult<()> {
        if self.tables.contains_key(name) {
            return Err(CatalogError::TableExists(name.to_string()));
        }

        let columns = schema.len().to_string();
        let table = HeapTable::new(name, schema, &self.config);
        self.tables.insert(name.to_string(), table);

        log_event_with_fields(Event::TableCreated, &[("table", name), ("columns", &columns)]);
        Ok(())
    }

    /// Create an index on `table.column`, covering every existing record
    pub fn create_index(&mut self, table: &str, column: &str) -> CatalogResult<()> {
        let heap = self.table(table)?;
        let position = heap
            .schema()
            .resolve(&ColumnRef::bare(column))
            .ok_or_else(|| CatalogError::unknown_column(table, column))?;

        let key = (table.to_string(), column.to_string());
        if self.indexes.contains_key(&key) {
            return Err(CatalogError::IndexExists {
                table: table.to_string(),
                column: column.to_string(),
            });
        }

        let mut tree = IndexTree::new();
        for (i, record) in heap.records().iter().enumerate() {
            if let Some(value) = record.get(position) {
                tree.insert(IndexKey::from_value(value), RecordId(i));
            }
        }

        let entries = tree.entry_count().to_string();
        self.indexes.insert(key, tree);

        log_event_with_fields(
            Event::IndexBuilt,
            &[("table", table), ("column", column), ("entries", &entries)],
        );
        Ok(())
    }

    /// Append a record to a table, updating its indexes
    pub fn add_record(&mut self, table: &str, values: Vec<Value>) -> CatalogResult<RecordId> {
        let heap = self
            .tables
            .get_mut(table)
            .ok_or_else(|| CatalogError::UnknownTable(table.to_string()))?;

        heap.schema()
            .verify(&values)
            .map_err(|reason| CatalogError::SchemaMismatch {
                table: table.to_string(),
                reason,
            })?;

        let keys: Vec<(String, IndexKey)> = heap
            .schema()
            .columns()
            .iter()
            .zip(&values)
            .map(|(c, v)| (c.name.clone(), IndexKey::from_value(v)))
            .collect();

        let id = heap.insert(Record::new(values));

        for (column, key) in keys {
            if let Some(tree) = self.indexes.get_mut(&(table.to_string(), column)) {
                tree.insert(key, id);
            }
        }
        Ok(id)
    }

    /// Drop every table and index
    pub fn delete_all_tables(&mut self) {
        self.tables.clear();
        self.indexes.clear();
    }

    /// Start building a query over `table`
    pub fn query(&self, table: &str) -> QueryPlan<'_, Database> {
        QueryPlan::new(self, table)
    }

    pub fn table(&self, name: &str) -> CatalogResult<&HeapTable> {
        self.tables
            .get(name)
            .ok_or_else(|| CatalogError::UnknownTable(name.to_string()))
    }

    /// Names of all tables, sorted
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }
}

impl Catalog for Database {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn table_schema(&self, table: &str) -> CatalogResult<&TableSchema> {
        Ok(self.table(table)?.schema())
    }

    fn table_stats(&self, table: &str) -> CatalogResult<TableStats> {
        Ok(self.table(table)?.stats(&self.config))
    }

    fn index_exists(&self, table: &str, column: &str) -> bool {
        self.indexes
            .contains_key(&(table.to_string(), column.to_string()))
    }

    fn metrics(&self) -> Option<&MetricsRegistry> {
        Some(&self.metrics)
    }
}

impl TableAccess for Database {
    fn scan(&self, table: &str) -> CatalogResult<&[Record]> {
        Ok(self.table(table)?.records())
    }

    fn index_lookup(
        &self,
        table: &str,
        column: &str,
        op: PredicateOperator,
        value: &Value,
    ) -> CatalogResult<Vec<RecordId>> {
        let heap = self.table(table)?;
        let data_type = heap
            .schema()
            .resolve(&ColumnRef::bare(column))
            .and_then(|i| heap.schema().column(i))
            .map(|c| c.data_type)
            .ok_or_else(|| CatalogError::unknown_column(table, column))?;

        let tree = self
            .indexes
            .get(&(table.to_string(), column.to_string()))
            .ok_or_else(|| CatalogError::unknown_column(table, column))?;

        Ok(match IndexKey::for_column(value, &data_type) {
            Some(key) => tree.lookup(op, &key),
            None => Vec::new(),
        })
    }

    fn fetch(&self, table: &str, id: RecordId) -> CatalogResult<&Record> {
        self.table(table)?
            .get(id)
            .ok_or_else(|| CatalogError::UnknownRecord {
                table: table.to_string(),
                id,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;

    fn db_with_table() -> Database {
        let mut db = Database::default();
        let schema = TableSchema::new()
            .with_column("id", DataType::Int)
            .with_column("score", DataType::Float);
        db.create_table(schema, "scores").unwrap();
        db
    }

    #[test]
    fn test_new_rejects_unusable_config() {
        let flat_index = EngineConfig {
            index_fanout: 1,
            ..Default::default()
        };
        assert!(matches!(Database::new(flat_index), Err(ConfigError::Invalid(_))));

        let oversized_header = EngineConfig {
            page_size: 16,
            page_header_bytes: 64,
            ..Default::default()
        };
        assert!(Database::new(oversized_header).is_err());

        let db = Database::new(EngineConfig::with_buffer_pages(10)).unwrap();
        assert_eq!(db.config().buffer_pages, 10);
    }

    #[test]
    fn test_create_table_twice_fails() {
        let mut db = db_with_table();
        let err = db
            .create_table(TableSchema::new().with_column("x", DataType::Int), "scores")
            .unwrap_err();
        assert_eq!(err, CatalogError::TableExists("scores".into()));
    }

    #[test]
    fn test_add_record_checks_schema() {
        let mut db = db_with_table();
        assert!(db
            .add_record("scores", vec![Value::Int(1), Value::Float(0.5)])
            .is_ok());
        let err = db
            .add_record("scores", vec![Value::Float(0.5), Value::Int(1)])
            .unwrap_err();
        assert!(matches!(err, CatalogError::SchemaMismatch { .. }));
        assert!(matches!(
            db.add_record("missing", vec![]),
            Err(CatalogError::UnknownTable(_))
        ));
    }

    #[test]
    fn test_index_backfills_and_tracks_inserts() {
        let mut db = db_with_table();
        db.add_record("scores", vec![Value::Int(7), Value::Float(1.0)])
            .unwrap();
        db.create_index("scores", "id").unwrap();
        db.add_record("scores", vec![Value::Int(7), Value::Float(2.0)])
            .unwrap();
        db.add_record("scores", vec![Value::Int(8), Value::Float(3.0)])
            .unwrap();

        assert!(db.index_exists("scores", "id"));
        assert!(!db.index_exists("scores", "score"));

        let ids = db
            .index_lookup("scores", "id", PredicateOperator::Equals, &Value::Int(7))
            .unwrap();
        assert_eq!(ids, vec![RecordId(0), RecordId(1)]);

        let record = db.fetch("scores", RecordId(2)).unwrap();
        assert_eq!(record.get(0), Some(&Value::Int(8)));
    }

    #[test]
    fn test_index_on_unknown_column() {
        let mut db = db_with_table();
        assert!(matches!(
            db.create_index("scores", "nope"),
            Err(CatalogError::UnknownColumn { .. })
        ));
        db.create_index("scores", "id").unwrap();
        assert!(matches!(
            db.create_index("scores", "id"),
            Err(CatalogError::IndexExists { .. })
        ));
    }

    #[test]
    fn test_float_index_probed_with_int_literal() {
        let mut db = db_with_table();
        db.create_index("scores", "score").unwrap();
        db.add_record("scores", vec![Value::Int(1), Value::Float(2.0)])
            .unwrap();
        let ids = db
            .index_lookup("scores", "score", PredicateOperator::Equals, &Value::Int(2))
            .unwrap();
        assert_eq!(ids, vec![RecordId(0)]);
    }

    #[test]
    fn test_delete_all_tables() {
        let mut db = db_with_table();
        db.create_index("scores", "id").unwrap();
        db.delete_all_tables();
        assert!(db.table_names().is_empty());
        assert!(!db.index_exists("scores", "id"));
    }
}
