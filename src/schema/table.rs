//! Table schemas and column references
//!
//! Base tables carry bare column names. Operator outputs carry names
//! qualified by their source table (`table.column`), so a join output keeps
//! every input column addressable.

use std::fmt;

use super::types::{DataType, Value};

/// A column reference as written by a caller: `column` or `table.column`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnRef {
    /// Table qualifier, if one was written
    pub table: Option<String>,
    /// Column name
    pub column: String,
}

impl ColumnRef {
    /// Parse `table.column` or a bare `column`.
    ///
    /// Only the first `.` separates the qualifier.
    pub fn parse(text: &str) -> Self {
        match text.split_once('.') {
            Some((table, column)) => Self::qualified(table, column),
            None => Self::bare(text),
        }
    }

    /// Create a bare column reference
    pub fn bare(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    /// Create a qualified column reference
    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }

    /// Returns true if this reference can name a column of `table`
    pub fn may_refer_to(&self, table: &str) -> bool {
        self.table.as_deref().map_or(true, |t| t == table)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

/// One schema column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
}

/// Ordered list of columns
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSchema {
    columns: Vec<Column>,
}

impl TableSchema {
    /// Creates an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column
    pub fn with_column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(Column {
            name: name.into(),
            data_type,
        });
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Width of one record on a page
    pub fn record_size(&self) -> usize {
        self.columns.iter().map(|c| c.data_type.size_bytes()).sum()
    }

    /// Returns a copy with every column name prefixed by `table.`
    pub fn qualify(&self, table: &str) -> TableSchema {
        TableSchema {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: format!("{}.{}", table, c.name),
                    data_type: c.data_type,
                })
                .collect(),
        }
    }

    /// Concatenation of two schemas (left columns first)
    pub fn concat(&self, other: &TableSchema) -> TableSchema {
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        TableSchema { columns }
    }

    /// Schema made of the given columns, in the given order
    pub fn select(&self, indices: &[usize]) -> TableSchema {
        TableSchema {
            columns: indices
                .iter()
                .filter_map(|i| self.columns.get(*i).cloned())
                .collect(),
        }
    }

    /// Resolve a column reference to a position.
    ///
    /// A qualified reference must match a qualified name exactly. A bare
    /// reference matches an identical name, or the part of a qualified name
    /// after its first `.`. The first match in column order wins.
    pub fn resolve(&self, column: &ColumnRef) -> Option<usize> {
        let exact = column.to_string();
        if let Some(pos) = self.columns.iter().position(|c| c.name == exact) {
            return Some(pos);
        }
        if column.table.is_some() {
            return None;
        }
        self.columns.iter().position(|c| match c.name.split_once('.') {
            Some((_, name)) => name == column.column,
            None => false,
        })
    }

    /// Check that `values` matches this schema column for column
    pub fn verify(&self, values: &[Value]) -> Result<(), String> {
        if values.len() != self.columns.len() {
            return Err(format!(
                "expected {} values, got {}",
                self.columns.len(),
                values.len()
            ));
        }
        for (value, column) in values.iter().zip(&self.columns) {
            if !value.fits(&column.data_type) {
                return Err(format!(
                    "value '{}' does not fit column '{}' of type {}",
                    value,
                    column.name,
                    column.data_type.type_name()
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_types() -> TableSchema {
        TableSchema::new()
            .with_column("bool", DataType::Bool)
            .with_column("int", DataType::Int)
            .with_column("string", DataType::String(5))
            .with_column("float", DataType::Float)
    }

    #[test]
    fn test_parse_column_ref() {
        assert_eq!(ColumnRef::parse("t.a"), ColumnRef::qualified("t", "a"));
        assert_eq!(ColumnRef::parse("a"), ColumnRef::bare("a"));
        assert_eq!(ColumnRef::parse("t.a").to_string(), "t.a");
    }

    #[test]
    fn test_record_size() {
        assert_eq!(all_types().record_size(), 14);
    }

    #[test]
    fn test_resolve_bare_against_qualified() {
        let joined = all_types().qualify("t1").concat(&all_types().qualify("t2"));
        assert_eq!(joined.resolve(&ColumnRef::bare("int")), Some(1));
        assert_eq!(joined.resolve(&ColumnRef::qualified("t2", "int")), Some(5));
        assert_eq!(joined.resolve(&ColumnRef::qualified("t3", "int")), None);
        assert_eq!(joined.resolve(&ColumnRef::bare("missing")), None);
    }

    #[test]
    fn test_resolve_on_base_schema() {
        let schema = all_types();
        assert_eq!(schema.resolve(&ColumnRef::bare("float")), Some(3));
        // base schemas are unqualified, so a qualifier cannot match
        assert_eq!(schema.resolve(&ColumnRef::qualified("t", "float")), None);
    }

    #[test]
    fn test_verify() {
        let schema = all_types();
        let good = vec![
            Value::Bool(true),
            Value::Int(1),
            Value::string("abc"),
            Value::Float(1.5),
        ];
        assert!(schema.verify(&good).is_ok());
        assert!(schema.verify(&good[..3]).is_err());

        let bad = vec![
            Value::Int(1),
            Value::Int(1),
            Value::string("abc"),
            Value::Float(1.5),
        ];
        assert!(schema.verify(&bad).is_err());
    }
}
