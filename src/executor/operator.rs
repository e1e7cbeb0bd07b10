//! Operator trees
//!
//! A [`QueryOperator`] is an immutable node that owns its children. Every
//! node carries its qualified output schema, estimated output statistics and
//! its estimated I/O cost, all computed once at construction.
//!
//! Costs are page I/Os. Join costs count reading the inputs as the join
//! algorithm does, not the work done below those inputs.

use std::fmt;

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::planner::{AggregateRequest, PlannerError, PlannerResult, PredicateOperator};
use crate::schema::{ColumnRef, DataType, TableSchema, Value};
use crate::storage::{ColumnStats, TableStats};

/// Output column name of a count aggregate
pub const COUNT_COLUMN: &str = "countAgg";
/// Output column name of a sum aggregate
pub const SUM_COLUMN: &str = "sumAgg";
/// Output column name of an average aggregate
pub const AVERAGE_COLUMN: &str = "averageAgg";

/// Supported join algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinAlgorithm {
    /// Page-oriented nested loop
    PageNestedLoop,
    /// Block nested loop over B-2 buffer pages
    BlockNestedLoop,
    /// Grace hash join over B-1 partitions
    GraceHash,
    /// Sort-merge join (not implemented)
    SortMerge,
}

impl JoinAlgorithm {
    /// Algorithms the cost comparator tries, in tie-breaking order
    pub const CANDIDATES: [JoinAlgorithm; 3] = [
        JoinAlgorithm::PageNestedLoop,
        JoinAlgorithm::BlockNestedLoop,
        JoinAlgorithm::GraceHash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JoinAlgorithm::PageNestedLoop => "PNLJ",
            JoinAlgorithm::BlockNestedLoop => "BNLJ",
            JoinAlgorithm::GraceHash => "GRACEHASH",
            JoinAlgorithm::SortMerge => "SORTMERGE",
        }
    }

    /// I/O cost of joining inputs of `left_pages` and `right_pages` pages
    pub fn io_cost(&self, left_pages: u64, right_pages: u64, config: &EngineConfig) -> PlannerResult<u64> {
        let (l, r) = (left_pages, right_pages);
        match self {
            JoinAlgorithm::PageNestedLoop => Ok(l.saturating_add(l.saturating_mul(r))),
            JoinAlgorithm::BlockNestedLoop => {
                let block = (config.buffer_pages.saturating_sub(2) as u64).max(1);
                Ok(l.saturating_add(l.div_ceil(block).saturating_mul(r)))
            }
            JoinAlgorithm::GraceHash => Ok(l.saturating_add(r).saturating_mul(3)),
            JoinAlgorithm::SortMerge => Err(PlannerError::unsupported_join(self.as_str())),
        }
    }

    /// I/O cost of joining two operators' outputs
    pub fn estimate(
        &self,
        left: &QueryOperator,
        right: &QueryOperator,
        config: &EngineConfig,
    ) -> PlannerResult<u64> {
        self.io_cost(left.stats.num_pages(), right.stats.num_pages(), config)
    }
}

impl fmt::Display for JoinAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved aggregate input column
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateColumn {
    /// Qualified column name
    pub name: String,
    /// Position in the input record
    pub index: usize,
    pub data_type: DataType,
}

/// Aggregates computed by a project node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    pub count: bool,
    pub sum: Option<AggregateColumn>,
    pub average: Option<AggregateColumn>,
}

impl Aggregates {
    pub fn is_empty(&self) -> bool {
        !self.count && self.sum.is_none() && self.average.is_none()
    }

    fn labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        if self.count {
            labels.push("COUNT".to_string());
        }
        if let Some(sum) = &self.sum {
            labels.push(format!("SUM({})", sum.name));
        }
        if let Some(average) = &self.average {
            labels.push(format!("AVERAGE({})", average.name));
        }
        labels
    }
}

/// Node variants
#[derive(Debug, Clone)]
pub enum OperatorKind {
    SeqScan {
        table: String,
    },
    IndexScan {
        table: String,
        /// Bare column name as indexed
        column: String,
        op: PredicateOperator,
        value: Value,
    },
    Select {
        source: Box<QueryOperator>,
        /// Qualified column name
        column: String,
        index: usize,
        op: PredicateOperator,
        value: Value,
    },
    Join {
        left: Box<QueryOperator>,
        right: Box<QueryOperator>,
        left_column: String,
        right_column: String,
        left_index: usize,
        right_index: usize,
        algorithm: JoinAlgorithm,
        /// Left records held per pass over the right input
        block_records: usize,
        /// Hash partitions per input
        partitions: usize,
    },
    GroupBy {
        source: Box<QueryOperator>,
        column: String,
        index: usize,
    },
    Project {
        source: Box<QueryOperator>,
        /// Columns as requested by the caller
        columns: Vec<String>,
        /// Input positions of the non-aggregate columns
        indices: Vec<usize>,
        aggregates: Aggregates,
        /// Input position of the grouping column, if grouped
        group_index: Option<usize>,
    },
}

/// An immutable operator tree node
#[derive(Debug, Clone)]
pub struct QueryOperator {
    pub(super) kind: OperatorKind,
    schema: TableSchema,
    stats: TableStats,
    io_cost: u64,
}

impl QueryOperator {
    /// Full scan of a base table
    pub fn seq_scan<C: Catalog>(catalog: &C, table: &str) -> PlannerResult<Self> {
        let schema = catalog.table_schema(table)?.qualify(table);
        let stats = catalog.table_stats(table)?;
        let io_cost = stats.num_pages();

        Ok(Self {
            kind: OperatorKind::SeqScan {
                table: table.to_string(),
            },
            schema,
            stats,
            io_cost,
        })
    }

    /// Index lookup on `table.column <op> value`
    pub fn index_scan<C: Catalog>(
        catalog: &C,
        table: &str,
        column: &str,
        op: PredicateOperator,
        value: Value,
    ) -> PlannerResult<Self> {
        if op == PredicateOperator::NotEquals {
            return Err(PlannerError::invalid(format!(
                "Index scan on '{}.{}' cannot evaluate {}",
                table, column, op
            )));
        }
        if !catalog.index_exists(table, column) {
            return Err(PlannerError::invalid(format!(
                "No index on '{}.{}'",
                table, column
            )));
        }

        let base = catalog.table_schema(table)?;
        let position = base
            .resolve(&ColumnRef::bare(column))
            .ok_or_else(|| PlannerError::unknown_column(format!("{}.{}", table, column)))?;

        let table_stats = catalog.table_stats(table)?;
        let records = table_stats.num_records();
        let factor = table_stats.reduction_factor(position, op, &value);
        let matches = (factor * records as f64).ceil() as u64;
        let io_cost = catalog
            .config()
            .index_height(records)
            .saturating_add(matches);
        let stats = table_stats.with_predicate(position, op, &value);

        Ok(Self {
            kind: OperatorKind::IndexScan {
                table: table.to_string(),
                column: column.to_string(),
                op,
                value,
            },
            schema: base.qualify(table),
            stats,
            io_cost,
        })
    }

    /// Filter `source` on `column <op> value`
    pub fn select(
        source: QueryOperator,
        column: &ColumnRef,
        op: PredicateOperator,
        value: Value,
    ) -> PlannerResult<Self> {
        let index = source.resolve(column)?;
        let name = source.column_name(index);
        let stats = source.stats.with_predicate(index, op, &value);
        let io_cost = source.io_cost;
        let schema = source.schema.clone();

        Ok(Self {
            kind: OperatorKind::Select {
                source: Box::new(source),
                column: name,
                index,
                op,
                value,
            },
            schema,
            stats,
            io_cost,
        })
    }

    /// Equi-join of `left.left_column = right.right_column`
    pub fn join(
        config: &EngineConfig,
        left: QueryOperator,
        right: QueryOperator,
        left_column: &ColumnRef,
        right_column: &ColumnRef,
        algorithm: JoinAlgorithm,
    ) -> PlannerResult<Self> {
        let io_cost = algorithm.estimate(&left, &right, config)?;
        let left_index = left.resolve(left_column)?;
        let right_index = right.resolve(right_column)?;

        let left_per_page = left.stats.records_per_page() as usize;
        let block_records = match algorithm {
            JoinAlgorithm::BlockNestedLoop => {
                left_per_page.saturating_mul(config.buffer_pages.saturating_sub(2).max(1))
            }
            _ => left_per_page,
        };
        let partitions = config.buffer_pages.saturating_sub(1).max(1);

        let schema = left.schema.concat(&right.schema);
        let stats = TableStats::join(&left.stats, &right.stats, left_index, right_index, config);

        Ok(Self {
            kind: OperatorKind::Join {
                left_column: left.column_name(left_index),
                right_column: right.column_name(right_index),
                left: Box::new(left),
                right: Box::new(right),
                left_index,
                right_index,
                algorithm,
                block_records: block_records.max(1),
                partitions,
            },
            schema,
            stats,
            io_cost,
        })
    }

    /// Group `source`'s records by `column`
    pub fn group_by(source: QueryOperator, column: &ColumnRef) -> PlannerResult<Self> {
        let index = source.resolve(column)?;
        let name = source.column_name(index);
        let schema = source.schema.clone();
        let stats = source.stats.clone();
        let io_cost = source.io_cost;

        Ok(Self {
            kind: OperatorKind::GroupBy {
                source: Box::new(source),
                column: name,
                index,
            },
            schema,
            stats,
            io_cost,
        })
    }

    /// Project `columns` and compute `aggregates`, per group of `group`
    /// when grouped.
    ///
    /// A requested column named after a requested aggregate's result
    /// (`countAgg`, `sumAgg`, `averageAgg`) refers to that result.
    pub fn project(
        config: &EngineConfig,
        source: QueryOperator,
        columns: &[String],
        request: &AggregateRequest,
        group: Option<&ColumnRef>,
    ) -> PlannerResult<Self> {
        let mut indices = Vec::new();
        for column in columns {
            if request.produces(column) {
                continue;
            }
            indices.push(source.resolve(&ColumnRef::parse(column))?);
        }

        let aggregates = Aggregates {
            count: request.count,
            sum: request
                .sum
                .as_ref()
                .map(|c| source.aggregate_column(SUM_COLUMN, c))
                .transpose()?,
            average: request
                .average
                .as_ref()
                .map(|c| source.aggregate_column(AVERAGE_COLUMN, c))
                .transpose()?,
        };

        let group_index = group.map(|c| source.resolve(c)).transpose()?;

        let input_records = source.stats.num_records();
        let records = if aggregates.is_empty() {
            input_records
        } else {
            match group_index.and_then(|i| source.stats.column(i)) {
                Some(c) => c.distinct.min(input_records),
                None => input_records.min(1),
            }
        };

        let mut schema = source.schema.select(&indices);
        let mut extra = Vec::new();
        if aggregates.count {
            schema = schema.with_column(COUNT_COLUMN, DataType::Int);
            extra.push(ColumnStats::empty(DataType::Int));
        }
        if let Some(sum) = &aggregates.sum {
            schema = schema.with_column(SUM_COLUMN, sum.data_type);
            extra.push(ColumnStats::empty(sum.data_type));
        }
        if aggregates.average.is_some() {
            schema = schema.with_column(AVERAGE_COLUMN, DataType::Float);
            extra.push(ColumnStats::empty(DataType::Float));
        }

        let stats = source.stats.project(&indices, extra, records, config);
        let io_cost = source.io_cost;

        Ok(Self {
            kind: OperatorKind::Project {
                source: Box::new(source),
                columns: columns.to_vec(),
                indices,
                aggregates,
                group_index,
            },
            schema,
            stats,
            io_cost,
        })
    }

    pub fn kind(&self) -> &OperatorKind {
        &self.kind
    }

    /// Qualified output schema
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Estimated output statistics
    pub fn stats(&self) -> &TableStats {
        &self.stats
    }

    /// Estimated I/O cost in pages
    pub fn estimate_io_cost(&self) -> u64 {
        self.io_cost
    }

    /// Rendered `type:` of this node
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            OperatorKind::SeqScan { .. } => "SEQSCAN",
            OperatorKind::IndexScan { .. } => "INDEXSCAN",
            OperatorKind::Select { .. } => "SELECT",
            OperatorKind::Join { algorithm, .. } => algorithm.as_str(),
            OperatorKind::GroupBy { .. } => "GROUPBY",
            OperatorKind::Project { .. } => "PROJECT",
        }
    }

    /// Position of `column` in this node's output
    pub fn resolve(&self, column: &ColumnRef) -> PlannerResult<usize> {
        self.schema
            .resolve(column)
            .ok_or_else(|| PlannerError::unknown_column(column.to_string()))
    }

    fn column_name(&self, index: usize) -> String {
        self.schema
            .column(index)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }

    fn aggregate_column(&self, aggregate: &str, column: &ColumnRef) -> PlannerResult<AggregateColumn> {
        let index = self.resolve(column)?;
        let data_type = self
            .schema
            .column(index)
            .map(|c| c.data_type)
            .ok_or_else(|| PlannerError::unknown_column(column.to_string()))?;
        if !data_type.is_numeric() {
            return Err(PlannerError::aggregate_type(aggregate, &column.to_string(), data_type));
        }
        Ok(AggregateColumn {
            name: self.column_name(index),
            index,
            data_type,
        })
    }

    /// One line per `key: value`, children indented one tab per level
    fn render_lines(&self, depth: usize, lines: &mut Vec<String>) {
        let indent = "\t".repeat(depth);
        let mut push = |line: String| lines.push(format!("{}{}", indent, line));

        push(format!("type: {}", self.type_name()));
        match &self.kind {
            OperatorKind::SeqScan { table } => {
                push(format!("table: {}", table));
            }
            OperatorKind::IndexScan {
                table,
                column,
                op,
                value,
            } => {
                push(format!("table: {}", table));
                push(format!("column: {}.{}", table, column));
                push(format!("operator: {}", op));
                push(format!("value: {}", value));
            }
            OperatorKind::Select {
                source,
                column,
                op,
                value,
                ..
            } => {
                push(format!("column: {}", column));
                push(format!("operator: {}", op));
                push(format!("value: {}", value));
                source.render_lines(depth + 1, lines);
            }
            OperatorKind::Join {
                left,
                right,
                left_column,
                right_column,
                ..
            } => {
                push(format!("leftColumn: {}", left_column));
                push(format!("rightColumn: {}", right_column));
                left.render_lines(depth + 1, lines);
                right.render_lines(depth + 1, lines);
            }
            OperatorKind::GroupBy { source, column, .. } => {
                push(format!("column: {}", column));
                source.render_lines(depth + 1, lines);
            }
            OperatorKind::Project {
                source,
                columns,
                aggregates,
                ..
            } => {
                push(format!("columns: [{}]", columns.join(", ")));
                if !aggregates.is_empty() {
                    push(format!("aggregates: [{}]", aggregates.labels().join(", ")));
                }
                source.render_lines(depth + 1, lines);
            }
        }
    }
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        self.render_lines(0, &mut lines);
        write!(f, "{}", lines.join("\n"))
    }
}
