//! Record streams
//!
//! Executing an operator tree yields a lazy, single-pass iterator of
//! records. Blocking operators (grace hash, group by) buffer their input on
//! the first pull. Dropping a stream early releases everything it buffered.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::iter;

use crate::catalog::TableAccess;
use crate::index::IndexKey;
use crate::schema::{DataType, Value};
use crate::storage::Record;

use super::errors::{ExecutorError, ExecutorResult};
use super::filters::PredicateFilter;
use super::operator::{
    Aggregates, JoinAlgorithm, OperatorKind, QueryOperator, AVERAGE_COLUMN, COUNT_COLUMN, SUM_COLUMN,
};

/// A lazy, single-pass stream of output records
pub type RecordStream<'a> = Box<dyn Iterator<Item = ExecutorResult<Record>> + 'a>;

fn failed<'a>(err: ExecutorError) -> RecordStream<'a> {
    Box::new(iter::once(Err(err)))
}

impl QueryOperator {
    /// Stream this node's output records from `db`
    pub fn execute<'a>(&'a self, db: &'a dyn TableAccess) -> RecordStream<'a> {
        match &self.kind {
            OperatorKind::SeqScan { table } => match db.scan(table) {
                Ok(records) => Box::new(records.iter().cloned().map(Ok)),
                Err(e) => failed(e.into()),
            },
            OperatorKind::IndexScan {
                table,
                column,
                op,
                value,
            } => match db.index_lookup(table, column, *op, value) {
                Ok(ids) => Box::new(
                    ids.into_iter()
                        .map(move |id| db.fetch(table, id).cloned().map_err(ExecutorError::from)),
                ),
                Err(e) => failed(e.into()),
            },
            OperatorKind::Select {
                source,
                index,
                op,
                value,
                ..
            } => {
                let (index, op) = (*index, *op);
                Box::new(source.execute(db).filter(move |item| match item {
                    Ok(record) => PredicateFilter::matches_record(record, index, op, value),
                    Err(_) => true,
                }))
            }
            OperatorKind::Join {
                left,
                right,
                left_index,
                right_index,
                algorithm,
                block_records,
                partitions,
                ..
            } => match algorithm {
                JoinAlgorithm::PageNestedLoop | JoinAlgorithm::BlockNestedLoop => {
                    Box::new(NestedLoopJoin::new(
                        db,
                        left.execute(db),
                        right,
                        *left_index,
                        *right_index,
                        *block_records,
                    ))
                }
                JoinAlgorithm::GraceHash => Box::new(GraceHashJoin::new(
                    left.execute(db),
                    right.execute(db),
                    *left_index,
                    *right_index,
                    *partitions,
                )),
                JoinAlgorithm::SortMerge => failed(ExecutorError::execution_failed(
                    "SORTMERGE joins cannot be executed",
                )),
            },
            OperatorKind::GroupBy { source, index, .. } => {
                Box::new(GroupedStream::new(source.execute(db), *index))
            }
            OperatorKind::Project {
                source,
                indices,
                aggregates,
                group_index,
                ..
            } => {
                if aggregates.is_empty() {
                    Box::new(source.execute(db).map(move |item| {
                        item.map(|record| {
                            Record::new(
                                indices
                                    .iter()
                                    .filter_map(|i| record.get(*i).cloned())
                                    .collect(),
                            )
                        })
                    }))
                } else {
                    Box::new(AggregateStream::new(
                        source.execute(db),
                        indices,
                        aggregates,
                        *group_index,
                    ))
                }
            }
        }
    }
}

// ============================================================
// Nested loop joins
// ============================================================

/// Joins a block of left records against a fresh pass over the right input.
///
/// Output order: per block, per right record, left records in block order.
struct NestedLoopJoin<'a> {
    db: &'a dyn TableAccess,
    left: RecordStream<'a>,
    right_op: &'a QueryOperator,
    left_index: usize,
    right_index: usize,
    block_records: usize,
    block: Vec<Record>,
    right: Option<RecordStream<'a>>,
    current_right: Option<Record>,
    block_pos: usize,
    done: bool,
}

impl<'a> NestedLoopJoin<'a> {
    fn new(
        db: &'a dyn TableAccess,
        left: RecordStream<'a>,
        right_op: &'a QueryOperator,
        left_index: usize,
        right_index: usize,
        block_records: usize,
    ) -> Self {
        Self {
            db,
            left,
            right_op,
            left_index,
            right_index,
            block_records,
            block: Vec::new(),
            right: None,
            current_right: None,
            block_pos: 0,
            done: false,
        }
    }

    fn fail(&mut self, err: ExecutorError) -> Option<ExecutorResult<Record>> {
        self.done = true;
        self.right = None;
        self.current_right = None;
        self.block.clear();
        Some(Err(err))
    }
}

impl Iterator for NestedLoopJoin<'_> {
    type Item = ExecutorResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(right) = &self.current_right {
                while self.block_pos < self.block.len() {
                    let left = &self.block[self.block_pos];
                    self.block_pos += 1;
                    if PredicateFilter::join_matches(left, self.left_index, right, self.right_index) {
                        return Some(Ok(left.concat(right)));
                    }
                }
                self.current_right = None;
            }

            if let Some(right) = self.right.as_mut() {
                match right.next() {
                    Some(Ok(record)) => {
                        self.current_right = Some(record);
                        self.block_pos = 0;
                        continue;
                    }
                    Some(Err(e)) => return self.fail(e),
                    None => self.right = None,
                }
            }

            if self.done {
                return None;
            }

            self.block.clear();
            while self.block.len() < self.block_records {
                match self.left.next() {
                    Some(Ok(record)) => self.block.push(record),
                    Some(Err(e)) => return self.fail(e),
                    None => break,
                }
            }
            if self.block.is_empty() {
                self.done = true;
                return None;
            }
            self.right = Some(self.right_op.execute(self.db));
        }
    }
}

// ============================================================
// Grace hash join
// ============================================================

fn partition_of(key: &IndexKey, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % partitions as u64) as usize
}

/// Partitioned inputs and probe progress
struct Partitions {
    left: Vec<Vec<Record>>,
    right: Vec<Vec<Record>>,
    partition: usize,
    table: HashMap<IndexKey, Vec<Record>>,
    probe: usize,
    pending: VecDeque<Record>,
}

/// Partitions both inputs on the first pull, then builds and probes one
/// partition pair at a time.
struct GraceHashJoin<'a> {
    inputs: Option<(RecordStream<'a>, RecordStream<'a>)>,
    left_index: usize,
    right_index: usize,
    partitions: usize,
    state: Option<Partitions>,
}

impl<'a> GraceHashJoin<'a> {
    fn new(
        left: RecordStream<'a>,
        right: RecordStream<'a>,
        left_index: usize,
        right_index: usize,
        partitions: usize,
    ) -> Self {
        Self {
            inputs: Some((left, right)),
            left_index,
            right_index,
            partitions,
            state: None,
        }
    }

    fn split(
        stream: RecordStream<'a>,
        index: usize,
        partitions: usize,
    ) -> ExecutorResult<Vec<Vec<Record>>> {
        let mut buckets = vec![Vec::new(); partitions];
        for item in stream {
            let record = item?;
            if let Some(value) = record.get(index) {
                let bucket = partition_of(&IndexKey::join_key(value), partitions);
                buckets[bucket].push(record);
            }
        }
        Ok(buckets)
    }

    fn partition_inputs(&mut self) -> ExecutorResult<()> {
        if let Some((left, right)) = self.inputs.take() {
            let left = Self::split(left, self.left_index, self.partitions)?;
            let right = Self::split(right, self.right_index, self.partitions)?;
            self.state = Some(Partitions {
                left,
                right,
                partition: 0,
                table: HashMap::new(),
                probe: 0,
                pending: VecDeque::new(),
            });
        }
        Ok(())
    }
}

impl Iterator for GraceHashJoin<'_> {
    type Item = ExecutorResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Err(e) = self.partition_inputs() {
            return Some(Err(e));
        }
        let (left_index, right_index) = (self.left_index, self.right_index);
        let state = self.state.as_mut()?;

        loop {
            if let Some(record) = state.pending.pop_front() {
                return Some(Ok(record));
            }

            if state.partition >= state.left.len() {
                return None;
            }

            if state.probe == 0 && state.table.is_empty() {
                for record in std::mem::take(&mut state.left[state.partition]) {
                    if let Some(value) = record.get(left_index) {
                        state
                            .table
                            .entry(IndexKey::join_key(value))
                            .or_default()
                            .push(record);
                    }
                }
            }

            let probes = &state.right[state.partition];
            if state.probe < probes.len() {
                let right = &probes[state.probe];
                state.probe += 1;
                if let Some(matches) = right.get(right_index).and_then(|v| state.table.get(&IndexKey::join_key(v))) {
                    state
                        .pending
                        .extend(matches.iter().map(|left| left.concat(right)));
                }
                continue;
            }

            state.right[state.partition].clear();
            state.table.clear();
            state.probe = 0;
            state.partition += 1;
        }
    }
}

// ============================================================
// Group by
// ============================================================

/// Emits input records grouped by one column, groups in ascending key
/// order, records within a group in input order.
struct GroupedStream<'a> {
    source: Option<RecordStream<'a>>,
    index: usize,
    grouped: std::vec::IntoIter<Record>,
}

impl<'a> GroupedStream<'a> {
    fn new(source: RecordStream<'a>, index: usize) -> Self {
        Self {
            source: Some(source),
            index,
            grouped: Vec::new().into_iter(),
        }
    }

    fn group(source: RecordStream<'a>, index: usize) -> ExecutorResult<Vec<Record>> {
        let mut groups: BTreeMap<Option<IndexKey>, Vec<Record>> = BTreeMap::new();
        for item in source {
            let record = item?;
            let key = record.get(index).map(IndexKey::from_value);
            groups.entry(key).or_default().push(record);
        }
        Ok(groups.into_values().flatten().collect())
    }
}

impl Iterator for GroupedStream<'_> {
    type Item = ExecutorResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(source) = self.source.take() {
            match Self::group(source, self.index) {
                Ok(records) => self.grouped = records.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
        self.grouped.next().map(Ok)
    }
}

// ============================================================
// Aggregation
// ============================================================

/// Running totals for one group
struct Accumulator {
    key: Option<IndexKey>,
    count: u64,
    int_sum: i32,
    float_sum: f64,
    average_sum: f64,
    last: Record,
}

/// Folds each run of equal group keys (or the whole input when
/// ungrouped) into one output record.
struct AggregateStream<'a> {
    source: RecordStream<'a>,
    indices: &'a [usize],
    aggregates: &'a Aggregates,
    group_index: Option<usize>,
    lookahead: Option<Record>,
    current: Option<Accumulator>,
    done: bool,
}

impl<'a> AggregateStream<'a> {
    fn new(
        source: RecordStream<'a>,
        indices: &'a [usize],
        aggregates: &'a Aggregates,
        group_index: Option<usize>,
    ) -> Self {
        Self {
            source,
            indices,
            aggregates,
            group_index,
            lookahead: None,
            current: None,
            done: false,
        }
    }

    fn key_of(&self, record: &Record) -> Option<IndexKey> {
        self.group_index
            .and_then(|i| record.get(i))
            .map(IndexKey::from_value)
    }

    fn accumulate(&self, acc: &mut Accumulator, record: Record) -> ExecutorResult<()> {
        acc.count += 1;

        if let Some(sum) = &self.aggregates.sum {
            match record.get(sum.index) {
                Some(Value::Int(v)) => {
                    acc.int_sum = acc
                        .int_sum
                        .checked_add(*v)
                        .ok_or_else(|| ExecutorError::aggregate_overflow(SUM_COLUMN))?;
                }
                Some(Value::Float(v)) => acc.float_sum += f64::from(*v),
                _ => {}
            }
        }

        if let Some(average) = &self.aggregates.average {
            if let Some(v) = record.get(average.index).and_then(Value::as_f64) {
                acc.average_sum += v;
            }
        }

        acc.last = record;
        Ok(())
    }

    fn finish(&self, acc: Accumulator) -> ExecutorResult<Record> {
        let mut values: Vec<Value> = self
            .indices
            .iter()
            .filter_map(|i| acc.last.get(*i).cloned())
            .collect();

        if self.aggregates.count {
            let count = i32::try_from(acc.count)
                .map_err(|_| ExecutorError::aggregate_overflow(COUNT_COLUMN))?;
            values.push(Value::Int(count));
        }
        if let Some(sum) = &self.aggregates.sum {
            values.push(match sum.data_type {
                DataType::Int => Value::Int(acc.int_sum),
                _ => Value::Float(acc.float_sum as f32),
            });
        }
        if self.aggregates.average.is_some() {
            let average = acc.average_sum / acc.count as f64;
            if !average.is_finite() {
                return Err(ExecutorError::aggregate_overflow(AVERAGE_COLUMN));
            }
            values.push(Value::Float(average as f32));
        }

        Ok(Record::new(values))
    }
}

impl Iterator for AggregateStream<'_> {
    type Item = ExecutorResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let item = match self.lookahead.take() {
                Some(record) => Some(Ok(record)),
                None => self.source.next(),
            };

            match item {
                Some(Ok(record)) => {
                    let key = self.key_of(&record);
                    if let Some(acc) = &self.current {
                        if acc.key != key {
                            self.lookahead = Some(record);
                            let finished = self.current.take()?;
                            return Some(self.finish(finished));
                        }
                    }

                    let mut acc = self.current.take().unwrap_or_else(|| Accumulator {
                        key,
                        count: 0,
                        int_sum: 0,
                        float_sum: 0.0,
                        average_sum: 0.0,
                        last: Record::new(Vec::new()),
                    });
                    if let Err(e) = self.accumulate(&mut acc, record) {
                        self.done = true;
                        return Some(Err(e));
                    }
                    self.current = Some(acc);
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    let finished = self.current.take()?;
                    return Some(self.finish(finished));
                }
            }
        }
    }
}
