//! Group-by, projection and aggregation stage
//!
//! Everything applied on top of the finished access and join tree is
//! described by one [`Epilogue`], validated once when it is built.

use crate::config::EngineConfig;
use crate::executor::QueryOperator;
use crate::schema::ColumnRef;

use super::ast::AggregateRequest;
use super::errors::{PlannerError, PlannerResult};

/// Work done after access path and join selection
#[derive(Debug, Clone, PartialEq)]
pub enum Epilogue {
    /// The join tree is the final plan
    None,
    /// Project and/or aggregate the whole input
    Project {
        columns: Vec<String>,
        aggregates: AggregateRequest,
    },
    /// Group on `column`, then optionally project and/or aggregate per group
    GroupBy {
        column: ColumnRef,
        columns: Vec<String>,
        aggregates: AggregateRequest,
    },
}

/// Returns true if `a` and `b` can name the same column
fn same_column(a: &ColumnRef, b: &ColumnRef) -> bool {
    a.column == b.column
        && match (&a.table, &b.table) {
            (Some(x), Some(y)) => x == y,
            _ => true,
        }
}

impl Epilogue {
    /// Build the epilogue for a query.
    ///
    /// With a group-by, a projection may hold the group-by column alone, or
    /// the group-by column and one requested aggregate result.
    pub fn new(
        group_by: Option<&ColumnRef>,
        projection: Option<&[String]>,
        aggregates: &AggregateRequest,
    ) -> PlannerResult<Self> {
        let columns = projection.map(<[String]>::to_vec).unwrap_or_default();

        let group = match group_by {
            Some(group) => group,
            None if columns.is_empty() && aggregates.is_empty() => return Ok(Epilogue::None),
            None => {
                return Ok(Epilogue::Project {
                    columns,
                    aggregates: aggregates.clone(),
                })
            }
        };

        let is_group = |c: &String| same_column(&ColumnRef::parse(c), group);
        match columns.as_slice() {
            [] => {}
            [only] if is_group(only) => {}
            [only] => {
                return Err(PlannerError::projection_conflict(format!(
                    "Projected column '{}' is not the group-by column '{}'",
                    only, group
                )))
            }
            [first, second] => {
                let valid = (is_group(first) && aggregates.produces(second))
                    || (is_group(second) && aggregates.produces(first));
                if !valid {
                    return Err(PlannerError::projection_conflict(format!(
                        "Projection [{}, {}] must be the group-by column '{}' and a requested aggregate",
                        first, second, group
                    )));
                }
            }
            _ => {
                return Err(PlannerError::projection_conflict(format!(
                    "Projection alongside a group-by holds at most 2 columns, got {}",
                    columns.len()
                )))
            }
        }

        Ok(Epilogue::GroupBy {
            column: group.clone(),
            columns,
            aggregates: aggregates.clone(),
        })
    }

    /// Apply this epilogue on top of `source`
    pub fn apply(&self, config: &EngineConfig, source: QueryOperator) -> PlannerResult<QueryOperator> {
        match self {
            Epilogue::None => Ok(source),
            Epilogue::Project {
                columns,
                aggregates,
            } => QueryOperator::project(config, source, columns, aggregates, None),
            Epilogue::GroupBy {
                column,
                columns,
                aggregates,
            } => {
                let grouped = QueryOperator::group_by(source, column)?;
                if columns.is_empty() && aggregates.is_empty() {
                    return Ok(grouped);
                }
                QueryOperator::project(config, grouped, columns, aggregates, Some(column))
            }
        }
    }

    pub fn has_group_by(&self) -> bool {
        matches!(self, Epilogue::GroupBy { .. })
    }
}
