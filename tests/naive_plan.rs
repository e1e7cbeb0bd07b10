//! Naive Plan Tests
//!
//! Tests for the declaration-ordered fallback:
//! - Page nested loops in join order, selects above the joins
//! - Epilogue applied unchanged
//! - Same results as the optimal plan

use plinthdb::catalog::Database;
use plinthdb::planner::{PlannerErrorCode, PredicateOperator};
use plinthdb::schema::{DataType, TableSchema, Value};
use rand::Rng;

const TABLE: &str = "testAllTypes";

// =============================================================================
// Helper Functions
// =============================================================================

fn all_types() -> TableSchema {
    TableSchema::new()
        .with_column("bool", DataType::Bool)
        .with_column("int", DataType::Int)
        .with_column("string", DataType::String(5))
        .with_column("float", DataType::Float)
}

fn random_table(db: &mut Database, name: &str, rows: i32, key_range: i32) {
    db.create_table(all_types(), name).unwrap();
    let mut rng = rand::thread_rng();
    for _ in 0..rows {
        let string: String = (0..5)
            .map(|_| char::from(b'a' + rng.gen_range(0..26u8)))
            .collect();
        db.add_record(
            name,
            vec![
                Value::Bool(rng.gen_bool(0.5)),
                Value::Int(rng.gen_range(0..key_range)),
                Value::string(string),
                Value::Float(rng.gen::<f32>()),
            ],
        )
        .unwrap();
    }
}

fn sorted_rows(rows: Vec<Vec<Value>>) -> Vec<String> {
    let mut rendered: Vec<String> = rows
        .into_iter()
        .map(|r| {
            r.iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("|")
        })
        .collect();
    rendered.sort();
    rendered
}

// =============================================================================
// Rendering
// =============================================================================

/// Group-by over a predicate that matches nothing streams nothing.
#[test]
fn test_group_by_over_empty_selection() {
    let mut db = Database::default();
    random_table(&mut db, TABLE, 100, 1000);

    let mut query = db.query(TABLE);
    query.group_by("string");
    query.select("string", PredicateOperator::Equals, "");

    assert_eq!(query.execute().unwrap().count(), 0);
    assert_eq!(
        query.final_operator().unwrap().to_string(),
        "type: GROUPBY\n\
         column: testAllTypes.string\n\
         \ttype: SELECT\n\
         \tcolumn: testAllTypes.string\n\
         \toperator: EQUALS\n\
         \tvalue: \n\
         \t\ttype: SEQSCAN\n\
         \t\ttable: testAllTypes"
    );
}

/// Joins nest left-deep in declaration order with selects above them.
#[test]
fn test_naive_join_shape() {
    let mut db = Database::default();
    random_table(&mut db, "a", 20, 5);
    random_table(&mut db, "b", 20, 5);
    random_table(&mut db, "c", 20, 5);

    let mut query = db.query("a");
    query.join("b", "a.int", "b.int");
    query.join("c", "c.int", "b.int");
    query.select("a.bool", PredicateOperator::Equals, true);

    let rendered = query.plan_naive().unwrap().to_string();
    let expected = "type: SELECT\n\
                    column: a.bool\n\
                    operator: EQUALS\n\
                    value: true\n\
                    \ttype: PNLJ\n\
                    \tleftColumn: b.int\n\
                    \trightColumn: c.int\n\
                    \t\ttype: PNLJ\n\
                    \t\tleftColumn: a.int\n\
                    \t\trightColumn: b.int\n\
                    \t\t\ttype: SEQSCAN\n\
                    \t\t\ttable: a\n\
                    \t\t\ttype: SEQSCAN\n\
                    \t\t\ttable: b\n\
                    \t\ttype: SEQSCAN\n\
                    \t\ttable: c";
    assert_eq!(rendered, expected);
}

/// The naive routine never takes the index fast path.
#[test]
fn test_naive_ignores_indexes() {
    let mut db = Database::default();
    random_table(&mut db, TABLE, 500, 50);
    db.create_index(TABLE, "int").unwrap();

    let mut query = db.query(TABLE);
    query.select("int", PredicateOperator::Equals, 7);
    let rendered = query.plan_naive().unwrap().to_string();
    assert!(!rendered.contains("INDEXSCAN"));
    assert!(query.plan_optimal().unwrap().to_string().contains("INDEXSCAN"));
}

// =============================================================================
// Results
// =============================================================================

/// Naive and optimal plans return the same records.
#[test]
fn test_naive_matches_optimal() {
    let mut db = Database::default();
    random_table(&mut db, "a", 300, 40);
    random_table(&mut db, "b", 200, 40);
    db.create_index("b", "int").unwrap();

    let mut query = db.query("a");
    query.join("b", "a.int", "b.int");
    query.select("a.int", PredicateOperator::LessThan, 20);
    query.select("b.bool", PredicateOperator::Equals, true);

    let naive: Vec<Vec<Value>> = query
        .execute()
        .unwrap()
        .map(|r| r.unwrap().into_values())
        .collect();
    let optimal: Vec<Vec<Value>> = query
        .execute_optimal()
        .unwrap()
        .map(|r| r.unwrap().into_values())
        .collect();

    assert_eq!(sorted_rows(naive), sorted_rows(optimal));
}

/// Tables sharing a column name answer the same through both routines.
#[test]
fn test_shared_column_name_same_rows() {
    let mut db = Database::default();
    for name in ["a", "b"] {
        let schema = TableSchema::new()
            .with_column("id", DataType::Int)
            .with_column("v", DataType::Int);
        db.create_table(schema, name).unwrap();
    }
    for i in 0..10 {
        db.add_record("a", vec![Value::Int(i), Value::Int(1)]).unwrap();
        db.add_record("b", vec![Value::Int(i), Value::Int(i % 2)]).unwrap();
    }

    let mut query = db.query("a");
    query.join("b", "a.id", "b.id");
    query.select("v", PredicateOperator::Equals, 1);
    assert_eq!(
        query.execute().err().map(|e| e.code()),
        Some(PlannerErrorCode::PlinthPlanAmbiguousColumn)
    );
    assert_eq!(
        query.execute_optimal().err().map(|e| e.code()),
        Some(PlannerErrorCode::PlinthPlanAmbiguousColumn)
    );

    for (column, expected) in [("a.v", 10), ("b.v", 5)] {
        let mut query = db.query("a");
        query.join("b", "a.id", "b.id");
        query.select(column, PredicateOperator::Equals, 1);

        let naive: Vec<Vec<Value>> = query
            .execute()
            .unwrap()
            .map(|r| r.unwrap().into_values())
            .collect();
        let optimal: Vec<Vec<Value>> = query
            .execute_optimal()
            .unwrap()
            .map(|r| r.unwrap().into_values())
            .collect();
        assert_eq!(naive.len(), expected);
        assert_eq!(sorted_rows(naive), sorted_rows(optimal));
    }
}

/// Projections of several columns work for every record.
#[test]
fn test_multiple_column_projection() {
    let mut db = Database::default();
    random_table(&mut db, TABLE, 50, 10);

    let mut query = db.query(TABLE);
    query.project(&["float", "bool", "int"]).unwrap();
    for record in query.execute().unwrap() {
        let values = record.unwrap().into_values();
        assert_eq!(values.len(), 3);
        assert!(matches!(values[0], Value::Float(_)));
        assert!(matches!(values[1], Value::Bool(_)));
        assert!(matches!(values[2], Value::Int(_)));
    }
}

// =============================================================================
// Builder Errors
// =============================================================================

/// Projection may be set once and never empty.
#[test]
fn test_projection_errors() {
    let mut db = Database::default();
    random_table(&mut db, TABLE, 1, 1);

    let mut query = db.query(TABLE);
    assert_eq!(
        query.project(&[]).unwrap_err().code(),
        PlannerErrorCode::PlinthPlanEmptyProjection
    );
    query.project(&["int"]).unwrap();
    assert_eq!(
        query.project(&["bool"]).unwrap_err().code(),
        PlannerErrorCode::PlinthPlanMultipleProjections
    );
}

/// Group-by is last-call-wins.
#[test]
fn test_group_by_overwrites() {
    let mut db = Database::default();
    random_table(&mut db, TABLE, 10, 3);

    let mut query = db.query(TABLE);
    query.group_by("string");
    query.group_by("int");
    let rendered = query.plan_naive().unwrap().to_string();
    assert!(rendered.starts_with("type: GROUPBY\ncolumn: testAllTypes.int\n"));
}
