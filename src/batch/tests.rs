use super::*;
use crate::executor::SqliteExecutor;
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};

fn columns(count: usize) -> Vec<String> {
    (0..count).map(|index| format!("C{}", index + 1)).collect()
}

fn numbered_values(count: usize) -> Vec<Value> {
    (0..count).map(|index| json!(index)).collect()
}

fn tuple_count(sql: &str, column_count: usize) -> usize {
    let tuple = format!("({})", vec!["?"; column_count].join(","));
    sql.matches(&tuple).count()
}

#[test]
fn test_plan_with_remainder() {
    // 45 values, 3 columns => 15 rows; batches of 4 rows.
    let plan = plan_table_batches("S", "T", &columns(3), numbered_values(45), 4, true);

    let full = plan.full.as_ref().unwrap();
    assert_eq!(full.arg_groups.len(), 3);
    assert!(full.arg_groups.iter().all(|group| group.len() == 12));
    assert_eq!(full.rows_per_group, 4);
    assert_eq!(
        full.sql,
        "REPLACE INTO S.T (C1,C2,C3) VALUES (?,?,?),(?,?,?),(?,?,?),(?,?,?)"
    );

    let remainder = plan.remainder.as_ref().unwrap();
    assert_eq!(remainder.arg_groups.len(), 1);
    assert_eq!(remainder.arg_groups[0].len(), 9);
    assert_eq!(remainder.rows_per_group, 3);
    assert_eq!(tuple_count(&remainder.sql, 3), 3);
    assert_eq!(plan.group_count(), 4);
}

#[test]
fn test_plan_without_remainder() {
    // 36 values, 3 columns => 12 rows; capacity of one batch is 12 values.
    let plan = plan_table_batches("S", "T", &columns(3), numbered_values(36), 4, true);

    let full = plan.full.as_ref().unwrap();
    assert_eq!(full.arg_groups.len(), 3);
    assert!(plan.remainder.is_none());

    let single = plan_table_batches("S", "T", &columns(3), numbered_values(12), 4, true);
    let full = single.full.as_ref().unwrap();
    assert_eq!(full.arg_groups.len(), 1);
    assert_eq!(full.arg_groups[0].len(), 12);
    assert!(single.remainder.is_none());
}

#[test]
fn test_plan_smaller_than_one_batch_is_all_remainder() {
    let plan = plan_table_batches("S", "T", &columns(2), numbered_values(6), 10, false);

    assert!(plan.full.is_none());
    let remainder = plan.remainder.as_ref().unwrap();
    assert_eq!(remainder.sql, "INSERT INTO S.T (C1,C2) VALUES (?,?),(?,?),(?,?)");
    assert_eq!(remainder.arg_groups, vec![numbered_values(6)]);
}

#[test]
fn test_plan_empty_input() {
    let plan = plan_table_batches("S", "T", &columns(2), Vec::new(), 10, true);
    assert_eq!(plan, BatchPlan::default());
    assert_eq!(plan.group_count(), 0);
}

#[test]
fn test_plan_zero_columns_yields_nothing() {
    let plan = plan_table_batches("S", "T", &[], numbered_values(4), 10, true);
    assert_eq!(plan, BatchPlan::default());
}

#[test]
fn test_plan_groups_partition_values_in_order() {
    for column_count in 1..=4 {
        for rows in 0..=23 {
            for batch_size in 1..=7 {
                let values = numbered_values(rows * column_count);
                let plan = plan_table_batches(
                    "S",
                    "T",
                    &columns(column_count),
                    values.clone(),
                    batch_size,
                    true,
                );

                let rebuilt = plan
                    .batches()
                    .flat_map(|batch| batch.arg_groups.iter().flatten().cloned())
                    .collect::<Vec<Value>>();
                assert_eq!(
                    rebuilt, values,
                    "columns={column_count} rows={rows} batch={batch_size}"
                );

                for batch in plan.batches() {
                    let tuples = tuple_count(&batch.sql, column_count);
                    assert_eq!(tuples, batch.rows_per_group);
                    for group in &batch.arg_groups {
                        assert_eq!(tuples * column_count, group.len());
                    }
                }

                if let Some(full) = &plan.full {
                    assert_eq!(full.rows_per_group, batch_size);
                    assert_eq!(full.arg_groups.len(), rows / batch_size);
                }
                assert_eq!(plan.remainder.is_some(), rows % batch_size != 0);
            }
        }
    }
}

async fn target_pool() -> Pool<Sqlite> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::query("CREATE TABLE T (C1 INTEGER PRIMARY KEY, C2 TEXT, C3 INTEGER)")
        .execute(&pool)
        .await
        .unwrap();
    pool
}

fn table_rows(rows: usize) -> Vec<Value> {
    (0..rows)
        .flat_map(|id| vec![json!(id), json!(format!("row-{}", id)), json!(id * 10)])
        .collect()
}

async fn count_rows(pool: &Pool<Sqlite>) -> i64 {
    sqlx::query("SELECT COUNT(*) AS n FROM T")
        .fetch_one(pool)
        .await
        .unwrap()
        .get::<i64, _>("n")
}

#[tokio::test]
async fn test_write_table_rows_into_sqlite() {
    let pool = target_pool().await;
    let executor = SqliteExecutor::new(pool.clone());
    let config = ReplicationConfig {
        insert_batch_size: 4,
        ..ReplicationConfig::default()
    };

    let summary = write_table_rows(&executor, "main", "T", &columns(3), table_rows(10), &config)
        .await
        .unwrap();

    assert_eq!(summary.rows, 10);
    assert_eq!(summary.statements, 3);
    assert_eq!(summary.target_table, "main.T");
    assert_eq!(count_rows(&pool).await, 10);
}

#[tokio::test]
async fn test_safe_mode_tolerates_rerun() {
    let pool = target_pool().await;
    let executor = SqliteExecutor::new(pool.clone());
    let config = ReplicationConfig {
        insert_batch_size: 3,
        safe_mode: true,
        ..ReplicationConfig::default()
    };

    write_table_rows(&executor, "main", "T", &columns(3), table_rows(7), &config)
        .await
        .unwrap();
    write_table_rows(&executor, "main", "T", &columns(3), table_rows(7), &config)
        .await
        .unwrap();

    assert_eq!(count_rows(&pool).await, 7);
}

#[tokio::test]
async fn test_plain_insert_rerun_fails_on_duplicates() {
    let pool = target_pool().await;
    let executor = SqliteExecutor::new(pool.clone());
    let config = ReplicationConfig {
        insert_batch_size: 5,
        safe_mode: false,
        ..ReplicationConfig::default()
    };

    write_table_rows(&executor, "main", "T", &columns(3), table_rows(5), &config)
        .await
        .unwrap();
    let err = write_table_rows(&executor, "main", "T", &columns(3), table_rows(5), &config)
        .await
        .unwrap_err();

    assert!(matches!(err, ReplicationError::BulkWrite { .. }), "got: {err:?}");
}

#[tokio::test]
async fn test_write_table_rows_rejects_invalid_config() {
    let pool = target_pool().await;
    let executor = SqliteExecutor::new(pool);
    let config = ReplicationConfig {
        insert_batch_size: 0,
        ..ReplicationConfig::default()
    };

    let err = write_table_rows(&executor, "main", "T", &columns(3), table_rows(1), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, ReplicationError::Config(_)));
}
