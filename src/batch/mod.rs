use crate::config::ReplicationConfig;
use crate::error::{ReplicationError, Result};
use crate::executor::StatementExecutor;
use crate::sql_utils::{build_bind_var_groups, build_insert_prefix, qualified_table_name};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

/// One prepared statement text shared by every argument group it is run with.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBatch {
    pub sql: String,
    pub arg_groups: Vec<Vec<Value>>,
    pub rows_per_group: usize,
}

/// Full-size batches plus at most one smaller remainder batch. Together the
/// argument groups partition the planned values in their original order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchPlan {
    pub full: Option<PreparedBatch>,
    pub remainder: Option<PreparedBatch>,
}

impl BatchPlan {
    pub fn group_count(&self) -> usize {
        self.batches().map(|batch| batch.arg_groups.len()).sum()
    }

    pub fn batches(&self) -> impl Iterator<Item = &PreparedBatch> {
        self.full.iter().chain(self.remainder.iter())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BulkWriteSummary {
    pub target_table: String,
    pub rows: usize,
    pub statements: usize,
    pub affected_rows: u64,
}

/// Splits a flat row-major value list into multi-row prepared statements of
/// `insert_batch_size` rows each, with the leftover rows in a remainder batch.
///
/// `values.len()` must be a multiple of `column_fields.len()`; the extractor
/// always delivers whole rows.
pub fn plan_table_batches(
    target_schema: &str,
    target_table: &str,
    column_fields: &[String],
    values: Vec<Value>,
    insert_batch_size: usize,
    safe_mode: bool,
) -> BatchPlan {
    let started_at = Instant::now();
    let column_count = column_fields.len();
    let total_binds = values.len();

    if column_count == 0 || insert_batch_size == 0 {
        log::warn!(
            "Skipping batch plan for {}: {} columns, insert batch size {}",
            qualified_table_name(target_schema, target_table),
            column_count,
            insert_batch_size
        );
        return BatchPlan::default();
    }
    if total_binds % column_count != 0 {
        log::warn!(
            "Batch plan for {} received {} values for {} columns; trailing values do not form a row",
            qualified_table_name(target_schema, target_table),
            total_binds,
            column_count
        );
    }

    let plan_capacity = insert_batch_size.saturating_mul(column_count);
    let split_count = total_binds / plan_capacity;
    let plan_integer_binds = split_count * plan_capacity;
    let difference_binds = total_binds - plan_integer_binds;
    let prefix = build_insert_prefix(target_schema, target_table, column_fields, safe_mode);

    let mut values = values.into_iter();
    let mut plan = BatchPlan::default();

    if split_count > 0 {
        let arg_groups = (0..split_count)
            .map(|_| values.by_ref().take(plan_capacity).collect::<Vec<Value>>())
            .collect::<Vec<_>>();
        plan.full = Some(PreparedBatch {
            sql: format!("{}{}", prefix, build_bind_var_groups(column_count, insert_batch_size)),
            arg_groups,
            rows_per_group: insert_batch_size,
        });
    }

    if difference_binds > 0 {
        let remainder_rows = difference_binds / column_count;
        plan.remainder = Some(PreparedBatch {
            sql: format!("{}{}", prefix, build_bind_var_groups(column_count, remainder_rows)),
            arg_groups: vec![values.collect()],
            rows_per_group: remainder_rows,
        });
    }

    log::info!(
        "Planned table data batches (table={}, rows={}, insertBatchSize={}, statements={}, safeMode={}, cost={:?})",
        qualified_table_name(target_schema, target_table),
        total_binds / column_count,
        insert_batch_size,
        plan.group_count(),
        safe_mode,
        started_at.elapsed()
    );

    plan
}

/// Plans `values` and writes every argument group through `executor`, full
/// batches first.
pub async fn write_table_rows<E>(
    executor: &E,
    target_schema: &str,
    target_table: &str,
    column_fields: &[String],
    values: Vec<Value>,
    config: &ReplicationConfig,
) -> Result<BulkWriteSummary>
where
    E: StatementExecutor + ?Sized,
{
    config.validate().map_err(ReplicationError::Config)?;

    let started_at = Instant::now();
    let table_ref = qualified_table_name(target_schema, target_table);
    if column_fields.is_empty() {
        return Err(ReplicationError::BulkWrite {
            table: table_ref,
            message: "no target columns".to_string(),
        });
    }

    let rows = values.len() / column_fields.len();
    let plan = plan_table_batches(
        target_schema,
        target_table,
        column_fields,
        values,
        config.insert_batch_size,
        config.safe_mode,
    );

    let mut statements = 0usize;
    let mut affected_rows = 0u64;
    for batch in plan.batches() {
        for args in &batch.arg_groups {
            let affected = executor
                .execute_prepared(&batch.sql, args)
                .await
                .map_err(|message| ReplicationError::BulkWrite {
                    table: table_ref.clone(),
                    message,
                })?;
            statements += 1;
            affected_rows = affected_rows.saturating_add(affected);
        }
    }

    log::info!(
        "Bulk write finished (table={}, rows={}, statements={}, cost={:?})",
        table_ref,
        rows,
        statements,
        started_at.elapsed()
    );

    Ok(BulkWriteSummary {
        target_table: table_ref,
        rows,
        statements,
        affected_rows,
    })
}

#[cfg(test)]
mod tests;
