use crate::error::{ReplicationError, Result};
use crate::models::{IncrTask, LogRecord, MigrateOperation};
use crate::sql_utils::{rewrite_schema_qualifier, sanitize_log_sql};
use crate::translator::translate_redo;
use std::time::Instant;
use tokio::sync::mpsc;

/// Translates `records` in the order given and pushes one task per record onto
/// `task_queue`, waiting whenever the queue is full.
///
/// The sender is consumed: the queue is closed when this returns, whether the
/// run finished or stopped at the first bad record. Records are never skipped,
/// since a skipped record would leave the checkpoint ahead of the target.
pub async fn run_incremental<I>(records: I, task_queue: mpsc::Sender<IncrTask>) -> Result<usize>
where
    I: IntoIterator<Item = LogRecord>,
{
    let started_at = Instant::now();
    log::info!("Incremental log translation started");

    let mut dispatched = 0usize;
    for record in records {
        let task = build_task(record)?;
        task_queue
            .send(task)
            .await
            .map_err(|_| ReplicationError::QueueClosed)?;
        dispatched += 1;
    }

    log::info!(
        "Incremental log translation finished (tasks={}, cost={:?})",
        dispatched,
        started_at.elapsed()
    );
    Ok(dispatched)
}

pub fn build_task(record: LogRecord) -> Result<IncrTask> {
    if record.sql_redo.trim().is_empty() {
        return Err(ReplicationError::DataIntegrity {
            scn: record.scn,
            schema: record.source_schema,
            table: record.source_table,
        });
    }

    if record.operation == MigrateOperation::Ddl {
        log::info!(
            "Translating DDL redo (scn={}, table={}.{}): {}",
            record.scn,
            record.source_schema,
            record.source_table,
            record.sql_redo
        );
    }

    let target_schema = record.target_schema.trim().to_uppercase();
    let target_table = record.target_table.trim().to_uppercase();

    let redo = sanitize_log_sql(&record.sql_redo);
    let undo = if record.sql_undo.trim().is_empty() {
        String::new()
    } else {
        rewrite_schema_qualifier(
            &sanitize_log_sql(&record.sql_undo),
            &record.source_schema,
            &target_schema,
        )
    };

    let translation = translate_redo(&redo, &undo, &target_schema, &target_table).map_err(
        |source| ReplicationError::Translate {
            scn: record.scn,
            source,
        },
    )?;

    Ok(IncrTask {
        scn: record.scn,
        operation: record.operation,
        operation_type: translation.operation_type,
        source_schema: record.source_schema,
        source_table: record.source_table,
        target_schema,
        target_table,
        source_redo: redo,
        source_undo: undo,
        target_sql: translation.statements,
    })
}
