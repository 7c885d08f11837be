use crate::checkpoint::CheckpointStore;
use crate::config::ReplicationConfig;
use crate::error::{ReplicationError, Result};
use crate::executor::StatementExecutor;
use crate::models::{IncrTask, LogRecord};
use crate::pipeline::run_incremental;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

const WORKER_QUEUE_SIZE: usize = 64;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApplySummary {
    pub run_id: String,
    pub applied_tasks: usize,
    pub applied_statements: usize,
    pub last_scn: Option<u64>,
}

#[derive(Debug, Default)]
struct WorkerStats {
    tasks: usize,
    statements: usize,
    last_scn: Option<u64>,
}

/// Shared between the router and its workers: set once, first error wins.
#[derive(Default)]
struct FailureState {
    failed: AtomicBool,
    first_error: Mutex<Option<ReplicationError>>,
}

impl FailureState {
    async fn record(&self, error: ReplicationError) {
        self.failed.store(true, Ordering::SeqCst);
        let mut slot = self.first_error.lock().await;
        if slot.is_none() {
            *slot = Some(error);
        }
    }

    fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

/// Applies every task from `receiver` until the channel closes.
///
/// Tasks are routed by target table onto `apply_threads` workers, so tasks of
/// one table keep their arrival order. A task's checkpoint is saved only after
/// all of its statements committed.
pub async fn apply_tasks<E, S>(
    mut receiver: mpsc::Receiver<IncrTask>,
    executor: Arc<E>,
    checkpoints: Arc<S>,
    apply_threads: usize,
) -> Result<ApplySummary>
where
    E: StatementExecutor + ?Sized + 'static,
    S: CheckpointStore + ?Sized + 'static,
{
    if apply_threads == 0 {
        return Err(ReplicationError::Config(
            "applyThreads must be greater than zero".to_string(),
        ));
    }

    let run_id = Uuid::new_v4().to_string();
    let started_at = Instant::now();
    log::info!(
        "Apply run {} started with {} worker(s)",
        run_id,
        apply_threads
    );

    let failure = Arc::new(FailureState::default());
    let mut senders = Vec::with_capacity(apply_threads);
    let mut handles: Vec<JoinHandle<WorkerStats>> = Vec::with_capacity(apply_threads);
    for worker_id in 0..apply_threads {
        let (sender, worker_receiver) = mpsc::channel(WORKER_QUEUE_SIZE);
        senders.push(sender);
        handles.push(tokio::spawn(run_worker(
            worker_id,
            worker_receiver,
            executor.clone(),
            checkpoints.clone(),
            failure.clone(),
        )));
    }

    while let Some(task) = receiver.recv().await {
        if failure.is_failed() {
            log::warn!(
                "Apply run {} stopped routing at scn {} after a worker failure",
                run_id,
                task.scn
            );
            break;
        }
        let worker_id = worker_index(&task.target_table_key(), apply_threads);
        if senders[worker_id].send(task).await.is_err() {
            // The worker only hangs up after recording its failure.
            break;
        }
    }
    drop(receiver);
    drop(senders);

    let mut summary = ApplySummary {
        run_id,
        applied_tasks: 0,
        applied_statements: 0,
        last_scn: None,
    };
    for (worker_id, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(stats) => {
                summary.applied_tasks += stats.tasks;
                summary.applied_statements += stats.statements;
                summary.last_scn = summary.last_scn.max(stats.last_scn);
            }
            Err(e) => {
                failure
                    .record(ReplicationError::Worker(format!(
                        "Apply worker {} panicked: {}",
                        worker_id, e
                    )))
                    .await;
            }
        }
    }

    if let Some(error) = failure.first_error.lock().await.take() {
        log::error!(
            "Apply run {} failed after {} task(s): {}",
            summary.run_id,
            summary.applied_tasks,
            error
        );
        return Err(error);
    }

    log::info!(
        "Apply run {} finished (tasks={}, statements={}, lastScn={:?}, cost={:?})",
        summary.run_id,
        summary.applied_tasks,
        summary.applied_statements,
        summary.last_scn,
        started_at.elapsed()
    );
    Ok(summary)
}

async fn run_worker<E, S>(
    worker_id: usize,
    mut tasks: mpsc::Receiver<IncrTask>,
    executor: Arc<E>,
    checkpoints: Arc<S>,
    failure: Arc<FailureState>,
) -> WorkerStats
where
    E: StatementExecutor + ?Sized,
    S: CheckpointStore + ?Sized,
{
    let mut stats = WorkerStats::default();
    while let Some(task) = tasks.recv().await {
        if let Err(error) = apply_task(executor.as_ref(), checkpoints.as_ref(), &task).await {
            log::error!("Apply worker {} failed at scn {}: {}", worker_id, task.scn, error);
            failure.record(error).await;
            break;
        }
        stats.tasks += 1;
        stats.statements += task.target_sql.len();
        stats.last_scn = stats.last_scn.max(Some(task.scn));
    }
    stats
}

async fn apply_task<E, S>(executor: &E, checkpoints: &S, task: &IncrTask) -> Result<()>
where
    E: StatementExecutor + ?Sized,
    S: CheckpointStore + ?Sized,
{
    executor
        .execute_statements(&task.target_sql)
        .await
        .map_err(|message| ReplicationError::Apply {
            scn: task.scn,
            message,
        })?;

    let key = task.checkpoint_key();
    checkpoints.save(&key, task.scn).await.map_err(|e| {
        ReplicationError::Checkpoint(format!(
            "Failed to save checkpoint for {}.{} at scn {}: {}",
            key.source_schema, key.source_table, task.scn, e
        ))
    })?;

    log::debug!(
        "Checkpoint advanced (table={}.{}, scn={}, op={})",
        key.source_schema,
        key.source_table,
        task.scn,
        task.operation_type.as_str()
    );
    Ok(())
}

fn worker_index(table_key: &str, apply_threads: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    table_key.hash(&mut hasher);
    (hasher.finish() % apply_threads as u64) as usize
}

/// Runs the incremental pipeline and the apply workers against each other
/// over a queue of `taskQueueSize` tasks.
pub async fn replicate<I, E, S>(
    records: I,
    config: &ReplicationConfig,
    executor: Arc<E>,
    checkpoints: Arc<S>,
) -> Result<ApplySummary>
where
    I: IntoIterator<Item = LogRecord> + Send + 'static,
    I::IntoIter: Send,
    E: StatementExecutor + ?Sized + 'static,
    S: CheckpointStore + ?Sized + 'static,
{
    config.validate().map_err(ReplicationError::Config)?;

    let (sender, receiver) = mpsc::channel(config.task_queue_size);
    let producer = tokio::spawn(run_incremental(records, sender));
    let applied = apply_tasks(receiver, executor, checkpoints, config.apply_threads).await;
    let produced = producer
        .await
        .map_err(|e| ReplicationError::Worker(format!("Incremental producer panicked: {}", e)))?;

    match (produced, applied) {
        // The queue only closes early because apply stopped.
        (Err(ReplicationError::QueueClosed), Err(apply_error)) => Err(apply_error),
        (Err(producer_error), _) => Err(producer_error),
        (Ok(_), applied) => applied,
    }
}
