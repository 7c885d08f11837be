// Redo-log replication: translation of captured row changes into idempotent
// target statements, batched full-load writes and ordered apply with checkpoints.

mod error;

pub mod apply;
pub mod batch;
pub mod checkpoint;
pub mod config;
pub mod executor;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod sql_utils;
pub mod translator;

pub use apply::{apply_tasks, replicate, ApplySummary};
pub use batch::{plan_table_batches, write_table_rows, BatchPlan, BulkWriteSummary, PreparedBatch};
pub use checkpoint::{CheckpointStore, MemoryCheckpointStore, SqliteCheckpointStore};
pub use config::ReplicationConfig;
pub use error::{ParseError, ReplicationError, Result, TranslateError};
pub use executor::{MySqlExecutor, SqliteExecutor, StatementExecutor};
pub use models::{CheckpointKey, IncrTask, LogRecord, MigrateOperation, OperationType, RowImage};
pub use pipeline::run_incremental;
pub use sql_utils::build_table_prepare_stmt;
pub use translator::{translate_redo, Translation};
