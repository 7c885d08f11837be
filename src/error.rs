use crate::models::MigrateOperation;

/// Redo/undo text that does not match a statement shape the log miner emits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("failed to tokenize statement: {message}")]
    Tokenize { message: String },

    #[error("unrecognized statement: {sql}")]
    Unrecognized { sql: String },

    #[error("malformed statement ({reason}): {sql}")]
    Malformed { reason: String, sql: String },
}

impl ParseError {
    pub(crate) fn malformed(reason: impl Into<String>, sql: &str) -> Self {
        ParseError::Malformed {
            reason: reason.into(),
            sql: sql.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslateError {
    #[error("redo parse error: {0}")]
    Redo(ParseError),

    #[error("undo parse error: {0}")]
    Undo(ParseError),

    #[error("update redo has no undo statement to rebuild the row image from")]
    MissingUndo,

    #[error("undo statement carries no column values to rebuild the row image from")]
    MissingPreImage,

    #[error("operation {} is not supported for translation", .0.as_str())]
    Unsupported(MigrateOperation),
}

#[derive(Debug, thiserror::Error)]
pub enum ReplicationError {
    #[error("translate log record at scn {scn} failed: {source}")]
    Translate {
        scn: u64,
        #[source]
        source: TranslateError,
    },

    /// A log record arrived without a redo payload.
    #[error("log record at scn {scn} for {schema}.{table} has an empty redo statement")]
    DataIntegrity {
        scn: u64,
        schema: String,
        table: String,
    },

    #[error("apply task at scn {scn} failed: {message}")]
    Apply { scn: u64, message: String },

    #[error("bulk write into {table} failed: {message}")]
    BulkWrite { table: String, message: String },

    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("invalid replication config: {0}")]
    Config(String),

    #[error("task queue closed before all tasks were dispatched")]
    QueueClosed,

    #[error("worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, ReplicationError>;
