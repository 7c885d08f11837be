use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum MigrateOperation {
    Insert,
    Update,
    Delete,
    Ddl,
    Truncate,
    Drop,
}

impl MigrateOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrateOperation::Insert => "INSERT",
            MigrateOperation::Update => "UPDATE",
            MigrateOperation::Delete => "DELETE",
            MigrateOperation::Ddl => "DDL",
            MigrateOperation::Truncate => "TRUNCATE",
            MigrateOperation::Drop => "DROP",
        }
    }
}

/// Tag carried by a translated task. TRUNCATE and DROP are tagged as table
/// operations so consumers can tell them apart from row-level DML.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Insert,
    Update,
    Delete,
    TruncateTable,
    DropTable,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Insert => "INSERT",
            OperationType::Update => "UPDATE",
            OperationType::Delete => "DELETE",
            OperationType::TruncateTable => "TRUNCATE TABLE",
            OperationType::DropTable => "DROP TABLE",
        }
    }
}

/// One mined change event as delivered by the log-mining collaborator.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub scn: u64,
    pub operation: MigrateOperation,
    pub source_schema: String,
    pub source_table: String,
    pub target_schema: String,
    pub target_table: String,
    pub sql_redo: String,
    #[serde(default)]
    pub sql_undo: String,
}

/// Ordered column/value pairs of one row image. Capture order is kept so the
/// generated statement text is deterministic.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RowImage(Vec<(String, String)>);

impl RowImage {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Inserts or overwrites `column`, keeping the position of the first capture.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.0.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.0.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for RowImage {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut image = RowImage::new();
        for (column, value) in iter {
            image.insert(column, value);
        }
        image
    }
}

/// One unit of replication work produced by the incremental pipeline.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct IncrTask {
    /// Checkpoint candidate, persisted only once `target_sql` has been applied.
    pub scn: u64,
    pub operation: MigrateOperation,
    pub operation_type: OperationType,
    pub source_schema: String,
    pub source_table: String,
    pub target_schema: String,
    pub target_table: String,
    pub source_redo: String,
    pub source_undo: String,
    pub target_sql: Vec<String>,
}

impl IncrTask {
    pub fn target_table_key(&self) -> String {
        format!("{}.{}", self.target_schema, self.target_table)
    }

    pub fn checkpoint_key(&self) -> CheckpointKey {
        CheckpointKey::new(&self.source_schema, &self.source_table)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointKey {
    pub source_schema: String,
    pub source_table: String,
}

impl CheckpointKey {
    pub fn new(source_schema: &str, source_table: &str) -> Self {
        Self {
            source_schema: source_schema.trim().to_string(),
            source_table: source_table.trim().to_string(),
        }
    }
}
