use serde::{Deserialize, Serialize};

fn default_insert_batch_size() -> usize {
    100
}

fn default_true() -> bool {
    true
}

fn default_task_queue_size() -> usize {
    1024
}

fn default_apply_threads() -> usize {
    1
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationConfig {
    /// Rows per generated multi-row write statement during the full load.
    #[serde(default = "default_insert_batch_size")]
    pub insert_batch_size: usize,
    /// REPLACE INTO instead of INSERT INTO, so a partially failed load can be re-run.
    #[serde(default = "default_true")]
    pub safe_mode: bool,
    #[serde(default = "default_task_queue_size")]
    pub task_queue_size: usize,
    #[serde(default = "default_apply_threads")]
    pub apply_threads: usize,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            insert_batch_size: default_insert_batch_size(),
            safe_mode: default_true(),
            task_queue_size: default_task_queue_size(),
            apply_threads: default_apply_threads(),
        }
    }
}

impl ReplicationConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, String> {
        let config = serde_json::from_str::<ReplicationConfig>(raw)
            .map_err(|e| format!("Failed to parse replication config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.insert_batch_size == 0 {
            return Err("insertBatchSize must be greater than zero".to_string());
        }
        if self.task_queue_size == 0 {
            return Err("taskQueueSize must be greater than zero".to_string());
        }
        if self.apply_threads == 0 {
            return Err("applyThreads must be greater than zero".to_string());
        }
        Ok(())
    }
}
