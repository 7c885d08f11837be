use crate::models::CheckpointKey;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Persisted replication progress: the last applied SCN per source table.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self, key: &CheckpointKey) -> Result<Option<u64>, String>;

    async fn save(&self, key: &CheckpointKey, scn: u64) -> Result<(), String>;
}

#[derive(Default)]
pub struct MemoryCheckpointStore {
    checkpoints: Mutex<HashMap<CheckpointKey, u64>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> HashMap<CheckpointKey, u64> {
        self.checkpoints.lock().await.clone()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, key: &CheckpointKey) -> Result<Option<u64>, String> {
        let guard = self.checkpoints.lock().await;
        Ok(guard.get(key).copied())
    }

    async fn save(&self, key: &CheckpointKey, scn: u64) -> Result<(), String> {
        let mut guard = self.checkpoints.lock().await;
        guard.insert(key.clone(), scn);
        Ok(())
    }
}

pub struct SqliteCheckpointStore {
    pool: Pool<Sqlite>,
}

impl SqliteCheckpointStore {
    pub async fn new(pool: Pool<Sqlite>) -> Result<Self, String> {
        ensure_schema(&pool).await?;
        Ok(Self { pool })
    }
}

async fn ensure_schema(pool: &Pool<Sqlite>) -> Result<(), String> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS incr_checkpoints (
            source_schema TEXT NOT NULL,
            source_table TEXT NOT NULL,
            scn INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (source_schema, source_table)
        );
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| format!("Failed to initialize checkpoint storage: {}", e))?;

    Ok(())
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn load(&self, key: &CheckpointKey) -> Result<Option<u64>, String> {
        let row = sqlx::query(
            r#"
            SELECT scn
            FROM incr_checkpoints
            WHERE source_schema = ? AND source_table = ?
            LIMIT 1
            "#,
        )
        .bind(&key.source_schema)
        .bind(&key.source_table)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| format!("Failed to load checkpoint: {}", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let scn: i64 = row
            .try_get("scn")
            .map_err(|e| format!("Failed to decode checkpoint scn: {}", e))?;
        u64::try_from(scn)
            .map(Some)
            .map_err(|_| format!("Stored checkpoint scn {} is negative", scn))
    }

    async fn save(&self, key: &CheckpointKey, scn: u64) -> Result<(), String> {
        let stored_scn = i64::try_from(scn)
            .map_err(|_| format!("Checkpoint scn {} does not fit storage", scn))?;

        sqlx::query(
            r#"
            INSERT INTO incr_checkpoints (source_schema, source_table, scn, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(source_schema, source_table) DO UPDATE SET
                scn = excluded.scn,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&key.source_schema)
        .bind(&key.source_table)
        .bind(stored_scn)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to persist checkpoint: {}", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests;
