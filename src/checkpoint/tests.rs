use super::*;
use sqlx::sqlite::SqlitePoolOptions;

async fn memory_pool() -> Pool<Sqlite> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

#[tokio::test]
async fn test_sqlite_checkpoint_upsert() {
    let store = SqliteCheckpointStore::new(memory_pool().await).await.unwrap();
    let key = CheckpointKey::new("MARVIN", "T1");

    assert_eq!(store.load(&key).await.unwrap(), None);

    store.save(&key, 100).await.unwrap();
    assert_eq!(store.load(&key).await.unwrap(), Some(100));

    // Conflict (Update)
    store.save(&key, 250).await.unwrap();
    assert_eq!(store.load(&key).await.unwrap(), Some(250));

    let other = CheckpointKey::new("MARVIN", "T2");
    assert_eq!(store.load(&other).await.unwrap(), None);
}

#[tokio::test]
async fn test_sqlite_checkpoint_schema_init_is_repeatable() {
    let pool = memory_pool().await;
    let first = SqliteCheckpointStore::new(pool.clone()).await.unwrap();
    first.save(&CheckpointKey::new("S", "T"), 9).await.unwrap();

    let second = SqliteCheckpointStore::new(pool).await.unwrap();
    assert_eq!(second.load(&CheckpointKey::new("S", "T")).await.unwrap(), Some(9));
}

#[tokio::test]
async fn test_sqlite_checkpoint_rejects_out_of_range_scn() {
    let store = SqliteCheckpointStore::new(memory_pool().await).await.unwrap();
    let err = store
        .save(&CheckpointKey::new("S", "T"), u64::MAX)
        .await
        .unwrap_err();
    assert!(err.contains("does not fit"), "got: {err}");
}

#[tokio::test]
async fn test_memory_checkpoint_store() {
    let store = MemoryCheckpointStore::new();
    let key = CheckpointKey::new(" S ", "T");

    store.save(&key, 3).await.unwrap();
    assert_eq!(store.load(&CheckpointKey::new("S", "T")).await.unwrap(), Some(3));
    assert_eq!(store.snapshot().await.len(), 1);
}
