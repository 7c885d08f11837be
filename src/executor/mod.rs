use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, Pool, Sqlite};

/// Target-side execution seam. Implementations own their connections.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    /// Runs one prepared statement with a flat positional argument group.
    async fn execute_prepared(&self, sql: &str, args: &[Value]) -> Result<u64, String>;

    /// Runs the statements translated from one log record in a single transaction.
    async fn execute_statements(&self, statements: &[String]) -> Result<u64, String>;
}

/// Pool-backed executor for one sqlx driver. Both drivers share these bodies;
/// only the value binder differs.
macro_rules! impl_statement_executor {
    ($executor:ident, $db:ty, $bind:ident) => {
        pub struct $executor {
            pool: Pool<$db>,
        }

        impl $executor {
            pub fn new(pool: Pool<$db>) -> Self {
                Self { pool }
            }
        }

        #[async_trait]
        impl StatementExecutor for $executor {
            async fn execute_prepared(&self, sql: &str, args: &[Value]) -> Result<u64, String> {
                let mut query = sqlx::query(sql);
                for value in args {
                    query = $bind(query, value);
                }

                let result = query
                    .execute(&self.pool)
                    .await
                    .map_err(|e| format!("Failed to execute prepared statement: {}", e))?;
                Ok(result.rows_affected())
            }

            async fn execute_statements(&self, statements: &[String]) -> Result<u64, String> {
                let mut tx = self
                    .pool
                    .begin()
                    .await
                    .map_err(|e| format!("Failed to begin transaction: {}", e))?;

                let mut affected = 0u64;
                for statement in statements {
                    let result = sqlx::query(statement)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| format!("Failed to execute '{}': {}", statement, e))?;
                    affected = affected.saturating_add(result.rows_affected());
                }

                tx.commit()
                    .await
                    .map_err(|e| format!("Failed to commit transaction: {}", e))?;
                Ok(affected)
            }
        }
    };
}

impl_statement_executor!(MySqlExecutor, MySql, bind_mysql_value);
impl_statement_executor!(SqliteExecutor, Sqlite, bind_sqlite_value);

fn bind_mysql_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Number(num) => {
            if let Some(v) = num.as_i64() {
                query.bind(v)
            } else if let Some(v) = num.as_u64() {
                query.bind(v)
            } else {
                query.bind(num.as_f64())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

fn bind_sqlite_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Number(num) => match num.as_i64() {
            Some(v) => query.bind(v),
            None => query.bind(num.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}
