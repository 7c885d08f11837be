use crate::error::TranslateError;
use crate::models::{MigrateOperation, OperationType, RowImage};
use crate::parser::{parse_statement, ParsedStatement};
use crate::sql_utils::{build_delete_statement, build_replace_statement, qualified_table_name};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub statements: Vec<String>,
    pub operation_type: OperationType,
}

/// Translates one redo event (plus its undo, for updates) into target-dialect
/// statements against `target_schema.target_table`.
///
/// Row changes become idempotent writes: INSERT turns into REPLACE, and
/// UPDATE turns into a DELETE by the redo predicate followed by a REPLACE
/// built from the row image carried by the undo statement. Re-applying the
/// same translation therefore leaves the target unchanged.
pub fn translate_redo(
    redo_sql: &str,
    undo_sql: &str,
    target_schema: &str,
    target_table: &str,
) -> Result<Translation, TranslateError> {
    let mut stmt = parse_statement(redo_sql).map_err(TranslateError::Redo)?;
    stmt.schema = target_schema.to_string();
    stmt.table = target_table.to_string();

    match stmt.operation {
        MigrateOperation::Insert => Ok(Translation {
            statements: vec![build_replace_statement(&stmt.schema, &stmt.table, &stmt.data)],
            operation_type: OperationType::Insert,
        }),
        MigrateOperation::Update => translate_update(stmt, undo_sql),
        MigrateOperation::Delete => Ok(Translation {
            statements: vec![build_delete_statement(
                &stmt.schema,
                &stmt.table,
                &stmt.where_expr,
            )],
            operation_type: OperationType::Delete,
        }),
        MigrateOperation::Truncate => Ok(Translation {
            statements: vec![format!(
                "TRUNCATE TABLE {}",
                qualified_table_name(&stmt.schema, &stmt.table)
            )],
            operation_type: OperationType::TruncateTable,
        }),
        MigrateOperation::Drop => Ok(Translation {
            statements: vec![format!(
                "DROP TABLE {}",
                qualified_table_name(&stmt.schema, &stmt.table)
            )],
            operation_type: OperationType::DropTable,
        }),
        MigrateOperation::Ddl => Err(TranslateError::Unsupported(stmt.operation)),
    }
}

fn translate_update(stmt: ParsedStatement, undo_sql: &str) -> Result<Translation, TranslateError> {
    if undo_sql.trim().is_empty() {
        return Err(TranslateError::MissingUndo);
    }

    let undo = parse_statement(undo_sql).map_err(TranslateError::Undo)?;
    if undo.before.is_empty() {
        return Err(TranslateError::MissingPreImage);
    }

    // Supplemental logging puts every column into the undo predicate, so its
    // equality image is the complete row.
    let image = undo
        .before
        .iter()
        .map(|(column, value)| (column.to_uppercase(), value.to_string()))
        .collect::<RowImage>();

    Ok(Translation {
        statements: vec![
            build_delete_statement(&stmt.schema, &stmt.table, &stmt.where_expr),
            build_replace_statement(&stmt.schema, &stmt.table, &image),
        ],
        operation_type: OperationType::Update,
    })
}
