// =====================================================
// SQL UTILITIES MODULE
// Statement text assembly and redo text sanitizing
// =====================================================

use crate::models::RowImage;
use regex::{NoExpand, Regex};

pub fn escape_sql_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

pub fn qualified_table_name(schema: &str, table: &str) -> String {
    if schema.is_empty() {
        table.to_string()
    } else {
        format!("{}.{}", schema, table)
    }
}

/// `REPLACE INTO schema.table (c1,c2) VALUES ` in safe mode, `INSERT INTO ...` otherwise.
pub fn build_insert_prefix(schema: &str, table: &str, columns: &[String], safe_mode: bool) -> String {
    let verb = if safe_mode { "REPLACE" } else { "INSERT" };
    format!(
        "{} INTO {} ({}) VALUES ",
        verb,
        qualified_table_name(schema, table),
        columns.join(",")
    )
}

/// `rows` copies of a `(?,?,...)` tuple that is `columns` wide, comma-joined.
pub fn build_bind_var_groups(columns: usize, rows: usize) -> String {
    if columns == 0 || rows == 0 {
        return String::new();
    }

    let tuple = format!("({})", vec!["?"; columns].join(","));
    vec![tuple; rows].join(",")
}

pub fn build_table_prepare_stmt(
    schema: &str,
    table: &str,
    columns: &[String],
    insert_batch_size: usize,
    safe_mode: bool,
) -> String {
    format!(
        "{}{}",
        build_insert_prefix(schema, table, columns, safe_mode),
        build_bind_var_groups(columns.len(), insert_batch_size)
    )
}

pub fn build_replace_statement(schema: &str, table: &str, image: &RowImage) -> String {
    format!(
        "REPLACE INTO {}({}) VALUES({})",
        qualified_table_name(schema, table),
        image.columns().collect::<Vec<_>>().join(","),
        image.values().collect::<Vec<_>>().join(",")
    )
}

/// An empty `where_expr` yields an unconditional delete of the whole table.
pub fn build_delete_statement(schema: &str, table: &str, where_expr: &str) -> String {
    let where_expr = where_expr.trim();
    if where_expr.is_empty() {
        format!("DELETE FROM {}", qualified_table_name(schema, table))
    } else {
        format!("DELETE FROM {} {}", qualified_table_name(schema, table), where_expr)
    }
}

/// Drops the double quotes the log miner wraps identifiers in. Quotes inside
/// single-quoted literals are part of the value and stay.
pub fn strip_wrapping_quotes(sql: &str) -> String {
    let mut output = String::with_capacity(sql.len());
    let mut in_literal = false;
    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_literal = !in_literal;
                output.push(ch);
            }
            '"' if !in_literal => {}
            _ => output.push(ch),
        }
    }
    output
}

pub fn strip_statement_terminators(sql: &str) -> String {
    sql.trim_end()
        .trim_end_matches(|ch: char| ch == ';' || ch.is_whitespace())
        .to_string()
}

pub fn sanitize_log_sql(sql: &str) -> String {
    strip_statement_terminators(&strip_wrapping_quotes(sql))
        .trim()
        .to_string()
}

/// Rewrites `source_schema.` qualifiers to `target_schema.`. Text inside
/// single-quoted literals is row data and is never rewritten.
pub fn rewrite_schema_qualifier(sql: &str, source_schema: &str, target_schema: &str) -> String {
    let source_schema = source_schema.trim();
    if source_schema.is_empty() {
        return sql.to_string();
    }

    let pattern = format!(r"(?i)\b{}\.", regex::escape(source_schema));
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(error) => {
            log::warn!("Schema qualifier pattern '{}' is invalid: {}", pattern, error);
            return sql.to_string();
        }
    };

    let replacement = format!("{}.", target_schema);
    let mut output = String::with_capacity(sql.len());
    // Even segments sit outside literals; a doubled quote yields an empty outside segment.
    for (index, segment) in sql.split('\'').enumerate() {
        if index > 0 {
            output.push('\'');
        }
        if index % 2 == 0 {
            output.push_str(&re.replace_all(segment, NoExpand(&replacement)));
        } else {
            output.push_str(segment);
        }
    }
    output
}

#[cfg(test)]
mod tests;
