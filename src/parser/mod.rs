// =====================================================
// REDO STATEMENT PARSER
// Extracts table, columns, row images and the WHERE clause
// from the statement shapes the log miner emits
// =====================================================

use crate::error::ParseError;
use crate::models::{MigrateOperation, RowImage};
use crate::sql_utils::escape_sql_string;
use sqlparser::dialect::GenericDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

/// Keys the log miner adds to WHERE clauses that are not target columns.
const PSEUDO_COLUMNS: [&str; 1] = ["ROWID"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStatement {
    pub operation: MigrateOperation,
    pub schema: String,
    pub table: String,
    /// Positional column order for INSERT; SET order for UPDATE.
    pub columns: Vec<String>,
    /// Post-image: INSERT values or UPDATE assignments.
    pub data: RowImage,
    /// Equality image recovered from the WHERE clause.
    pub before: RowImage,
    /// Raw clause including the WHERE keyword; empty means every row.
    pub where_expr: String,
}

impl ParsedStatement {
    fn new(operation: MigrateOperation, schema: String, table: String) -> Self {
        Self {
            operation,
            schema,
            table,
            columns: Vec::new(),
            data: RowImage::new(),
            before: RowImage::new(),
            where_expr: String::new(),
        }
    }
}

pub fn parse_statement(sql: &str) -> Result<ParsedStatement, ParseError> {
    let dialect = GenericDialect {};
    let tokens = Tokenizer::new(&dialect, sql)
        .tokenize()
        .map_err(|e| ParseError::Tokenize {
            message: e.to_string(),
        })?
        .into_iter()
        .filter(|token| !matches!(token, Token::EOF))
        .collect::<Vec<Token>>();

    let mut cursor = TokenCursor::new(&tokens);
    let Some(leading) = cursor.next_word() else {
        return Err(ParseError::Unrecognized {
            sql: sql.to_string(),
        });
    };

    match leading.to_ascii_uppercase().as_str() {
        "INSERT" => parse_insert(&mut cursor, sql),
        "UPDATE" => parse_update(&mut cursor, sql),
        "DELETE" => parse_delete(&mut cursor, sql),
        "TRUNCATE" => {
            cursor.consume_keyword("TABLE");
            let (schema, table) = parse_object_name(&mut cursor, sql)?;
            Ok(ParsedStatement::new(MigrateOperation::Truncate, schema, table))
        }
        "DROP" => {
            if !cursor.consume_keyword("TABLE") {
                return Ok(ParsedStatement::new(
                    MigrateOperation::Ddl,
                    String::new(),
                    String::new(),
                ));
            }
            let (schema, table) = parse_object_name(&mut cursor, sql)?;
            Ok(ParsedStatement::new(MigrateOperation::Drop, schema, table))
        }
        "CREATE" | "ALTER" | "RENAME" | "COMMENT" | "GRANT" | "REVOKE" | "ANALYZE" | "PURGE" => Ok(
            ParsedStatement::new(MigrateOperation::Ddl, String::new(), String::new()),
        ),
        _ => Err(ParseError::Unrecognized {
            sql: sql.to_string(),
        }),
    }
}

fn parse_insert(cursor: &mut TokenCursor<'_>, sql: &str) -> Result<ParsedStatement, ParseError> {
    cursor.expect_keyword("INTO", sql)?;
    let (schema, table) = parse_object_name(cursor, sql)?;

    let columns = match cursor.peek() {
        Some(Token::LParen) => parse_column_list(cursor.take_parenthesized("column list", sql)?, sql)?,
        _ => Vec::new(),
    };
    if columns.is_empty() {
        return Err(ParseError::malformed("insert without column list", sql));
    }

    cursor.expect_keyword("VALUES", sql)?;
    let values = split_top_level(cursor.take_parenthesized("value list", sql)?, is_comma)
        .into_iter()
        .map(render_tokens)
        .collect::<Vec<String>>();
    if values.iter().any(String::is_empty) {
        return Err(ParseError::malformed("empty value in value list", sql));
    }
    if values.len() != columns.len() {
        return Err(ParseError::malformed(
            format!("{} columns but {} values", columns.len(), values.len()),
            sql,
        ));
    }

    let mut statement = ParsedStatement::new(MigrateOperation::Insert, schema, table);
    statement.data = columns.iter().cloned().zip(values).collect();
    statement.columns = columns;
    Ok(statement)
}

fn parse_update(cursor: &mut TokenCursor<'_>, sql: &str) -> Result<ParsedStatement, ParseError> {
    let (schema, table) = parse_object_name(cursor, sql)?;
    cursor.expect_keyword("SET", sql)?;

    let rest = cursor.rest();
    let (assignment_tokens, where_tokens) = split_at_where(rest);

    let mut data = RowImage::new();
    for assignment in split_top_level(assignment_tokens, is_comma) {
        let Some(eq_index) = find_top_level(assignment, |token| matches!(token, Token::Eq)) else {
            return Err(ParseError::malformed("assignment without '='", sql));
        };
        let column = parse_column_ref(&assignment[..eq_index], sql)?;
        let value = render_tokens(&assignment[eq_index + 1..]);
        if value.is_empty() {
            return Err(ParseError::malformed(
                format!("assignment to {} has no value", column),
                sql,
            ));
        }
        data.insert(column, value);
    }
    if data.is_empty() {
        return Err(ParseError::malformed("update without assignments", sql));
    }

    let mut statement = ParsedStatement::new(MigrateOperation::Update, schema, table);
    statement.columns = data.columns().map(str::to_string).collect();
    statement.data = data;
    statement.where_expr = render_tokens(where_tokens);
    statement.before = row_image_from_where(where_tokens);
    Ok(statement)
}

fn parse_delete(cursor: &mut TokenCursor<'_>, sql: &str) -> Result<ParsedStatement, ParseError> {
    cursor.expect_keyword("FROM", sql)?;
    let (schema, table) = parse_object_name(cursor, sql)?;

    let (_, where_tokens) = split_at_where(cursor.rest());

    let mut statement = ParsedStatement::new(MigrateOperation::Delete, schema, table);
    statement.where_expr = render_tokens(where_tokens);
    statement.before = row_image_from_where(where_tokens);
    statement.columns = statement.before.columns().map(str::to_string).collect();
    Ok(statement)
}

fn parse_object_name(cursor: &mut TokenCursor<'_>, sql: &str) -> Result<(String, String), ParseError> {
    let first = cursor
        .next_word()
        .ok_or_else(|| ParseError::malformed("missing table name", sql))?;

    if matches!(cursor.peek(), Some(Token::Period)) {
        cursor.next();
        let second = cursor
            .next_word()
            .ok_or_else(|| ParseError::malformed("missing table name after schema", sql))?;
        return Ok((first.to_string(), second.to_string()));
    }

    Ok((String::new(), first.to_string()))
}

fn parse_column_list(tokens: &[Token], sql: &str) -> Result<Vec<String>, ParseError> {
    split_top_level(tokens, is_comma)
        .into_iter()
        .map(|part| parse_column_ref(part, sql))
        .collect()
}

/// A bare or qualified column reference; the last name part is the column.
fn parse_column_ref(tokens: &[Token], sql: &str) -> Result<String, ParseError> {
    let parts = significant(tokens);
    let well_formed = !parts.is_empty()
        && parts
            .iter()
            .all(|token| matches!(token, Token::Word(_) | Token::Period));

    match parts.last() {
        Some(Token::Word(word)) if well_formed => Ok(word.value.clone()),
        _ => Err(ParseError::malformed(
            format!("invalid column reference '{}'", render_tokens(tokens)),
            sql,
        )),
    }
}

/// Splits `tokens` into everything before the top-level WHERE and the clause
/// starting at the WHERE keyword.
fn split_at_where<'t>(tokens: &'t [Token]) -> (&'t [Token], &'t [Token]) {
    match find_top_level(tokens, |token| is_keyword(token, "WHERE")) {
        Some(index) => (&tokens[..index], &tokens[index..]),
        None => (tokens, &[]),
    }
}

fn row_image_from_where(where_tokens: &[Token]) -> RowImage {
    let mut image = RowImage::new();
    let Some(condition) = where_tokens.get(1..) else {
        return image;
    };

    for conjunct in split_top_level(condition, |token| is_keyword(token, "AND")) {
        let Some((column, value)) = equality_from_conjunct(conjunct) else {
            log::debug!(
                "Skipping non-equality predicate '{}' while building row image",
                render_tokens(conjunct)
            );
            continue;
        };
        if PSEUDO_COLUMNS
            .iter()
            .any(|pseudo| column.eq_ignore_ascii_case(pseudo))
        {
            continue;
        }
        image.insert(column, value);
    }

    image
}

fn equality_from_conjunct(conjunct: &[Token]) -> Option<(String, String)> {
    if let Some(eq_index) = find_top_level(conjunct, |token| matches!(token, Token::Eq)) {
        let column = parse_column_ref(&conjunct[..eq_index], "").ok()?;
        let value = render_tokens(&conjunct[eq_index + 1..]);
        return (!value.is_empty()).then_some((column, value));
    }

    match significant(conjunct).as_slice() {
        [Token::Word(column), is, null] if is_keyword(is, "IS") && is_keyword(null, "NULL") => {
            Some((column.value.clone(), "NULL".to_string()))
        }
        _ => None,
    }
}

fn is_comma(token: &Token) -> bool {
    matches!(token, Token::Comma)
}

fn is_keyword(token: &Token, keyword: &str) -> bool {
    matches!(token, Token::Word(word) if word.quote_style.is_none() && word.value.eq_ignore_ascii_case(keyword))
}

fn significant(tokens: &[Token]) -> Vec<&Token> {
    tokens
        .iter()
        .filter(|token| !matches!(token, Token::Whitespace(_)))
        .collect()
}

fn find_top_level(tokens: &[Token], predicate: impl Fn(&Token) -> bool) -> Option<usize> {
    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ if depth == 0 && predicate(token) => return Some(index),
            _ => {}
        }
    }
    None
}

fn split_top_level<'t>(tokens: &'t [Token], is_separator: impl Fn(&Token) -> bool) -> Vec<&'t [Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ if depth == 0 && is_separator(token) => {
                parts.push(&tokens[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts
}

/// Re-assembles tokens into statement text. String literals are re-escaped
/// for the target dialect.
fn render_tokens(tokens: &[Token]) -> String {
    let mut output = String::new();
    for token in tokens {
        match token {
            Token::SingleQuotedString(value) | Token::EscapedStringLiteral(value) => {
                output.push('\'');
                output.push_str(&escape_sql_string(value));
                output.push('\'');
            }
            Token::NationalStringLiteral(value) => {
                output.push_str("N'");
                output.push_str(&escape_sql_string(value));
                output.push('\'');
            }
            other => output.push_str(&other.to_string()),
        }
    }
    output.trim().to_string()
}

struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.tokens.get(self.pos), Some(Token::Whitespace(_))) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<&'a Token> {
        self.skip_whitespace();
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn next_word(&mut self) -> Option<&'a str> {
        match self.peek()? {
            Token::Word(word) => {
                self.pos += 1;
                Some(word.value.as_str())
            }
            _ => None,
        }
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(token) if is_keyword(token, keyword) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect_keyword(&mut self, keyword: &str, sql: &str) -> Result<(), ParseError> {
        if self.consume_keyword(keyword) {
            Ok(())
        } else {
            Err(ParseError::malformed(format!("expected {}", keyword), sql))
        }
    }

    fn rest(&mut self) -> &'a [Token] {
        let rest = &self.tokens[self.pos.min(self.tokens.len())..];
        self.pos = self.tokens.len();
        rest
    }

    fn take_parenthesized(&mut self, what: &str, sql: &str) -> Result<&'a [Token], ParseError> {
        if !matches!(self.next(), Some(Token::LParen)) {
            return Err(ParseError::malformed(format!("expected ( before {}", what), sql));
        }

        let start = self.pos;
        let mut depth = 1usize;
        while let Some(token) = self.tokens.get(self.pos) {
            match token {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        let inner = &self.tokens[start..self.pos];
                        self.pos += 1;
                        return Ok(inner);
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }

        Err(ParseError::malformed(format!("unbalanced parentheses in {}", what), sql))
    }
}
