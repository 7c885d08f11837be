use super::*;

#[test]
fn test_escape_sql_string() {
    assert_eq!(escape_sql_string("plain"), "plain");
    assert_eq!(escape_sql_string("it's"), "it''s");
    assert_eq!(escape_sql_string("C:\\path"), "C:\\\\path");
}

#[test]
fn test_build_insert_prefix() {
    let columns = vec!["ID".to_string(), "NAME".to_string()];
    assert_eq!(
        build_insert_prefix("MARVIN", "T1", &columns, true),
        "REPLACE INTO MARVIN.T1 (ID,NAME) VALUES "
    );
    assert_eq!(
        build_insert_prefix("MARVIN", "T1", &columns, false),
        "INSERT INTO MARVIN.T1 (ID,NAME) VALUES "
    );
}

#[test]
fn test_build_bind_var_groups() {
    assert_eq!(build_bind_var_groups(3, 2), "(?,?,?),(?,?,?)");
    assert_eq!(build_bind_var_groups(1, 1), "(?)");
    assert_eq!(build_bind_var_groups(0, 4), "");
    assert_eq!(build_bind_var_groups(2, 0), "");
}

#[test]
fn test_build_table_prepare_stmt() {
    let columns = vec!["A".to_string(), "B".to_string()];
    assert_eq!(
        build_table_prepare_stmt("S", "T", &columns, 3, false),
        "INSERT INTO S.T (A,B) VALUES (?,?),(?,?),(?,?)"
    );
}

#[test]
fn test_build_replace_and_delete_statements() {
    let image: RowImage = vec![
        ("ID".to_string(), "1".to_string()),
        ("NAME".to_string(), "'marvin'".to_string()),
    ]
    .into_iter()
    .collect();

    assert_eq!(
        build_replace_statement("S", "T", &image),
        "REPLACE INTO S.T(ID,NAME) VALUES(1,'marvin')"
    );
    assert_eq!(build_delete_statement("S", "T", "WHERE ID=2"), "DELETE FROM S.T WHERE ID=2");
    assert_eq!(build_delete_statement("S", "T", "  "), "DELETE FROM S.T");
    assert_eq!(build_delete_statement("", "T", ""), "DELETE FROM T");
}

#[test]
fn test_strip_wrapping_quotes_keeps_literal_content() {
    assert_eq!(
        strip_wrapping_quotes(r#"insert into "MARVIN"."T1"("ID","NOTE") values ('1','say "hi"')"#),
        r#"insert into MARVIN.T1(ID,NOTE) values ('1','say "hi"')"#
    );
}

#[test]
fn test_strip_statement_terminators() {
    assert_eq!(strip_statement_terminators("delete from T where ID = 1;"), "delete from T where ID = 1");
    assert_eq!(strip_statement_terminators("truncate table T ; ; "), "truncate table T");
    assert_eq!(
        strip_statement_terminators("insert into T(A) values ('a;b')"),
        "insert into T(A) values ('a;b')"
    );
}

#[test]
fn test_sanitize_log_sql() {
    assert_eq!(
        sanitize_log_sql(r#"  delete from "MARVIN"."T1" where "ID" = '5';"#),
        "delete from MARVIN.T1 where ID = '5'"
    );
}

#[test]
fn test_rewrite_schema_qualifier() {
    assert_eq!(
        rewrite_schema_qualifier("update marvin.T1 set A = 1 where B = 2", "MARVIN", "STEVEN"),
        "update STEVEN.T1 set A = 1 where B = 2"
    );
    // Only whole qualifiers are rewritten.
    assert_eq!(
        rewrite_schema_qualifier("update XMARVIN.T1 set A = 1", "MARVIN", "STEVEN"),
        "update XMARVIN.T1 set A = 1"
    );
    assert_eq!(rewrite_schema_qualifier("update T1 set A = 1", "", "STEVEN"), "update T1 set A = 1");
}

#[test]
fn test_rewrite_schema_qualifier_leaves_literals_alone() {
    assert_eq!(
        rewrite_schema_qualifier(
            "update marvin.T1 set A = 'it''s marvin.x' where B = 'MARVIN.y' and C = 1",
            "MARVIN",
            "STEVEN"
        ),
        "update STEVEN.T1 set A = 'it''s marvin.x' where B = 'MARVIN.y' and C = 1"
    );
}
