//! Splitting a batch script into complete statements
//!
//! Statement boundaries are found with `sqlite3_complete`, the same check
//! the sqlite3 shell uses, so semicolons inside string literals, comments
//! and trigger bodies do not split a statement.

use std::ffi::CString;

use rusqlite::ffi;

/// Split `script` into statements in source order.
///
/// Each statement keeps its terminating semicolon; a trailing statement
/// without one is returned as is. Blank pieces are dropped.
pub(crate) fn split_statements(script: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut start = 0;

    for (index, _) in script.match_indices(';') {
        let end = index + 1;
        let candidate = &script[start..end];
        if is_complete(candidate) {
            push_statement(&mut statements, candidate);
            start = end;
        }
    }

    push_statement(&mut statements, &script[start..]);
    statements
}

fn push_statement<'a>(statements: &mut Vec<&'a str>, piece: &'a str) {
    let piece = piece.trim();
    if !piece.trim_matches(|c: char| c == ';' || c.is_whitespace()).is_empty() {
        statements.push(piece);
    }
}

fn is_complete(sql: &str) -> bool {
    match CString::new(sql) {
        // SAFETY: the pointer is a valid NUL-terminated string for the call
        Ok(sql) => unsafe { ffi::sqlite3_complete(sql.as_ptr()) != 0 },
        // Interior NUL: keep accumulating and let SQLite report the statement
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_semicolons() {
        let statements = split_statements("CREATE TABLE a(x);CREATE TABLE a(x)");
        assert_eq!(statements, vec!["CREATE TABLE a(x);", "CREATE TABLE a(x)"]);
    }

    #[test]
    fn test_ignores_semicolons_in_literals_and_comments() {
        let script = "INSERT INTO t VALUES ('a;b');\n-- note; here\nINSERT INTO t VALUES (\"c;\");";
        let statements = split_statements(script);
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], "INSERT INTO t VALUES ('a;b');");
        assert!(statements[1].ends_with("INSERT INTO t VALUES (\"c;\");"));
    }

    #[test]
    fn test_keeps_trigger_body_together() {
        let script = "CREATE TRIGGER tr AFTER INSERT ON a BEGIN INSERT INTO b VALUES (1); END; SELECT 1;";
        let statements = split_statements(script);
        assert_eq!(
            statements,
            vec![
                "CREATE TRIGGER tr AFTER INSERT ON a BEGIN INSERT INTO b VALUES (1); END;",
                "SELECT 1;"
            ]
        );
    }

    #[test]
    fn test_drops_blank_pieces() {
        assert!(split_statements("  \n ;; ").is_empty());
        assert_eq!(split_statements("SELECT 1;\n\n"), vec!["SELECT 1;"]);
    }
}
