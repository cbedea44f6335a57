//! Statement execution: update, select and batch

use rusqlite::Connection;
use sqlproxy_core::{Error, Params, Result, Row};

use crate::convert::{from_sql, Bindings};
use crate::script::split_statements;

/// Execute one statement, returning the number of changed rows
pub(crate) fn update(conn: &Connection, sql: &str, params: &Params) -> Result<usize> {
    let bindings = Bindings::new(params);
    let mut stmt = conn.prepare(sql).map_err(|e| Error::query(sql, e))?;

    stmt.execute(bindings.named().as_slice())
        .map_err(|e| Error::query(sql, e))
}

/// Execute one statement and collect every row
pub(crate) fn select(conn: &Connection, sql: &str, params: &Params) -> Result<Vec<Row>> {
    let bindings = Bindings::new(params);
    let mut stmt = conn.prepare(sql).map_err(|e| Error::query(sql, e))?;

    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let named = bindings.named();
    let mut rows = stmt
        .query(named.as_slice())
        .map_err(|e| Error::query(sql, e))?;

    let mut result = Vec::new();
    while let Some(row) = rows.next().map_err(|e| Error::query(sql, e))? {
        let mut out = Row::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            let value = row.get_ref(index).map_err(|e| Error::query(sql, e))?;
            out.push(column.as_str(), from_sql(value));
        }
        result.push(out);
    }

    Ok(result)
}

/// Execute a script statement by statement.
///
/// The first failure is reported with that statement's text; later
/// statements do not run. With `atomic`, the whole script runs in one
/// transaction and a failure rolls back the statements before it.
pub(crate) fn batch(conn: &Connection, sql: &str, atomic: bool) -> Result<()> {
    let statements = split_statements(sql);

    if atomic {
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::query(sql, e))?;
        run_statements(&tx, &statements)?;
        tx.commit().map_err(|e| Error::query(sql, e))
    } else {
        run_statements(conn, &statements)
    }
}

fn run_statements(conn: &Connection, statements: &[&str]) -> Result<()> {
    for statement in statements {
        conn.execute_batch(statement)
            .map_err(|e| Error::query(*statement, e))?;
    }
    Ok(())
}
