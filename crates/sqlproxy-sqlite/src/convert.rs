//! Conversion between contract values and rusqlite values

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::ToSql;
use sqlproxy_core::{Params, Value};

pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(v) => SqlValue::Integer(*v),
        Value::Real(v) => SqlValue::Real(*v),
        Value::Text(v) => SqlValue::Text(v.clone()),
        Value::Blob(v) => SqlValue::Blob(v.clone()),
    }
}

pub(crate) fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Real(v),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

/// Owned bindings for a parameter set, keyed by placeholder token
pub(crate) struct Bindings<'p> {
    values: Vec<(&'p str, SqlValue)>,
}

impl<'p> Bindings<'p> {
    pub(crate) fn new(params: &'p Params) -> Self {
        Self {
            values: params.iter().map(|(name, value)| (name, to_sql(value))).collect(),
        }
    }

    /// Named form accepted by `Statement::execute` and `Statement::query`
    pub(crate) fn named(&self) -> Vec<(&str, &dyn ToSql)> {
        self.values
            .iter()
            .map(|(name, value)| (*name, value as &dyn ToSql))
            .collect()
    }
}
