//! Parsing of command-line parameters and migration directories

use std::fs;
use std::io;
use std::path::Path;

use sqlproxy_core::{Migration, Params, Value};

/// Parse a `:name=value` binding.
///
/// The value is read as an integer, then a real, then `null`; anything
/// else binds as text.
pub fn parse_param(arg: &str) -> Result<(String, Value), String> {
    let (name, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", arg))?;

    if name.is_empty() {
        return Err(format!("missing parameter name in '{}'", arg));
    }

    Ok((name.to_string(), parse_value(raw)))
}

fn parse_value(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::Real(f);
    }
    if raw == "null" {
        return Value::Null;
    }
    Value::Text(raw.to_string())
}

pub fn to_params(bindings: Vec<(String, Value)>) -> Params {
    bindings.into_iter().collect()
}

/// Load every `*.sql` file in `dir`, sorted by file name.
///
/// The migration name is the file stem.
pub fn load_migrations(dir: &Path) -> io::Result<Vec<Migration>> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "sql"))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("file name {} is not valid UTF-8", path.display()),
                    )
                })?
                .to_string();
            let sql = fs::read_to_string(&path)?;
            Ok(Migration::new(name, sql))
        })
        .collect()
}
