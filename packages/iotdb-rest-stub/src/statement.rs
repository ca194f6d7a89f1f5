//! Parser for the metadata statements the stub understands.

use crate::error::{Result, StubError};

/// Parsed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateDatabase(String),
    DeleteDatabases(Vec<String>),
    CreateTimeseries {
        path: String,
        data_type: String,
        encoding: String,
        compression: String,
    },
    DeleteTimeseries(String),
    ShowDatabases(Option<String>),
    ShowDevices(Option<String>),
    ShowTimeseries(Option<String>),
}

impl Statement {
    /// True for statements that return rows.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Statement::ShowDatabases(_) | Statement::ShowDevices(_) | Statement::ShowTimeseries(_)
        )
    }

    /// Parses one statement. Keywords are case-insensitive, paths are not.
    pub fn parse(sql: &str) -> Result<Self> {
        let sql = sql.trim().trim_end_matches(';').trim();
        let words: Vec<&str> = sql.split_whitespace().collect();
        let lower: Vec<String> = words.iter().map(|w| w.to_ascii_lowercase()).collect();
        let keywords: Vec<&str> = lower.iter().map(String::as_str).collect();

        match keywords.as_slice() {
            ["create", "database", _] | ["create", "storage", "group", _] => {
                Ok(Statement::CreateDatabase(parse_path(words[words.len() - 1])?))
            }
            ["set", "storage", "group", "to", _] => {
                Ok(Statement::CreateDatabase(parse_path(words[4])?))
            }
            ["delete", "database", ..] | ["drop", "database", ..] if words.len() > 2 => {
                Ok(Statement::DeleteDatabases(parse_path_list(&words[2..])?))
            }
            ["delete", "storage", "group", ..] if words.len() > 3 => {
                Ok(Statement::DeleteDatabases(parse_path_list(&words[3..])?))
            }
            ["create", "timeseries", _, "with", ..] if words.len() > 4 => {
                parse_create_timeseries(words[2], &words[4..].join(" "))
            }
            ["delete", "timeseries", _] => Ok(Statement::DeleteTimeseries(parse_path(words[2])?)),
            ["show", "databases"] | ["show", "storage", "group"] => Ok(Statement::ShowDatabases(None)),
            ["show", "databases", _] => Ok(Statement::ShowDatabases(Some(parse_path(words[2])?))),
            ["show", "storage", "group", _] => {
                Ok(Statement::ShowDatabases(Some(parse_path(words[3])?)))
            }
            ["show", "devices"] => Ok(Statement::ShowDevices(None)),
            ["show", "devices", _] => Ok(Statement::ShowDevices(Some(parse_path(words[2])?))),
            ["show", "timeseries"] => Ok(Statement::ShowTimeseries(None)),
            ["show", "timeseries", _] => Ok(Statement::ShowTimeseries(Some(parse_path(words[2])?))),
            _ => Err(StubError::Parse(format!("unsupported statement '{}'", sql))),
        }
    }
}

/// Validates a dotted path starting at `root`.
fn parse_path(raw: &str) -> Result<String> {
    let path = raw.trim().trim_end_matches(',');
    let mut nodes = path.split('.');
    if nodes.next() != Some("root") {
        return Err(StubError::Parse(format!("path '{}' must start with root", path)));
    }
    if path.split('.').any(str::is_empty) {
        return Err(StubError::Parse(format!("path '{}' has an empty node", path)));
    }
    Ok(path.to_string())
}

/// Parses `a, b` or `a,b` path lists.
fn parse_path_list(words: &[&str]) -> Result<Vec<String>> {
    words
        .join(" ")
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(parse_path)
        .collect()
}

/// Parses the attribute list of `CREATE TIMESERIES <path> WITH ...`.
fn parse_create_timeseries(path: &str, attributes: &str) -> Result<Statement> {
    let path = parse_path(path)?;
    if path.contains('*') {
        return Err(StubError::Parse(format!("wildcard in series path '{}'", path)));
    }

    let mut data_type = None;
    let mut encoding = None;
    let mut compression = None;
    for pair in attributes.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| StubError::Parse(format!("attribute '{}' has no value", pair)))?;
        let value = value.trim().to_ascii_uppercase();
        match key.trim().to_ascii_lowercase().as_str() {
            "datatype" => data_type = Some(value),
            "encoding" => encoding = Some(value),
            "compression" | "compressor" => compression = Some(value),
            other => {
                return Err(StubError::Parse(format!("unknown attribute '{}'", other)));
            }
        }
    }

    let data_type =
        data_type.ok_or_else(|| StubError::Parse("datatype is required".to_string()))?;
    if !matches!(
        data_type.as_str(),
        "BOOLEAN" | "INT32" | "INT64" | "FLOAT" | "DOUBLE" | "TEXT"
    ) {
        return Err(StubError::Parse(format!("unsupported datatype '{}'", data_type)));
    }

    Ok(Statement::CreateTimeseries {
        path,
        encoding: encoding.unwrap_or_else(|| default_encoding(&data_type).to_string()),
        compression: compression.unwrap_or_else(|| "LZ4".to_string()),
        data_type,
    })
}

fn default_encoding(data_type: &str) -> &'static str {
    match data_type {
        "BOOLEAN" | "TEXT" => "PLAIN",
        "INT32" | "INT64" => "TS_2DIFF",
        _ => "GORILLA",
    }
}
