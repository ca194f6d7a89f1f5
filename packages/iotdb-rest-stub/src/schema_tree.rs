//! In-memory metadata tree: databases and the time series under them.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Value};

use crate::error::{Result, StubError};
use crate::statement::Statement;

/// Declared properties of one time series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesInfo {
    pub data_type: String,
    pub encoding: String,
    pub compression: String,
}

/// Rows produced by a `SHOW` statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Column-major copy of the rows, as the REST API ships them.
    pub fn column_major(&self) -> Vec<Vec<Value>> {
        (0..self.columns.len())
            .map(|c| {
                self.rows
                    .iter()
                    .map(|row| row.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect()
    }
}

/// Result of applying a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Done,
    Rows(Table),
}

/// Database the server reserves for itself. Listed, never writable.
pub const SYSTEM_DATABASE: &str = "root.__system";

/// Databases and series, both keyed by full path.
#[derive(Debug, Clone)]
pub struct SchemaTree {
    databases: BTreeSet<String>,
    series: BTreeMap<String, SeriesInfo>,
}

impl Default for SchemaTree {
    fn default() -> Self {
        Self {
            databases: BTreeSet::from([SYSTEM_DATABASE.to_string()]),
            series: BTreeMap::new(),
        }
    }
}

impl SchemaTree {
    /// Creates a tree holding only the system database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and applies one statement.
    pub fn execute(&mut self, sql: &str) -> Result<Outcome> {
        let statement = Statement::parse(sql)?;
        self.apply(statement)
    }

    pub fn apply(&mut self, statement: Statement) -> Result<Outcome> {
        match statement {
            Statement::CreateDatabase(path) => self.create_database(path).map(|_| Outcome::Done),
            Statement::DeleteDatabases(paths) => {
                self.delete_databases(&paths).map(|_| Outcome::Done)
            }
            Statement::CreateTimeseries {
                path,
                data_type,
                encoding,
                compression,
            } => self
                .create_timeseries(
                    path,
                    SeriesInfo {
                        data_type,
                        encoding,
                        compression,
                    },
                )
                .map(|_| Outcome::Done),
            Statement::DeleteTimeseries(pattern) => {
                self.delete_timeseries(&pattern).map(|_| Outcome::Done)
            }
            Statement::ShowDatabases(pattern) => Ok(Outcome::Rows(self.show_databases(pattern))),
            Statement::ShowDevices(pattern) => Ok(Outcome::Rows(self.show_devices(pattern))),
            Statement::ShowTimeseries(pattern) => Ok(Outcome::Rows(self.show_timeseries(pattern))),
        }
    }

    /// User databases, without the system database.
    pub fn databases(&self) -> impl Iterator<Item = &str> {
        self.databases
            .iter()
            .map(String::as_str)
            .filter(|db| *db != SYSTEM_DATABASE)
    }

    pub fn series(&self, path: &str) -> Option<&SeriesInfo> {
        self.series.get(path)
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    fn create_database(&mut self, path: String) -> Result<()> {
        if path.contains('*') || path.split('.').count() < 2 {
            return Err(StubError::Semantic(format!("'{}' is not a valid database path", path)));
        }
        let overlaps = self
            .databases
            .iter()
            .any(|db| db == &path || is_ancestor(db, &path) || is_ancestor(&path, db));
        if overlaps {
            return Err(StubError::DatabaseAlreadyExists { path });
        }
        tracing::debug!("create database {}", path);
        self.databases.insert(path);
        Ok(())
    }

    fn delete_databases(&mut self, patterns: &[String]) -> Result<()> {
        let targets: Vec<String> = self
            .databases
            .iter()
            .filter(|db| db.as_str() != SYSTEM_DATABASE)
            .filter(|db| patterns.iter().any(|p| path_matches(p, db)))
            .cloned()
            .collect();
        if targets.is_empty() {
            return Err(StubError::DatabaseNotExist {
                path: patterns.join(","),
            });
        }
        for db in targets {
            tracing::debug!("delete database {}", db);
            self.series.retain(|path, _| !is_ancestor(&db, path));
            self.databases.remove(&db);
        }
        Ok(())
    }

    fn create_timeseries(&mut self, path: String, info: SeriesInfo) -> Result<()> {
        match self.database_of(&path) {
            None => return Err(StubError::DatabaseNotExist { path }),
            Some(SYSTEM_DATABASE) => {
                return Err(StubError::Semantic(format!(
                    "'{}' is under the system database",
                    path
                )));
            }
            Some(_) => {}
        }
        if self.series.contains_key(&path) {
            return Err(StubError::PathAlreadyExists { path });
        }
        if self.series.keys().any(|s| is_ancestor(s, &path) || is_ancestor(&path, s)) {
            return Err(StubError::Semantic(format!(
                "'{}' conflicts with an existing series path",
                path
            )));
        }
        tracing::debug!("create timeseries {} {:?}", path, info);
        self.series.insert(path, info);
        Ok(())
    }

    fn delete_timeseries(&mut self, pattern: &str) -> Result<()> {
        let before = self.series.len();
        self.series.retain(|path, _| !path_matches(pattern, path));
        if self.series.len() == before {
            return Err(StubError::PathNotExist {
                path: pattern.to_string(),
            });
        }
        Ok(())
    }

    fn show_databases(&self, pattern: Option<String>) -> Table {
        let pattern = pattern.unwrap_or_else(|| "root.**".to_string());
        let mut table = Table::new(&[
            "Database",
            "SchemaReplicationFactor",
            "DataReplicationFactor",
            "TimePartitionInterval",
        ]);
        for db in self.databases.iter().filter(|db| path_matches(&pattern, db)) {
            table
                .rows
                .push(vec![json!(db), json!(1), json!(1), json!(604_800_000_i64)]);
        }
        table
    }

    fn show_devices(&self, pattern: Option<String>) -> Table {
        let pattern = pattern.unwrap_or_else(|| "root.**".to_string());
        let devices: BTreeSet<&str> = self
            .series
            .keys()
            .filter_map(|path| path.rsplit_once('.').map(|(device, _)| device))
            .filter(|device| path_matches(&pattern, device))
            .collect();

        let mut table = Table::new(&["Device", "IsAligned", "Template", "TTL(ms)"]);
        for device in devices {
            table
                .rows
                .push(vec![json!(device), json!("false"), json!("null"), json!("INF")]);
        }
        table
    }

    fn show_timeseries(&self, pattern: Option<String>) -> Table {
        let pattern = pattern.unwrap_or_else(|| "root.**".to_string());
        let mut table = Table::new(&[
            "Timeseries",
            "Alias",
            "Database",
            "DataType",
            "Encoding",
            "Compression",
            "Tags",
            "Attributes",
            "Deadband",
            "DeadbandParameters",
            "ViewType",
        ]);
        for (path, info) in self.series.iter().filter(|(p, _)| path_matches(&pattern, p)) {
            table.rows.push(vec![
                json!(path),
                Value::Null,
                json!(self.database_of(path).unwrap_or_default()),
                json!(info.data_type),
                json!(info.encoding),
                json!(info.compression),
                Value::Null,
                Value::Null,
                Value::Null,
                Value::Null,
                json!("BASE"),
            ]);
        }
        table
    }

    fn database_of(&self, path: &str) -> Option<&str> {
        self.databases
            .iter()
            .find(|db| is_ancestor(db, path))
            .map(String::as_str)
    }
}

/// True when `ancestor` is a strict prefix of `path` at a node boundary.
fn is_ancestor(ancestor: &str, path: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'.'
}

/// Matches a path against an IoTDB pattern: `*` is exactly one node,
/// `**` one or more nodes.
pub fn path_matches(pattern: &str, path: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let path: Vec<&str> = path.split('.').collect();
    match_nodes(&pattern, &path)
}

fn match_nodes(pattern: &[&str], path: &[&str]) -> bool {
    match (pattern.first(), path.first()) {
        (None, None) => true,
        (None, Some(_)) | (Some(_), None) => false,
        (Some(&"**"), Some(_)) => (1..=path.len()).any(|n| match_nodes(&pattern[1..], &path[n..])),
        (Some(&"*"), Some(_)) => match_nodes(&pattern[1..], &path[1..]),
        (Some(node), Some(actual)) => node == actual && match_nodes(&pattern[1..], &path[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fixture() -> SchemaTree {
        let mut tree = SchemaTree::new();
        for sql in [
            "create database root.cursor",
            "create database root.cursor_s1",
            "create timeseries root.cursor.device1.temperature with datatype=FLOAT,encoding=RLE",
            "create timeseries root.cursor.device1.status with datatype=FLOAT,encoding=RLE",
            "create timeseries root.cursor.device2.temperature with datatype=FLOAT,encoding=RLE",
        ] {
            assert_eq!(tree.execute(sql).unwrap(), Outcome::Done);
        }
        tree
    }

    fn first_column(outcome: Outcome) -> Vec<String> {
        match outcome {
            Outcome::Rows(table) => table
                .rows
                .iter()
                .map(|row| row[0].as_str().unwrap_or_default().to_string())
                .collect(),
            Outcome::Done => panic!("expected rows"),
        }
    }

    #[test]
    fn test_pattern_matching() {
        assert!(path_matches("root.**", "root.a.b"));
        assert!(path_matches("root.a.**", "root.a.b.c"));
        assert!(!path_matches("root.a.**", "root.a"));
        assert!(path_matches("root.a.*", "root.a.b"));
        assert!(!path_matches("root.a.*", "root.a.b.c"));
        assert!(path_matches("root.*.b", "root.x.b"));
        assert!(path_matches("root.a", "root.a"));
        assert!(!path_matches("root.a", "root.ab"));
        assert!(path_matches("root.**.s", "root.a.b.s"));
    }

    #[test]
    fn test_show_over_fixture() {
        let mut tree = fixture();
        assert_eq!(
            first_column(tree.execute("SHOW DATABASES").unwrap()),
            vec![SYSTEM_DATABASE, "root.cursor", "root.cursor_s1"]
        );
        assert_eq!(
            first_column(tree.execute("SHOW DEVICES root.cursor.**").unwrap()),
            vec!["root.cursor.device1", "root.cursor.device2"]
        );
        assert_eq!(
            first_column(tree.execute("SHOW TIMESERIES root.cursor.device1.*").unwrap()),
            vec![
                "root.cursor.device1.status",
                "root.cursor.device1.temperature"
            ]
        );
    }

    #[test]
    fn test_prefix_names_do_not_leak() {
        let mut tree = fixture();
        tree.execute("create timeseries root.cursor_s1.device9.s with datatype=INT32")
            .unwrap();
        assert_eq!(
            first_column(tree.execute("SHOW DEVICES root.cursor.**").unwrap()),
            vec!["root.cursor.device1", "root.cursor.device2"]
        );
    }

    #[test]
    fn test_timeseries_row_shape() {
        let mut tree = fixture();
        let Outcome::Rows(table) = tree
            .execute("SHOW TIMESERIES root.cursor.device2.*")
            .unwrap()
        else {
            panic!("expected rows");
        };
        assert_eq!(table.rows.len(), 1);
        let row = &table.rows[0];
        assert_eq!(row[2], json!("root.cursor"));
        assert_eq!(row[3], json!("FLOAT"));
        assert_eq!(row[4], json!("RLE"));
        assert_eq!(row[5], json!("LZ4"));
        assert_eq!(table.column_major().len(), table.columns.len());
    }

    #[test]
    fn test_delete_database_drops_series() {
        let mut tree = fixture();
        assert_eq!(tree.series_count(), 3);
        tree.execute("delete database root.cursor").unwrap();
        assert_eq!(tree.series_count(), 0);
        assert_eq!(tree.databases().collect::<Vec<_>>(), vec!["root.cursor_s1"]);
        tree.execute("delete database root.cursor_s1").unwrap();
        assert_eq!(tree.databases().count(), 0);
    }

    #[test]
    fn test_errors() {
        let mut tree = fixture();
        assert_eq!(
            tree.execute("create database root.cursor"),
            Err(StubError::DatabaseAlreadyExists {
                path: "root.cursor".to_string()
            })
        );
        assert!(matches!(
            tree.execute("create database root.cursor.inner"),
            Err(StubError::DatabaseAlreadyExists { .. })
        ));
        assert!(matches!(
            tree.execute("create database root"),
            Err(StubError::Semantic(_))
        ));
        assert!(matches!(
            tree.execute("create timeseries root.elsewhere.d.s with datatype=FLOAT"),
            Err(StubError::DatabaseNotExist { .. })
        ));
        assert!(matches!(
            tree.execute("create timeseries root.cursor.device1.status with datatype=FLOAT"),
            Err(StubError::PathAlreadyExists { .. })
        ));
        assert!(matches!(
            tree.execute("delete database root.nothing"),
            Err(StubError::DatabaseNotExist { .. })
        ));
        assert!(matches!(
            tree.execute("delete timeseries root.cursor.device3.*"),
            Err(StubError::PathNotExist { .. })
        ));
    }

    #[test]
    fn test_system_database_is_listed_and_protected() {
        let mut tree = SchemaTree::new();
        assert_eq!(tree.databases().count(), 0);
        assert_eq!(
            first_column(tree.execute("SHOW DATABASES").unwrap()),
            vec![SYSTEM_DATABASE]
        );
        assert!(matches!(
            tree.execute("create database root.__system"),
            Err(StubError::DatabaseAlreadyExists { .. })
        ));
        assert!(matches!(
            tree.execute("create timeseries root.__system.d.s with datatype=INT32"),
            Err(StubError::Semantic(_))
        ));
        assert!(matches!(
            tree.execute("delete database root.__system"),
            Err(StubError::DatabaseNotExist { .. })
        ));

        tree.execute("create database root.a").unwrap();
        tree.execute("delete database root.**").unwrap();
        assert_eq!(
            first_column(tree.execute("SHOW DATABASES").unwrap()),
            vec![SYSTEM_DATABASE]
        );
    }

    #[test]
    fn test_delete_timeseries() {
        let mut tree = fixture();
        tree.execute("delete timeseries root.cursor.device1.*").unwrap();
        assert_eq!(tree.series_count(), 1);
        assert!(tree.series("root.cursor.device2.temperature").is_some());
    }
}
