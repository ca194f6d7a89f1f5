//! Translation of relational catalog calls into IoTDB statements.
//!
//! IoTDB organizes metadata as a path tree: a database (`root.cursor`)
//! plays the role of a schema, a device below it (`root.cursor.device1`)
//! plays the role of a table, and each time series under the device is a
//! column. The dialect builds the `SHOW` statements for each catalog call
//! and folds their rows back into relational names and descriptors.

use std::collections::BTreeSet;

use crate::error::{DialectError, Result};
use crate::transport::{cell_text, ResultSet};
use crate::types::{ColumnInfo, SqlType};

/// Database IoTDB reserves for its own metadata.
pub const SYSTEM_DATABASE: &str = "root.__system";

/// Name of the implicit timestamp column.
pub const TIME_COLUMN: &str = "Time";

/// Stateless IoTDB dialect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IotdbDialect;

impl IotdbDialect {
    pub fn name(&self) -> &'static str {
        "iotdb"
    }

    pub fn schema_names_sql(&self) -> String {
        "SHOW DATABASES".to_string()
    }

    pub fn table_names_sql(&self, schema: &str) -> Result<String> {
        validate_identifier(schema)?;
        Ok(format!("SHOW DEVICES {}.**", schema))
    }

    pub fn columns_sql(&self, schema: &str, table: &str) -> Result<String> {
        validate_identifier(schema)?;
        validate_identifier(table)?;
        Ok(format!("SHOW TIMESERIES {}.{}.*", schema, table))
    }

    /// Relational type for an IoTDB data type name.
    pub fn resolve_type(&self, iotdb_type: &str) -> SqlType {
        SqlType::from_iotdb(iotdb_type)
    }

    /// Database names exactly as `SHOW DATABASES` lists them, sorted and
    /// without duplicates. The server lists [`SYSTEM_DATABASE`] itself.
    pub fn schema_names(&self, rows: &ResultSet) -> Vec<String> {
        let names: BTreeSet<String> = rows
            .column("Database")
            .unwrap_or_else(|| rows.first_column())
            .into_iter()
            .filter(|name| !name.is_empty())
            .collect();
        names.into_iter().collect()
    }

    /// Device names relative to `schema`, sorted and without duplicates.
    pub fn table_names(&self, schema: &str, rows: &ResultSet) -> Vec<String> {
        let prefix = format!("{}.", schema);
        let names: BTreeSet<String> = rows
            .column("Device")
            .unwrap_or_else(|| rows.first_column())
            .into_iter()
            .filter_map(|device| device.strip_prefix(&prefix).map(str::to_string))
            .filter(|name| !name.is_empty())
            .collect();
        names.into_iter().collect()
    }

    /// Column descriptors for one device: the time column first, then one
    /// nullable column per time series in server order.
    pub fn columns(&self, schema: &str, table: &str, rows: &ResultSet) -> Vec<ColumnInfo> {
        let prefix = format!("{}.{}.", schema, table);
        let path_idx = rows.column_index("Timeseries").unwrap_or(0);
        let type_idx = rows.column_index("DataType");
        let encoding_idx = rows.column_index("Encoding");
        let compression_idx = rows.column_index("Compression");

        let optional = |row: &[serde_json::Value], idx: Option<usize>| {
            idx.map(|i| cell_text(row.get(i))).filter(|s| !s.is_empty())
        };

        let mut columns = vec![ColumnInfo::time(TIME_COLUMN)];
        for row in &rows.rows {
            let path = cell_text(row.get(path_idx));
            let name = path.strip_prefix(&prefix).unwrap_or(&path).to_string();
            let data_type = optional(row.as_slice(), type_idx).unwrap_or_default();
            columns.push(ColumnInfo {
                name,
                sql_type: self.resolve_type(&data_type),
                nullable: true,
                default: None,
                encoding: optional(row.as_slice(), encoding_idx),
                compression: optional(row.as_slice(), compression_idx),
            });
        }
        columns
    }
}

/// Rejects names that would change the meaning of a path pattern.
fn validate_identifier(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name.starts_with('.')
        || name.ends_with('.')
        || name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | ';' | '*'));
    if bad {
        return Err(DialectError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rows(columns: &[&str], data: Vec<Vec<serde_json::Value>>) -> ResultSet {
        ResultSet::new(columns.iter().map(|c| c.to_string()).collect(), data)
    }

    #[test]
    fn test_statements() {
        let d = IotdbDialect;
        assert_eq!(d.schema_names_sql(), "SHOW DATABASES");
        assert_eq!(d.table_names_sql("root.cursor").unwrap(), "SHOW DEVICES root.cursor.**");
        assert_eq!(
            d.columns_sql("root.cursor", "device1").unwrap(),
            "SHOW TIMESERIES root.cursor.device1.*"
        );
    }

    #[test]
    fn test_identifier_validation() {
        let d = IotdbDialect;
        for bad in ["", "root.cursor; delete database root", "root.*", "a b", "root.", "'x'"] {
            assert_eq!(
                d.table_names_sql(bad),
                Err(DialectError::InvalidIdentifier(bad.to_string()))
            );
        }
        assert!(d.columns_sql("root.cursor", "").is_err());
    }

    #[test]
    fn test_schema_names_report_server_listing() {
        let d = IotdbDialect;
        let rs = rows(
            &["Database", "SchemaReplicationFactor"],
            vec![
                vec![json!("root.cursor_s1"), json!(1)],
                vec![json!(SYSTEM_DATABASE), json!(1)],
                vec![json!("root.cursor"), json!(1)],
                vec![json!("root.cursor"), json!(1)],
            ],
        );
        assert_eq!(
            d.schema_names(&rs),
            vec!["root.__system", "root.cursor", "root.cursor_s1"]
        );
    }

    #[test]
    fn test_schema_names_do_not_invent_system() {
        let d = IotdbDialect;
        let rs = rows(
            &["Database"],
            vec![vec![json!("root.cursor")], vec![json!("root.cursor_s1")]],
        );
        assert_eq!(d.schema_names(&rs), vec!["root.cursor", "root.cursor_s1"]);
        assert!(d.schema_names(&ResultSet::default()).is_empty());
    }

    #[test]
    fn test_table_names_strip_schema_prefix() {
        let d = IotdbDialect;
        let rs = rows(
            &["Device", "IsAligned"],
            vec![
                vec![json!("root.cursor.device2"), json!("false")],
                vec![json!("root.cursor.device1"), json!("false")],
                vec![json!("root.cursor_s1.device9"), json!("false")],
            ],
        );
        assert_eq!(d.table_names("root.cursor", &rs), vec!["device1", "device2"]);
    }

    #[test]
    fn test_nested_devices_keep_relative_path() {
        let d = IotdbDialect;
        let rs = rows(&["Device"], vec![vec![json!("root.sg.plant.line1")]]);
        assert_eq!(d.table_names("root.sg", &rs), vec!["plant.line1"]);
    }

    #[test]
    fn test_columns_prepend_time() {
        let d = IotdbDialect;
        let rs = rows(
            &["Timeseries", "Alias", "Database", "DataType", "Encoding", "Compression"],
            vec![
                vec![
                    json!("root.cursor.device1.temperature"),
                    json!(null),
                    json!("root.cursor"),
                    json!("FLOAT"),
                    json!("RLE"),
                    json!("LZ4"),
                ],
                vec![
                    json!("root.cursor.device1.status"),
                    json!(null),
                    json!("root.cursor"),
                    json!("BOOLEAN"),
                    json!("RLE"),
                    json!("LZ4"),
                ],
            ],
        );
        let columns = d.columns("root.cursor", "device1", &rs);
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0], ColumnInfo::time(TIME_COLUMN));
        assert_eq!(columns[1].name, "temperature");
        assert_eq!(columns[1].sql_type, SqlType::Float);
        assert_eq!(columns[1].encoding.as_deref(), Some("RLE"));
        assert_eq!(columns[1].compression.as_deref(), Some("LZ4"));
        assert!(columns[1].nullable);
        assert_eq!(columns[2].name, "status");
        assert_eq!(columns[2].sql_type, SqlType::Boolean);
    }
}
