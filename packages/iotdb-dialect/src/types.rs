//! Relational view of IoTDB column metadata.

use std::fmt;

use serde::Serialize;

/// Relational type a time-series data type is exposed as.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum SqlType {
    Boolean,
    Integer,
    BigInteger,
    Float,
    Text,
    /// Data type name the dialect has no mapping for
    Unknown(String),
}

impl SqlType {
    /// Maps an IoTDB data type name (case-insensitive).
    pub fn from_iotdb(data_type: &str) -> Self {
        match data_type.trim().to_ascii_uppercase().as_str() {
            "BOOLEAN" => SqlType::Boolean,
            "INT32" => SqlType::Integer,
            "INT64" | "LONG" | "TIMESTAMP" => SqlType::BigInteger,
            "FLOAT" | "DOUBLE" => SqlType::Float,
            "TEXT" | "STRING" => SqlType::Text,
            _ => {
                tracing::warn!("No relational mapping for data type '{}'", data_type);
                SqlType::Unknown(data_type.to_string())
            }
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Boolean => write!(f, "BOOLEAN"),
            SqlType::Integer => write!(f, "INTEGER"),
            SqlType::BigInteger => write!(f, "BIGINT"),
            SqlType::Float => write!(f, "FLOAT"),
            SqlType::Text => write!(f, "TEXT"),
            SqlType::Unknown(name) => write!(f, "UNKNOWN({})", name),
        }
    }
}

/// Column descriptor returned by column introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    /// Measurement name, or `Time` for the structural column
    pub name: String,
    /// Mapped relational type
    pub sql_type: SqlType,
    /// Whether values may be missing
    pub nullable: bool,
    /// Default value, never set by IoTDB
    pub default: Option<String>,
    /// Declared encoding, e.g. `RLE`
    pub encoding: Option<String>,
    /// Declared compression, e.g. `LZ4`
    pub compression: Option<String>,
}

impl ColumnInfo {
    /// The implicit timestamp column every device exposes.
    pub fn time(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sql_type: SqlType::BigInteger,
            nullable: false,
            default: None,
            encoding: None,
            compression: None,
        }
    }
}

impl fmt::Display for ColumnInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.sql_type)?;
        if !self.nullable {
            write!(f, " NOT NULL")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mapping() {
        assert_eq!(SqlType::from_iotdb("BOOLEAN"), SqlType::Boolean);
        assert_eq!(SqlType::from_iotdb("int32"), SqlType::Integer);
        assert_eq!(SqlType::from_iotdb("INT64"), SqlType::BigInteger);
        assert_eq!(SqlType::from_iotdb("LONG"), SqlType::BigInteger);
        assert_eq!(SqlType::from_iotdb("FLOAT"), SqlType::Float);
        assert_eq!(SqlType::from_iotdb("DOUBLE"), SqlType::Float);
        assert_eq!(SqlType::from_iotdb("TEXT"), SqlType::Text);
        assert_eq!(
            SqlType::from_iotdb("VECTOR"),
            SqlType::Unknown("VECTOR".to_string())
        );
    }

    #[test]
    fn test_time_column() {
        let time = ColumnInfo::time("Time");
        assert!(!time.nullable);
        assert_eq!(time.to_string(), "Time BIGINT NOT NULL");
    }
}
