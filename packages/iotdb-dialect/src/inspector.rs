//! Relational-style catalog introspection.

use crate::engine::Engine;
use crate::error::Result;
use crate::types::ColumnInfo;

/// Catalog reader bound to an engine.
pub struct Inspector<'a> {
    engine: &'a Engine,
}

impl<'a> Inspector<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Lists databases, including the system database.
    pub async fn get_schema_names(&self) -> Result<Vec<String>> {
        let dialect = self.engine.dialect();
        let rows = self
            .engine
            .transport()?
            .query(&dialect.schema_names_sql())
            .await?;
        Ok(dialect.schema_names(&rows))
    }

    /// Lists devices under `schema`, relative to it, in ascending order.
    pub async fn get_table_names(&self, schema: &str) -> Result<Vec<String>> {
        let dialect = self.engine.dialect();
        let sql = dialect.table_names_sql(schema)?;
        let rows = self.engine.transport()?.query(&sql).await?;
        Ok(dialect.table_names(schema, &rows))
    }

    /// Describes the columns of device `table` under `schema`.
    pub async fn get_columns(&self, table: &str, schema: &str) -> Result<Vec<ColumnInfo>> {
        let dialect = self.engine.dialect();
        let sql = dialect.columns_sql(schema, table)?;
        let rows = self.engine.transport()?.query(&sql).await?;
        Ok(dialect.columns(schema, table, &rows))
    }

    pub async fn has_schema(&self, schema: &str) -> Result<bool> {
        Ok(self
            .get_schema_names()
            .await?
            .iter()
            .any(|name| name == schema))
    }

    /// True when the device has at least one time series.
    pub async fn has_table(&self, table: &str, schema: &str) -> Result<bool> {
        Ok(self.get_columns(table, schema).await?.len() > 1)
    }

    /// IoTDB has no primary keys.
    pub fn get_pk_constraint(&self, _table: &str, _schema: &str) -> Vec<String> {
        Vec::new()
    }

    /// IoTDB has no foreign keys.
    pub fn get_foreign_keys(&self, _table: &str, _schema: &str) -> Vec<String> {
        Vec::new()
    }

    /// IoTDB has no secondary indexes.
    pub fn get_indexes(&self, _table: &str, _schema: &str) -> Vec<String> {
        Vec::new()
    }
}
