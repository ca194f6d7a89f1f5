//! Wire access to an IoTDB server.
//!
//! The engine talks to the database only through [`Transport`]; the
//! production implementation is [`RestTransport`], which speaks the IoTDB
//! REST v1 API over a pooled hyper client.

use async_trait::async_trait;
use base64::prelude::*;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Request, StatusCode};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time;

use crate::config::EngineConfig;
use crate::error::{DialectError, Result};
use crate::url::ConnectionUrl;

/// IoTDB status code for a successful statement.
pub const SUCCESS_STATUS: i64 = 200;

/// Statement execution against a database.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Checks that the server answers.
    async fn ping(&self) -> Result<()>;

    /// Executes a statement that returns no rows.
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Executes a statement and returns its rows.
    async fn query(&self, sql: &str) -> Result<ResultSet>;
}

/// Row-major result of a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Position of a column, compared case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Values of one column rendered as strings; `null` becomes empty.
    pub fn column(&self, name: &str) -> Option<Vec<String>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| cell_text(row.get(index))).collect())
    }

    /// Values of the first column rendered as strings.
    pub fn first_column(&self) -> Vec<String> {
        self.rows.iter().map(|row| cell_text(row.first())).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Renders one cell as text.
pub fn cell_text(cell: Option<&Value>) -> String {
    match cell {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Request body shared by the query and non-query endpoints.
#[derive(Debug, Serialize)]
struct SqlRequest<'a> {
    sql: &'a str,
}

/// Status body returned by non-query calls and by failed queries.
#[derive(Debug, Deserialize)]
struct StatusBody {
    code: i64,
    #[serde(default)]
    message: Option<String>,
}

/// Column-major data set returned by the query endpoint.
#[derive(Debug, Deserialize)]
struct QueryDataSet {
    #[serde(default, alias = "columnNames")]
    column_names: Option<Vec<String>>,
    #[serde(default)]
    expressions: Option<Vec<String>>,
    #[serde(default)]
    timestamps: Option<Vec<i64>>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl QueryDataSet {
    /// Pivots the column-major payload into rows.
    fn into_result_set(self) -> ResultSet {
        let mut columns = self
            .column_names
            .filter(|names| !names.is_empty())
            .or(self.expressions)
            .unwrap_or_default();
        let timestamps = self.timestamps.unwrap_or_default();
        let with_time = !timestamps.is_empty();
        if with_time {
            columns.insert(0, "Time".to_string());
        }

        let row_count = self
            .values
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(timestamps.len()))
            .max()
            .unwrap_or(0);

        let rows = (0..row_count)
            .map(|r| {
                let mut row = Vec::with_capacity(columns.len());
                if with_time {
                    row.push(timestamps.get(r).map(|t| Value::from(*t)).unwrap_or(Value::Null));
                }
                for column in &self.values {
                    row.push(column.get(r).cloned().unwrap_or(Value::Null));
                }
                row
            })
            .collect();

        ResultSet { columns, rows }
    }
}

/// IoTDB REST v1 client.
pub struct RestTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    base: String,
    api_prefix: String,
    authorization: String,
    timeout_ms: u64,
}

impl RestTransport {
    /// Creates a transport for the URL's host and port.
    pub fn new(url: &ConnectionUrl, config: &EngineConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.connect_timeout()));
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build(connector);

        let credentials = format!("{}:{}", url.user, url.password);
        Self {
            client,
            base: url.http_base(),
            api_prefix: config.api_prefix.trim_end_matches('/').to_string(),
            authorization: format!("Basic {}", BASE64_STANDARD.encode(credentials)),
            timeout_ms: config.request_timeout_ms,
        }
    }

    /// Sends one request and returns the status and full body.
    async fn send(&self, method: Method, path: &str, body: Bytes) -> Result<(StatusCode, Bytes)> {
        let uri = format!("{}{}", self.base, path);
        let request = Request::builder()
            .method(method)
            .uri(&uri)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("Authorization", &self.authorization)
            .body(Full::new(body))
            .map_err(|e| DialectError::Transport(format!("Failed to build request: {}", e)))?;

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| DialectError::Transport(format!("Request to {} failed: {}", uri, e)))?;
            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| DialectError::Transport(format!("Failed to read response: {}", e)))?
                .to_bytes();
            Ok::<_, DialectError>((status, body))
        };

        time::timeout(time::Duration::from_millis(self.timeout_ms), exchange)
            .await
            .map_err(|_| DialectError::Timeout(self.timeout_ms))?
    }

    async fn post_sql(&self, endpoint: &str, sql: &str) -> Result<(StatusCode, Bytes)> {
        let body = serde_json::to_vec(&SqlRequest { sql })
            .map_err(|e| DialectError::Decode(format!("Failed to encode request: {}", e)))?;
        let path = format!("{}/{}", self.api_prefix, endpoint);
        self.send(Method::POST, &path, Bytes::from(body)).await
    }
}

/// Turns a status body into an error unless it reports success.
fn check_status(status: StatusCode, body: &[u8], sql: &str) -> Result<()> {
    match serde_json::from_slice::<StatusBody>(body) {
        Ok(reply) if reply.code == SUCCESS_STATUS => Ok(()),
        Ok(reply) => Err(DialectError::Server {
            code: reply.code,
            message: reply.message.unwrap_or_default(),
            sql: sql.to_string(),
        }),
        Err(_) if status.is_success() => Ok(()),
        Err(_) => Err(DialectError::Server {
            code: i64::from(status.as_u16()),
            message: String::from_utf8_lossy(body).into_owned(),
            sql: sql.to_string(),
        }),
    }
}

#[async_trait]
impl Transport for RestTransport {
    async fn ping(&self) -> Result<()> {
        let (status, body) = self.send(Method::GET, "/ping", Bytes::new()).await?;
        check_status(status, &body, "ping")
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        tracing::debug!("execute: {}", sql);
        let (status, body) = self.post_sql("nonQuery", sql).await?;
        check_status(status, &body, sql)
    }

    async fn query(&self, sql: &str) -> Result<ResultSet> {
        tracing::debug!("query: {}", sql);
        let (status, body) = self.post_sql("query", sql).await?;

        let value: Value = serde_json::from_slice(&body).map_err(|e| {
            if status.is_success() {
                DialectError::Decode(format!("Invalid query response: {}", e))
            } else {
                DialectError::Server {
                    code: i64::from(status.as_u16()),
                    message: String::from_utf8_lossy(&body).into_owned(),
                    sql: sql.to_string(),
                }
            }
        })?;

        if value.get("code").is_some() && value.get("values").is_none() {
            check_status(status, &body, sql)?;
            return Ok(ResultSet::default());
        }

        let data_set: QueryDataSet = serde_json::from_value(value)
            .map_err(|e| DialectError::Decode(format!("Unexpected query payload: {}", e)))?;
        Ok(data_set.into_result_set())
    }
}
