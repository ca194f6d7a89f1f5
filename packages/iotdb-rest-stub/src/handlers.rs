//! REST endpoint handlers.

use base64::prelude::*;
use http_body_util::BodyExt;
use hyper::{body::Bytes, Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time;

use crate::error::StubError;
use crate::router::{AppState, RouterError};
use crate::schema_tree::Outcome;
use crate::statement::Statement;

/// Status code the REST API reports on success.
pub const SUCCESS_STATUS: i64 = 200;

/// Body of query and non-query requests.
#[derive(Debug, Deserialize)]
pub struct SqlRequest {
    pub sql: String,
}

/// Status body returned by ping, non-query calls and every failure.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub code: i64,
    pub message: String,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            code: SUCCESS_STATUS,
            message: "SUCCESS_STATUS".to_string(),
        }
    }
}

impl From<&StubError> for StatusResponse {
    fn from(err: &StubError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Column-major data set returned by the query endpoint.
#[derive(Debug, Serialize)]
pub struct QueryDataSet {
    pub expressions: Option<Vec<String>>,
    pub column_names: Vec<String>,
    pub timestamps: Vec<i64>,
    pub values: Vec<Vec<Value>>,
}

/// Reads the request body within the configured timeout.
async fn read_request_body_with_timeout(
    req: Request<hyper::body::Incoming>,
    timeout_ms: u64,
) -> Result<Bytes, RouterError> {
    let timeout_duration = time::Duration::from_millis(timeout_ms);
    let body = time::timeout(timeout_duration, req.collect())
        .await
        .map_err(|_| RouterError::Timeout)?
        .map_err(|e| RouterError::InternalError(format!("Failed to read request body: {}", e)))?;
    Ok(body.to_bytes())
}

/// Checks `Authorization: Basic <base64(user:password)>`. The `Basic `
/// prefix is optional, as with the real server.
pub fn authorize<B>(req: &Request<B>, state: &AppState) -> Result<(), RouterError> {
    let header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| RouterError::Unauthorized("missing Authorization header".to_string()))?;
    let encoded = header.strip_prefix("Basic ").unwrap_or(header).trim();
    let decoded = BASE64_STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| RouterError::Unauthorized("malformed credentials".to_string()))?;
    let (user, password) = decoded
        .split_once(':')
        .ok_or_else(|| RouterError::Unauthorized("malformed credentials".to_string()))?;

    if user != state.config.user || password != state.config.password {
        return Err(RouterError::Unauthorized(format!("wrong password for user {}", user)));
    }
    Ok(())
}

/// Serializes `body` as a JSON response.
pub fn build_response<T: Serialize>(status: u16, body: &T) -> Result<Response<Bytes>, RouterError> {
    let json = serde_json::to_vec(body)
        .map_err(|e| RouterError::InternalError(format!("Failed to serialize response: {}", e)))?;
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Bytes::from(json))
        .map_err(|e| RouterError::InternalError(format!("Failed to build response: {}", e)))
}

/// Parses the SQL request body and the statement in it.
async fn read_statement(
    req: Request<hyper::body::Incoming>,
    state: &AppState,
) -> Result<Result<Statement, StubError>, RouterError> {
    let body = read_request_body_with_timeout(req, state.config.request_timeout_ms).await?;
    let request: SqlRequest = serde_json::from_slice(&body)
        .map_err(|e| RouterError::BadRequest(format!("Failed to parse request: {}", e)))?;
    Ok(Statement::parse(&request.sql))
}

/// Liveness probe.
///
/// # Endpoint
/// `GET /ping`
pub async fn ping(
    _req: Request<hyper::body::Incoming>,
    _state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    build_response(200, &StatusResponse::success())
}

/// Executes a statement that returns no rows.
///
/// # Endpoint
/// `POST /rest/v1/nonQuery`
///
/// # Request Body
/// ```json
/// {"sql": "create database root.cursor"}
/// ```
///
/// # Response
/// `{"code": 200, "message": "SUCCESS_STATUS"}`, or the IoTDB status code
/// and message of the failure.
pub async fn non_query(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    authorize(&req, &state)?;
    let outcome = match read_statement(req, &state).await? {
        Ok(statement) if statement.is_query() => Err(StubError::Semantic(
            "query statements must be sent to the query endpoint".to_string(),
        )),
        Ok(statement) => state.apply(statement),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(_) => build_response(200, &StatusResponse::success()),
        Err(e) => {
            tracing::debug!("nonQuery rejected: {}", e);
            build_response(200, &StatusResponse::from(&e))
        }
    }
}

/// Executes a `SHOW` statement.
///
/// # Endpoint
/// `POST /rest/v1/query`
///
/// # Response
/// ```json
/// {
///   "expressions": null,
///   "column_names": ["Database", "SchemaReplicationFactor"],
///   "timestamps": [],
///   "values": [["root.cursor"], [1]]
/// }
/// ```
pub async fn query(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    authorize(&req, &state)?;
    let outcome = match read_statement(req, &state).await? {
        Ok(statement) if !statement.is_query() => Err(StubError::Semantic(
            "non-query statements must be sent to the nonQuery endpoint".to_string(),
        )),
        Ok(statement) => state.apply(statement),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(Outcome::Rows(table)) => build_response(
            200,
            &QueryDataSet {
                expressions: None,
                values: table.column_major(),
                column_names: table.columns,
                timestamps: Vec::new(),
            },
        ),
        Ok(Outcome::Done) => build_response(200, &StatusResponse::success()),
        Err(e) => {
            tracing::debug!("query rejected: {}", e);
            build_response(200, &StatusResponse::from(&e))
        }
    }
}
