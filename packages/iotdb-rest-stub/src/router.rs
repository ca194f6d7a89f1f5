//! Matchit routing configuration.

use std::sync::{Arc, Mutex};

use hyper::{body::Bytes, Request, Response};
use matchit::Router as MatchitRouter;

use crate::error::StubError;
use crate::handlers::{self, StatusResponse};
use crate::schema_tree::{Outcome, SchemaTree};
use crate::statement::Statement;
use crate::StubConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Metadata tree
    pub tree: Arc<Mutex<SchemaTree>>,
    /// Stub configuration
    pub config: Arc<StubConfig>,
}

impl AppState {
    /// Applies a statement under the tree lock.
    pub fn apply(&self, statement: Statement) -> Result<Outcome, StubError> {
        let mut tree = self
            .tree
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tree.apply(statement)
    }
}

/// HTTP request router.
pub struct Router {
    inner: MatchitRouter<RouteHandler>,
    state: AppState,
}

impl Router {
    /// Creates a router serving the ping and REST v1 endpoints.
    pub fn new(tree: Arc<Mutex<SchemaTree>>, config: Arc<StubConfig>) -> Self {
        let mut router = MatchitRouter::new();

        router
            .insert("/ping", RouteHandler::Ping)
            .expect("Failed to insert /ping route");
        router
            .insert("/rest/v1/query", RouteHandler::Query)
            .expect("Failed to insert /rest/v1/query route");
        router
            .insert("/rest/v1/nonQuery", RouteHandler::NonQuery)
            .expect("Failed to insert /rest/v1/nonQuery route");

        Self {
            inner: router,
            state: AppState { tree, config },
        }
    }

    /// Routes an incoming request to the appropriate handler.
    pub async fn route(
        &self,
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Bytes>, RouterError> {
        let path = req.uri().path().to_string();

        match self.inner.at(&path) {
            Ok(matched) => matched.value.handle(req, self.state.clone()).await,
            Err(_) => Err(RouterError::NotFound(format!("No route found for {}", path))),
        }
    }
}

/// Route handler function.
enum RouteHandler {
    Ping,
    Query,
    NonQuery,
}

impl RouteHandler {
    async fn handle(
        &self,
        req: Request<hyper::body::Incoming>,
        state: AppState,
    ) -> Result<Response<Bytes>, RouterError> {
        match self {
            RouteHandler::Ping if req.method() == hyper::Method::GET => {
                handlers::ping(req, state).await
            }
            RouteHandler::Query if req.method() == hyper::Method::POST => {
                handlers::query(req, state).await
            }
            RouteHandler::NonQuery if req.method() == hyper::Method::POST => {
                handlers::non_query(req, state).await
            }
            _ => Err(RouterError::MethodNotAllowed),
        }
    }
}

/// Router error type.
#[derive(Debug)]
pub enum RouterError {
    MethodNotAllowed,
    InternalError(String),
    Timeout,
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
}

impl std::fmt::Display for RouterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouterError::MethodNotAllowed => write!(f, "Method Not Allowed"),
            RouterError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
            RouterError::Timeout => write!(f, "Request Timeout"),
            RouterError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            RouterError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            RouterError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
        }
    }
}

impl std::error::Error for RouterError {}

impl From<RouterError> for Response<Bytes> {
    fn from(err: RouterError) -> Self {
        let (status, code) = match &err {
            RouterError::MethodNotAllowed => (405, 405),
            RouterError::InternalError(_) => (500, 500),
            RouterError::Timeout => (408, 408),
            RouterError::BadRequest(_) => (400, 700),
            RouterError::NotFound(_) => (404, 404),
            RouterError::Unauthorized(_) => (401, 801),
        };

        let body = StatusResponse {
            code,
            message: err.to_string(),
        };
        handlers::build_response(status, &body).unwrap_or_else(|_| {
            let mut response = Response::new(Bytes::from("Internal Server Error"));
            *response.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
            response
        })
    }
}
