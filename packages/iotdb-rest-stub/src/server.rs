//! Hyper server setup and request handling.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use http_body_util::Full;
use hyper::body::{Bytes, Incoming as IncomingBody};
use hyper::{Request, Response, Result as HyperResult};
use hyper_util::rt::TokioExecutor;
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder as ConnectionBuilder;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::router::Router;
use crate::schema_tree::SchemaTree;
use crate::StubConfig;

/// HTTP server imitating the IoTDB REST service.
pub struct StubServer {
    listener: TcpListener,
    router: Arc<Router>,
    tree: Arc<Mutex<SchemaTree>>,
}

impl StubServer {
    /// Binds the configured address. Port 0 picks an ephemeral port.
    ///
    /// # Arguments
    ///
    /// * `config` - Stub configuration
    ///
    /// # Returns
    ///
    /// A server ready for [`StubServer::serve`], or the bind error.
    pub async fn bind(config: StubConfig) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let tree = Arc::new(Mutex::new(SchemaTree::new()));
        let router = Router::new(tree.clone(), Arc::new(config));
        Ok(Self {
            listener,
            router: Arc::new(router),
            tree,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Serves connections until the task is aborted.
    pub async fn serve(self) -> Result<(), std::io::Error> {
        tracing::info!("IoTDB REST stub listening on http://{}", self.listener.local_addr()?);

        loop {
            let (stream, _) = self.listener.accept().await?;
            let io = TokioIo::new(stream);
            let router = Arc::clone(&self.router);

            tokio::task::spawn(async move {
                let builder = ConnectionBuilder::new(TokioExecutor::new());
                if let Err(err) = builder
                    .serve_connection(
                        io,
                        hyper::service::service_fn(move |req| handle_request(req, router.clone())),
                    )
                    .await
                {
                    tracing::warn!("Error serving connection: {}", err);
                }
            });
        }
    }

    /// Binds and serves in a background task.
    ///
    /// # Arguments
    ///
    /// * `config` - Bind address, accepted credentials and body timeout
    ///
    /// # Returns
    ///
    /// A handle exposing the bound address and the metadata tree. Dropping
    /// the handle stops the server.
    pub async fn spawn(config: StubConfig) -> Result<StubHandle, std::io::Error> {
        let server = Self::bind(config).await?;
        let addr = server.local_addr()?;
        let tree = server.tree.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = server.serve().await {
                tracing::error!("IoTDB REST stub stopped: {}", e);
            }
        });
        Ok(StubHandle { addr, tree, task })
    }
}

/// Running stub. Dropping the handle stops the server.
pub struct StubHandle {
    addr: SocketAddr,
    tree: Arc<Mutex<SchemaTree>>,
    task: JoinHandle<()>,
}

impl StubHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Snapshot of the metadata tree.
    pub fn tree(&self) -> SchemaTree {
        self.tree
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Runs statements directly against the tree, bypassing HTTP.
    pub fn seed(&self, statements: &[&str]) -> crate::Result<()> {
        let mut tree = self
            .tree
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for sql in statements {
            tree.execute(sql)?;
        }
        Ok(())
    }
}

impl Drop for StubHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Handles an incoming HTTP request.
async fn handle_request(
    req: Request<IncomingBody>,
    router: Arc<Router>,
) -> HyperResult<Response<Full<Bytes>>> {
    let response = match router.route(req).await {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!("Error handling request: {}", err);
            Response::from(err)
        }
    };
    Ok(response.map(Full::new))
}
