//! Async TCP server using Tokio.
//!
//! Accepts TCP connections and hands HTTP/1.1 requests either to a plain
//! handler function ([`Server::run`]) or to a [`Dispatcher`] ([`Server::serve`]).
//! Supports HTTP/1.1 persistent connections (keep-alive) out of the box.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, ServerConfig};
use crate::dispatch::Dispatcher;
use crate::http::{
    StatusCode,
    request::{Request, RequestError},
    response::Response,
};

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid server configuration: {0}")]
    Config(#[from] ConfigError),
}

// Per-connection limits copied out of the config.
#[derive(Debug, Clone, Copy)]
struct Limits {
    max_request_size: usize,
    initial_buffer_size: usize,
}

/// The HTTP server.
///
/// # Examples
///
/// ```rust,no_run
/// use reqbind::context::Context;
/// use reqbind::dispatch::Dispatcher;
/// use reqbind::handler::HandlerDescriptor;
/// use reqbind::router::RouteDescriptor;
/// use reqbind::server::Server;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut dispatcher = Dispatcher::new();
///     dispatcher.route(
///         RouteDescriptor::new("/hello-basic"),
///         HandlerDescriptor::raw_body("helloBasic"),
///         |_ctx: Context| async { "ok" },
///     )?;
///
///     Server::bind("127.0.0.1:8080").await?.serve(dispatcher).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    limits: Limits,
}

impl Server {
    /// Binds the server to the given TCP address with default limits.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        Self::with_config(ServerConfig::default().bind_address(addr.as_ref())).await
    }

    /// Binds the server as described by `config`.
    ///
    /// # Errors
    ///
    /// [`ServerError::Config`] if the configuration is invalid,
    /// [`ServerError::Bind`] if the address cannot be bound.
    pub async fn with_config(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let addr = config.bind_address.as_str();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            limits: Limits {
                max_request_size: config.max_request_size,
                initial_buffer_size: config.initial_buffer_size,
            },
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve every request through `dispatcher`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the TCP listener itself fails.
    pub async fn serve(self, dispatcher: Dispatcher) -> Result<(), ServerError> {
        info!(routes = dispatcher.routes().len(), "serving dispatcher");
        let dispatcher = Arc::new(dispatcher);
        self.run(move |request: Request| {
            let dispatcher = Arc::clone(&dispatcher);
            async move { dispatcher.dispatch(request).await }
        })
        .await
    }

    /// Starts accepting connections and dispatching requests to `handler`.
    ///
    /// The handler receives a [`Request`] and must return a [`Future`] that
    /// resolves to a [`Response`]. The handler is wrapped in an [`Arc`] and
    /// shared across all spawned Tokio tasks, so it must be `Send + Sync + 'static`.
    ///
    /// This method runs until the process is terminated or an unrecoverable
    /// listener error occurs.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the TCP listener itself fails.
    pub async fn run<H, F>(self, handler: H) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        let handler = Arc::new(handler);
        info!(address = %self.local_addr, "listening");

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let handler = Arc::clone(&handler);
            let limits = self.limits;

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, handler, limits).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

/// Handles a single TCP connection over its lifetime.
///
/// HTTP/1.1 connections are persistent by default: we loop, reading one
/// request per iteration, until the peer closes the connection or signals
/// `Connection: close`.
async fn handle_connection<H, F>(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    handler: Arc<H>,
    limits: Limits,
) -> Result<(), std::io::Error>
where
    H: Fn(Request) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    let mut buf = BytesMut::with_capacity(limits.initial_buffer_size);

    loop {
        // Pipelined requests may already be buffered.
        if buf.is_empty() && stream.read_buf(&mut buf).await? == 0 {
            debug!(peer = %peer_addr, "connection closed by peer");
            break;
        }

        if buf.len() > limits.max_request_size {
            warn!(peer = %peer_addr, "request too large, sending 413");
            let response = Response::text(StatusCode::PayloadTooLarge, "Request entity too large")
                .keep_alive(false);
            stream.write_all(&response.into_bytes()).await?;
            break;
        }

        let (request, body_offset) = match Request::parse(&buf) {
            Ok(pair) => pair,
            Err(RequestError::Incomplete) => {
                if stream.read_buf(&mut buf).await? == 0 {
                    debug!(peer = %peer_addr, "connection closed mid-request");
                    break;
                }
                continue;
            }
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "bad request, sending 400");
                let response = Response::text(StatusCode::BadRequest, format!("Bad Request: {e}"))
                    .keep_alive(false);
                stream.write_all(&response.into_bytes()).await?;
                break;
            }
        };

        // Wait for the full body to arrive if Content-Length is set.
        let total_needed = body_offset
            .checked_add(request.content_length().unwrap_or(0))
            .filter(|&total| total <= limits.max_request_size);
        let Some(total_needed) = total_needed else {
            warn!(peer = %peer_addr, "declared body too large, sending 413");
            let response = Response::text(StatusCode::PayloadTooLarge, "Request entity too large")
                .keep_alive(false);
            stream.write_all(&response.into_bytes()).await?;
            break;
        };
        if buf.len() < total_needed {
            if stream.read_buf(&mut buf).await? == 0 {
                debug!(peer = %peer_addr, "connection closed mid-body");
                break;
            }
            continue;
        }

        let keep_alive = request.is_keep_alive();

        debug!(
            peer = %peer_addr,
            method = %request.method(),
            path = %request.path(),
            "request received"
        );

        let response = handler(request).await.keep_alive(keep_alive);
        stream.write_all(&response.into_bytes()).await?;
        stream.flush().await?;

        let _ = buf.split_to(total_needed);

        if !keep_alive {
            debug!(peer = %peer_addr, "Connection: close, shutting down");
            break;
        }
    }

    Ok(())
}
