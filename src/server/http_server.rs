//! Listening socket, connection tasks and graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use crate::parser::parse_request;
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::handler::StaticHandler;
use crate::server::logging::LogSinks;
use crate::server::response::{HttpResponse, StatusCode};

/// A bound, not yet accepting, static file server.
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    handler: Arc<StaticHandler>,
}

impl HttpServer {
    /// Bind the listening socket described by `config`.
    ///
    /// A bind failure is final; there is no retry.
    pub async fn bind(config: ServerConfig) -> Result<Self, Error> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;
        let handler = Arc::new(StaticHandler::from_config(&config));

        Ok(Self {
            config,
            listener,
            local_addr,
            handler,
        })
    }

    /// The address actually bound, useful when the port was 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Log the startup line and start accepting connections in the background.
    pub fn spawn(self) -> ServerHandle {
        self.config.logs.info(format!(
            "listening on {addr}, (user={user}, timeout={timeout}, directory={root})",
            addr = self.local_addr,
            user = self.config.credentials.username,
            timeout = humantime::format_duration(self.config.read_timeout),
            root = self.config.root.display(),
        ));

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let local_addr = self.local_addr;
        let logs = self.config.logs.clone();
        let accept_task = tokio::spawn(self.accept_loop(shutdown_rx));

        ServerHandle {
            local_addr,
            shutdown_tx,
            accept_task,
            logs,
        }
    }

    /// Accept connections until told to stop, then hand back the connection
    /// tasks still running.
    async fn accept_loop(self, mut shutdown_rx: oneshot::Receiver<()>) -> JoinSet<()> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                // A dropped handle also stops the server.
                _ = &mut shutdown_rx => {
                    info!("Shutting down server...");
                    break;
                }

                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => {
                            self.handle_new_connection(socket, addr, semaphore.clone(), &mut tasks).await;
                        }
                        Err(e) => {
                            if Self::handle_connection_error(e).await {
                                break;
                            }
                        }
                    }
                }

                // Reap finished connections so the set does not grow unbounded.
                Some(res) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = res {
                        error!("Connection task failed: {e}");
                    }
                }
            }
        }

        tasks
    }

    /// Spawn a task for a freshly accepted connection.
    async fn handle_new_connection(
        &self,
        mut socket: TcpStream,
        addr: SocketAddr,
        semaphore: Arc<Semaphore>,
        tasks: &mut JoinSet<()>,
    ) {
        let permit = match semaphore.try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Connection limit reached, rejecting connection from {addr}");
                let response = HttpResponse::new(StatusCode::ServiceUnavailable)
                    .with_content_type("text/plain")
                    .with_body_string("Server is at capacity, please try again later");
                if let Err(e) = response.write_to(&mut socket).await {
                    debug!("Failed to reject connection from {addr}: {e}");
                }
                return;
            }
        };
        debug!("Connection from {addr}");

        let handler = self.handler.clone();
        let read_timeout = self.config.read_timeout;
        let read_buffer_size = self.config.read_buffer_size;

        tasks.spawn(async move {
            // Released when the connection is done.
            let _permit = permit;

            if let Err(e) = Self::handle_connection(&mut socket, &handler, read_timeout, read_buffer_size).await {
                match e {
                    Error::ParseError(_) | Error::HeadTooLarge(_) => debug!("Bad request from {addr}: {e}"),
                    _ => warn!("Error handling connection from {addr}: {e}"),
                }
            }
        });
    }

    /// Decide whether an accept error should stop the server.
    async fn handle_connection_error(e: std::io::Error) -> bool {
        error!("Error accepting connection: {e}");

        if e.kind() == std::io::ErrorKind::BrokenPipe {
            error!("Critical error accepting connection, shutting down");
            return true;
        }

        // Typically out of file descriptors; back off before retrying.
        tokio::time::sleep(Duration::from_millis(100)).await;
        false
    }

    /// Serve the single request carried by a connection.
    ///
    /// Reading the request head is bounded by `read_timeout`; a client that
    /// is too slow or closes early is dropped without a response.
    pub async fn handle_connection<S>(
        socket: &mut S,
        handler: &StaticHandler,
        read_timeout: Duration,
        read_buffer_size: usize,
    ) -> Result<(), Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let head = match tokio::time::timeout(read_timeout, read_request_head(socket, read_buffer_size)).await {
            Ok(head) => head,
            Err(_) => {
                debug!("Timed out after {read_timeout:?} waiting for a request");
                return Ok(());
            }
        };

        let head = match head {
            Ok(Some(head)) => head,
            Ok(None) => return Ok(()), // Connection closed
            Err(Error::HeadTooLarge(size)) => {
                let response = HttpResponse::new(StatusCode::BadRequest)
                    .with_content_type("text/plain")
                    .with_body_string("Request header too large");
                response.write_to(socket).await?;
                return Err(Error::HeadTooLarge(size));
            }
            Err(e) => return Err(e),
        };

        let request = match parse_request(&head) {
            Ok(req) => req,
            Err(e) => {
                let response = HttpResponse::new(StatusCode::BadRequest)
                    .with_content_type("text/plain")
                    .with_body_string(format!("Error parsing request: {e}"));
                response.write_to(socket).await?;
                return Err(Error::ParseError(e));
            }
        };

        handler.serve(&request, socket).await?;
        socket.shutdown().await?;
        Ok(())
    }
}

/// Read until the blank line ending the request head.
///
/// Returns `None` if the peer closed before sending anything, and whatever
/// arrived if it closed in the middle of the head.
async fn read_request_head<S>(socket: &mut S, limit: usize) -> Result<Option<Vec<u8>>, Error>
where
    S: AsyncRead + Unpin,
{
    let mut head = Vec::with_capacity(limit.min(8192));
    let mut buf = vec![0; limit.min(8192)];

    loop {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(if head.is_empty() { None } else { Some(head) });
        }
        head.extend_from_slice(&buf[..n]);

        if let Some(end) = head_end(&head) {
            head.truncate(end);
            return Ok(Some(head));
        }
        if head.len() >= limit {
            return Err(Error::HeadTooLarge(head.len()));
        }
    }
}

/// Position just past the `\r\n\r\n` (or bare `\n\n`) terminating the head.
fn head_end(data: &[u8]) -> Option<usize> {
    let crlf = data.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4);
    let lf = data.windows(2).position(|w| w == b"\n\n").map(|i| i + 2);
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// A running server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    accept_task: JoinHandle<JoinSet<()>>,
    logs: LogSinks,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait up to `deadline` for the ones in
    /// flight to finish.
    ///
    /// In-flight requests are never cancelled. If some are still running
    /// when the deadline passes they are left to finish on their own and
    /// [`Error::ShutdownTimeout`] is returned.
    pub async fn shutdown(self, deadline: Duration) -> Result<(), Error> {
        let deadline = tokio::time::Instant::now() + deadline;

        // The accept loop may already be gone, in which case there is
        // nobody left to notify.
        let _ = self.shutdown_tx.send(());
        let mut tasks = self
            .accept_task
            .await
            .map_err(|e| Error::InternalError(format!("accept loop failed: {e}")))?;

        info!("Waiting for {len} active connections to complete...", len = tasks.len());
        let drained = tokio::time::timeout_at(deadline, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await;

        match drained {
            Ok(()) => {
                self.logs.info("server successfully stopped");
                Ok(())
            }
            Err(_) => {
                let outstanding = tasks.len();
                tasks.detach_all();
                Err(Error::ShutdownTimeout { outstanding })
            }
        }
    }
}
