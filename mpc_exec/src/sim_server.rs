//! # Simulator server
//!
//! The simulator connects over a WebSocket on the configured port. The same port answers plain
//! HTTP requests with a static page at `/` (and an empty body anywhere else), so the server first
//! peeks at the request head to decide which it is dealing with.
//!
//! Each WebSocket session gets its own [`SessionGateway`] and so its own optimizer. Frames are read
//! and processed in order by the session's reader loop. Replies are queued, in that same order, to
//! a writer task which waits for each reply's release deadline before sending it. The actuation
//! latency therefore never stalls the reader, nor any other session, while still guaranteeing no
//! command goes out early and replies keep their order.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::mpsc,
    time::{sleep, timeout, Instant},
};
use tokio_tungstenite::tungstenite::{self, Message};

use comms_if::net::NetParams;

use crate::{
    gateway::{GatewayParams, Reply, SessionGateway},
    mpc_ctrl::{LatencyModel, OptimizerFactory},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Page served at the root path.
pub const ROOT_PAGE: &str = "<h1>Hello world!</h1>";

/// Largest request head that will be inspected.
const MAX_HEAD_LEN: usize = 8192;

/// Time allowed for a client to send its request head.
const HEAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between peeks while waiting for the rest of a request head.
const HEAD_POLL_INTERVAL: Duration = Duration::from_millis(5);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Everything needed to start a new session.
#[derive(Clone)]
pub struct SessionConfig {
    /// Builds the optimizer owned by each session
    pub optimizer_factory: OptimizerFactory,

    pub latency: LatencyModel,

    pub gateway: GatewayParams,
}

/// The simulator server.
pub struct SimServer {
    listener: TcpListener,

    config: Arc<SessionConfig>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimServerError {
    #[error("Could not listen on {0}: {1}")]
    BindError(String, std::io::Error),

    #[error("Connection I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocketError(#[from] tungstenite::Error),

    #[error("The client closed the connection before sending a request")]
    ClosedBeforeRequest,

    #[error("The client did not send a complete request head in time")]
    HeadTimeout,
}

/// What a peeked request asks for.
#[derive(Debug, PartialEq)]
enum RequestKind {
    /// A WebSocket upgrade
    Upgrade,

    /// A plain HTTP request for the given target
    Http { target: String, head_len: usize },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimServer {
    /// Bind the server to the endpoint in the network parameters.
    pub async fn bind(params: &NetParams, config: SessionConfig) -> Result<Self, SimServerError> {
        let endpoint = params.endpoint();
        let listener = TcpListener::bind(&endpoint)
            .await
            .map_err(|e| SimServerError::BindError(endpoint, e))?;

        Ok(Self {
            listener,
            config: Arc::new(config),
        })
    }

    /// The address the server is listening on.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the listener fails.
    pub async fn run(self) -> Result<(), SimServerError> {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(c) => c,
                Err(e) => {
                    warn!("Could not accept a connection: {}", e);
                    continue;
                }
            };

            let config = self.config.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer, config).await {
                    warn!("Connection from {} ended with error: {}", peer, e);
                }
            });
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    config: Arc<SessionConfig>,
) -> Result<(), SimServerError> {
    let head = peek_request_head(&stream, HEAD_TIMEOUT).await?;

    match classify_request(&head) {
        RequestKind::Upgrade => run_session(stream, peer, &config).await,
        RequestKind::Http { target, head_len } => serve_http(stream, &target, head_len).await,
    }
}

/// Peek at the start of the stream until a whole request head is visible.
///
/// The peeked bytes are left in the stream. Fails with [`SimServerError::HeadTimeout`] if the
/// head is not complete within `limit`, including when the client sends nothing at all.
async fn peek_request_head(
    stream: &TcpStream,
    limit: Duration,
) -> Result<Vec<u8>, SimServerError> {
    let mut buf = vec![0u8; MAX_HEAD_LEN];

    let n = timeout(limit, peek_until_head_end(stream, &mut buf))
        .await
        .map_err(|_| SimServerError::HeadTimeout)??;

    buf.truncate(n);
    Ok(buf)
}

async fn peek_until_head_end(
    stream: &TcpStream,
    buf: &mut [u8],
) -> Result<usize, SimServerError> {
    loop {
        let n = stream.peek(buf).await?;
        if n == 0 {
            return Err(SimServerError::ClosedBeforeRequest);
        }

        if head_end(&buf[..n]).is_some() || n == buf.len() {
            return Ok(n);
        }

        sleep(HEAD_POLL_INTERVAL).await;
    }
}

/// Length of the request head, including the blank line which ends it.
fn head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|p| p + 4)
}

/// Classify a peeked request head.
///
/// Lengths are taken from the raw bytes, the text is only decoded to read the target and headers.
fn classify_request(head: &[u8]) -> RequestKind {
    let head_len = head_end(head).unwrap_or(head.len());
    let text = String::from_utf8_lossy(&head[..head_len]);
    let mut lines = text.split("\r\n");

    let target = lines
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    let upgrade = lines
        .take_while(|l| !l.is_empty())
        .filter_map(|l| l.split_once(':'))
        .any(|(name, value)| {
            name.trim().eq_ignore_ascii_case("upgrade")
                && value.trim().eq_ignore_ascii_case("websocket")
        });

    if upgrade {
        RequestKind::Upgrade
    } else {
        RequestKind::Http { target, head_len }
    }
}

/// The static HTTP response for a request target.
fn http_response(target: &str) -> String {
    let body = if target == "/" { ROOT_PAGE } else { "" };

    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\
         Connection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

async fn serve_http(
    mut stream: TcpStream,
    target: &str,
    head_len: usize,
) -> Result<(), SimServerError> {
    // Drain the head we peeked at before replying
    let mut head = vec![0u8; head_len];
    stream.read_exact(&mut head).await?;

    debug!("HTTP request for {}", target);

    stream.write_all(http_response(target).as_bytes()).await?;
    stream.shutdown().await?;

    Ok(())
}

async fn run_session(
    stream: TcpStream,
    peer: SocketAddr,
    config: &SessionConfig,
) -> Result<(), SimServerError> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    info!("Connected: {}", peer);

    let (mut sink, mut source) = ws.split();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Reply>();

    // Replies are sent in queue order, each no earlier than its release deadline
    let writer = tokio::spawn(async move {
        while let Some(reply) = reply_rx.recv().await {
            let frame = reply.released().await;
            sink.send(Message::Text(frame)).await?;
        }
        sink.close().await
    });

    let mut gateway = SessionGateway::new(
        (config.optimizer_factory)(),
        config.latency,
        config.gateway.clone(),
    );

    while let Some(msg) = source.next().await {
        let arrival = Instant::now();

        let text = match msg {
            Ok(Message::Text(t)) => t,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("Receive error from {}: {}", peer, e);
                break;
            }
        };

        match gateway.handle_text(&text, arrival) {
            Ok(Some(reply)) => {
                if reply_tx.send(reply).is_err() {
                    warn!("Writer for {} has stopped, closing session", peer);
                    break;
                }
            }
            Ok(None) => (),
            Err(e) => warn!("Dropping event from {}: {}", peer, e),
        }
    }

    // Let any in-flight commands complete before closing
    drop(reply_tx);
    let result = match writer.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(tungstenite::Error::ConnectionClosed))
        | Ok(Err(tungstenite::Error::AlreadyClosed)) => Ok(()),
        Ok(Err(e)) => Err(e.into()),
        Err(e) => {
            warn!("Writer task for {} failed: {}", peer, e);
            Ok(())
        }
    };

    info!(
        "Disconnected: {} ({} commands sent, {} solves)",
        peer,
        gateway.num_commands(),
        gateway.num_solves()
    );

    result
}
