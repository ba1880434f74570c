//! Websocket transport layer
//!
//! Accepts TCP connections, upgrades them to websockets on the configured path
//! and hands each socket to the [`Session`] as a [`Connection`] plus a stream of
//! inbound text frames.

use crate::connection::{Connection, TransportError};
use crate::error::ServerError;
use crate::session::Session;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{future, SinkExt, Stream, StreamExt};
use log::{debug, error, info, warn};
use shared::TICK_PERIOD_MS;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `127.0.0.1:8080`.
    pub addr: String,
    pub tick_period: Duration,
    /// Request path the websocket upgrade is served on.
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
            tick_period: Duration::from_millis(TICK_PERIOD_MS),
            path: "/game".to_string(),
        }
    }
}

/// Outbound half of an accepted websocket.
pub struct WsConnection {
    sink: Mutex<WsSink>,
    peer: SocketAddr,
}

impl WsConnection {
    pub fn new(sink: WsSink, peer: SocketAddr) -> Self {
        Self {
            sink: Mutex::new(sink),
            peer,
        }
    }
}

#[async_trait]
impl Connection for WsConnection {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text.to_owned().into())).await?;
        Ok(())
    }

    async fn close(&self) {
        let mut sink = self.sink.lock().await;
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: String::from("leaving match").into(),
        };
        if let Err(e) = sink.send(Message::Close(Some(frame))).await {
            debug!("Close frame to {} not delivered: {}", self.peer, e);
        }
    }
}

/// Turns the inbound half of a websocket into a stream of text frames.
///
/// Binary and control frames are skipped, a close frame ends the stream and
/// transport failures surface as [`TransportError`].
pub fn inbound(source: WsSource) -> impl Stream<Item = Result<String, TransportError>> + Unpin + Send {
    source
        .take_while(|frame| future::ready(!matches!(frame, Ok(Message::Close(_)))))
        .filter_map(|frame| {
            future::ready(match frame {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(_) => None,
                Err(e) => Some(Err(TransportError::from(e))),
            })
        })
}

/// Websocket server hosting a single match.
pub struct Server {
    listener: TcpListener,
    session: Session,
    path: Arc<str>,
}

impl Server {
    /// Binds the listener and creates an empty match.
    ///
    /// Nothing is accepted until [`Server::run`] is awaited. Bind failures are
    /// returned as [`ServerError::Io`].
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.addr).await?;
        info!(
            "Server listening on ws://{}{}",
            listener.local_addr()?,
            config.path
        );

        Ok(Server {
            listener,
            session: Session::new(config.tick_period),
            path: config.path.into(),
        })
    }

    /// Address actually bound, useful when the configured port was 0.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// The match shared by every accepted connection.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Accepts connections forever, one task per connection.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let session = self.session.clone();
                    let path = Arc::clone(&self.path);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(session, stream, addr, path).await {
                            warn!("Connection from {} failed: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

async fn handle_connection(
    session: Session,
    stream: TcpStream,
    addr: SocketAddr,
    path: Arc<str>,
) -> Result<(), ServerError> {
    debug!("Handshake with {}", addr);
    let websocket = accept_hdr_async(stream, |request: &Request, response: Response| {
        let requested = request.uri().path();
        if requested == &*path {
            Ok(response)
        } else {
            info!("Rejecting {} for unknown path {}", addr, requested);
            let mut rejection = ErrorResponse::new(Some(format!("no game at {}", requested)));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
    })
    .await
    .map_err(TransportError::from)?;

    let (sink, source) = websocket.split();
    let connection = Arc::new(WsConnection::new(sink, addr));
    session.attach(connection, inbound(source)).await;
    debug!("Connection from {} finished", addr);
    Ok(())
}
