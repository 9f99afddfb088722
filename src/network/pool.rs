// src/network/pool.rs

//! Pool server transport
//!
//! Persistent WebSocket connection carrying the text frames defined in
//! [`crate::network::protocol`]. Knows nothing about session state; the
//! runtime feeds whatever arrives here into the coordination core.
use crate::network::protocol::{ClientMessage, ServerMessage};
use crate::utils::error::MinerError;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tungstenite::protocol::Message;
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open connection to the pool server
pub struct PoolConnection {
    url: String,
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

impl PoolConnection {
    /// Establishes the WebSocket connection
    ///
    /// # Errors
    /// Returns `MinerError` if:
    /// - URL is invalid
    /// - DNS resolution fails
    /// - WebSocket handshake fails
    pub async fn connect(url_str: &str) -> Result<Self, MinerError> {
        let url = Url::parse(url_str)?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            log::warn!(
                "Pool URL '{}' uses non-WebSocket scheme. Consider using 'ws://' or 'wss://'",
                url_str
            );
        }

        match tokio_tungstenite::connect_async(url_str).await {
            Ok((ws_stream, _)) => {
                log::info!("Connected to {}", url_str);
                let (sink, stream) = ws_stream.split();
                Ok(PoolConnection {
                    url: url_str.to_string(),
                    sink,
                    stream,
                })
            }
            Err(e) => {
                if e.to_string().contains("dns error") {
                    Err(MinerError::ConnectionError(format!(
                        "DNS resolution failed. Check pool URL: {}",
                        url_str
                    )))
                } else {
                    Err(e.into())
                }
            }
        }
    }

    /// Server this connection talks to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Writes one message
    pub async fn send(&mut self, message: &ClientMessage) -> Result<(), MinerError> {
        let frame = message.encode();
        log::debug!("-> {}", frame);
        self.sink.send(Message::Text(frame.into())).await?;
        Ok(())
    }

    /// Waits for the next server message
    ///
    /// Returns `None` once the connection is closed. Control frames are
    /// handled internally; undecodable frames come back as `Err` so the
    /// caller can decide whether to keep the connection.
    pub async fn next_message(&mut self) -> Option<Result<ServerMessage, MinerError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => {
                    log::debug!("<- {}", text.as_str());
                    return Some(ServerMessage::decode(text.as_str()));
                }
                Ok(Message::Close(frame)) => {
                    log::info!("Server closed the connection: {:?}", frame);
                    return None;
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    /// Closes the connection politely
    pub async fn close(mut self) {
        if let Err(e) = self.sink.close().await {
            log::debug!("Error while closing connection to {}: {}", self.url, e);
        }
    }
}
