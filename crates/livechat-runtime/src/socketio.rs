//! Socket.IO client transport
//!
//! Speaks Engine.IO v4 directly over a WebSocket, skipping the HTTP
//! long-polling upgrade dance. The handshake is: WebSocket open, Engine.IO
//! `open` packet from the server, namespace connect (`40`) from us, namespace
//! ack from the server. Heartbeat pings are answered inside `recv`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use livechat_core::wire::{decode_frame, EnginePacket, Handshake, SocketPacket};
use livechat_core::{ClientEvent, ServerEvent, SessionConfig};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Result, RuntimeError};
use crate::transport::{ConnectInfo, Transport};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build the Engine.IO WebSocket endpoint for a server base URL
///
/// `http`/`https` map to `ws`/`wss`; the path is replaced by `socket_path`.
pub fn engine_url(server_url: &str, socket_path: &str) -> Result<Url> {
    let mut url = Url::parse(server_url)?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(RuntimeError::handshake(format!(
                "unsupported URL scheme {:?}",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| RuntimeError::handshake("cannot switch URL to a WebSocket scheme"))?;

    url.set_path(socket_path);
    url.query_pairs_mut()
        .clear()
        .append_pair("EIO", &livechat_core::wire::ENGINE_IO_VERSION.to_string())
        .append_pair("transport", "websocket");
    Ok(url)
}

/// WebSocket-only Socket.IO client
pub struct SocketIoTransport {
    url: Url,
    connect_timeout: Duration,
    stream: Option<WsStream>,
    handshake: Option<Handshake>,
}

impl SocketIoTransport {
    pub fn new(config: &SessionConfig) -> Result<Self> {
        Ok(Self {
            url: engine_url(&config.server_url, &config.socket_path)?,
            connect_timeout: config.connect_timeout,
            stream: None,
            handshake: None,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Engine.IO handshake of the current connection
    pub fn handshake(&self) -> Option<&Handshake> {
        self.handshake.as_ref()
    }

    /// Longest silence tolerated before the connection is considered dead
    fn liveness_window(&self) -> Option<Duration> {
        self.handshake.as_ref().map(|handshake| {
            Duration::from_millis(handshake.ping_interval.saturating_add(handshake.ping_timeout))
        })
    }

    async fn open(url: &Url) -> Result<(WsStream, Handshake, Option<String>)> {
        debug!("Opening WebSocket to {}", url);
        let (mut stream, _) = connect_async(url.as_str()).await?;

        let handshake = loop {
            match next_packet(&mut stream).await? {
                EnginePacket::Open(handshake) => break handshake,
                EnginePacket::Ping(data) => send_packet(&mut stream, &EnginePacket::Pong(data)).await?,
                other => {
                    return Err(RuntimeError::handshake(format!(
                        "expected open packet, got {:?}",
                        other
                    )))
                }
            }
        };
        debug!(
            "Engine.IO open: sid={} ping_interval={}ms",
            handshake.sid, handshake.ping_interval
        );

        send_packet(
            &mut stream,
            &EnginePacket::Message(SocketPacket::Connect { sid: None }),
        )
        .await?;

        let namespace_sid = loop {
            match next_packet(&mut stream).await? {
                EnginePacket::Message(SocketPacket::Connect { sid }) => break sid,
                EnginePacket::Message(SocketPacket::ConnectError { reason }) => {
                    return Err(RuntimeError::handshake(reason));
                }
                EnginePacket::Ping(data) => send_packet(&mut stream, &EnginePacket::Pong(data)).await?,
                EnginePacket::Noop => {}
                other => {
                    return Err(RuntimeError::handshake(format!(
                        "expected namespace connect, got {:?}",
                        other
                    )))
                }
            }
        };

        Ok((stream, handshake, namespace_sid))
    }
}

#[async_trait]
impl Transport for SocketIoTransport {
    async fn connect(&mut self) -> Result<ConnectInfo> {
        self.close().await?;

        let connect_timeout = self.connect_timeout;
        let (stream, handshake, namespace_sid) = timeout(connect_timeout, Self::open(&self.url))
            .await
            .map_err(|_| RuntimeError::Timeout(connect_timeout))??;

        info!("Connected to {}", self.url);
        let session_id = namespace_sid.or_else(|| Some(handshake.sid.clone()));
        self.stream = Some(stream);
        self.handshake = Some(handshake);
        Ok(ConnectInfo { session_id })
    }

    async fn recv(&mut self) -> Result<Option<ServerEvent>> {
        let window = self.liveness_window();
        let Some(stream) = self.stream.as_mut() else {
            return Err(RuntimeError::Closed);
        };

        loop {
            let next = match window {
                Some(window) => timeout(window, stream.next())
                    .await
                    .map_err(|_| RuntimeError::Timeout(window))?,
                None => stream.next().await,
            };

            let frame = match next {
                Some(Ok(Message::Text(frame))) => frame,
                Some(Ok(Message::Close(_))) | None => {
                    debug!("WebSocket closed by server");
                    return Ok(None);
                }
                Some(Ok(_)) => continue,
                Some(Err(error)) => return Err(error.into()),
            };

            let packet = match decode_frame(&frame) {
                Ok(packet) => packet,
                Err(error) => {
                    warn!("Skipping undecodable frame: {}", error);
                    continue;
                }
            };

            match packet {
                EnginePacket::Ping(data) => {
                    stream.send(Message::Text(EnginePacket::Pong(data).encode()?)).await?;
                }
                EnginePacket::Message(SocketPacket::Event { name, args }) => {
                    match ServerEvent::from_event(name, args) {
                        Some(ServerEvent::Other { .. }) | None => {}
                        Some(event) => return Ok(Some(event)),
                    }
                }
                EnginePacket::Message(SocketPacket::Disconnect) | EnginePacket::Close => {
                    debug!("Server ended the session");
                    return Ok(None);
                }
                other => debug!("Ignoring packet {:?}", other),
            }
        }
    }

    async fn send(&mut self, event: ClientEvent) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(RuntimeError::Closed)?;
        debug!("Sending {} event", event.name());
        stream.send(Message::Text(event.encode()?)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.handshake = None;
        if let Some(mut stream) = self.stream.take() {
            // Best effort: the peer may already be gone
            if let Err(error) = stream.close(None).await {
                debug!("Error while closing WebSocket: {}", error);
            }
        }
        Ok(())
    }
}

async fn next_packet(stream: &mut WsStream) -> Result<EnginePacket> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(frame))) => return Ok(decode_frame(&frame)?),
            Some(Ok(Message::Close(_))) | None => return Err(RuntimeError::Closed),
            Some(Ok(_)) => continue,
            Some(Err(error)) => return Err(error.into()),
        }
    }
}

async fn send_packet(stream: &mut WsStream, packet: &EnginePacket) -> Result<()> {
    stream.send(Message::Text(packet.encode()?)).await?;
    Ok(())
}
