//! WebSocket relay client.
//!
//! A `tokio-tungstenite` WebSocket connection exchanging JSON text frames
//! with the relay server, plus an optional artificial send delay
//! (`fake_ping_ms`) useful for exercising `client::predictor` reconciliation
//! against realistic latency locally.

use futures_util::{SinkExt, StreamExt};
use shared::protocol::{Ack, ClientMessage, ServerMessage};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::ClientError;

/// A "world event" the core emits for an external renderer to consume.
/// Wraps both broadcast traffic and direct request acks over the same
/// connection.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    Message(ServerMessage),
    Ack(Ack),
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A connected relay session: a sender half for outbound `ClientMessage`s
/// and a receiver half for inbound `ServerEvent`s, with an optional
/// artificial send delay for local netcode testing.
pub struct RelayClient {
    outbound: UnboundedSender<Message>,
    fake_ping_ms: u64,
}

impl RelayClient {
    /// Connects to `url` (e.g. `ws://127.0.0.1:8080/ws`) and spawns the
    /// reader/writer tasks. Returns the client handle plus the event
    /// receiver the caller drains for world events.
    pub async fn connect(url: &str, fake_ping_ms: u64) -> Result<(Self, UnboundedReceiver<ServerEvent>), ClientError> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ClientError::Connect(e.to_string()))?;
        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        let (out_tx, mut out_rx) = unbounded_channel::<Message>();
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                if ws_tx.send(msg).await.is_err() {
                    break;
                }
            }
        });

        let (event_tx, event_rx) = unbounded_channel::<ServerEvent>();
        tokio::spawn(async move {
            while let Some(Ok(msg)) = ws_rx.next().await {
                let Message::Text(text) = msg else { continue };
                if let Ok(server_msg) = serde_json::from_str::<ServerMessage>(&text) {
                    let _ = event_tx.send(ServerEvent::Message(server_msg));
                } else if let Ok(ack) = serde_json::from_str::<Ack>(&text) {
                    let _ = event_tx.send(ServerEvent::Ack(ack));
                } else {
                    log::warn!("unparseable frame from relay: {text}");
                }
            }
        });

        Ok((Self { outbound: out_tx, fake_ping_ms }, event_rx))
    }

    /// Sends a request to the relay. If `fake_ping_ms > 0` the send is
    /// deferred on its own task rather than blocking the caller, to
    /// simulate latency.
    pub async fn send(&self, msg: &ClientMessage) -> Result<(), ClientError> {
        let text = serde_json::to_string(msg)?;
        if self.fake_ping_ms == 0 {
            self.outbound.send(Message::Text(text)).map_err(|_| ClientError::TransportClosed)?;
            return Ok(());
        }
        let outbound = self.outbound.clone();
        let delay = self.fake_ping_ms;
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            let _ = outbound.send(Message::Text(text));
        });
        Ok(())
    }

    pub async fn create_room(&self, room_id: impl Into<String>, settings: shared::protocol::RoomSettings) -> Result<(), ClientError> {
        self.send(&ClientMessage::CreateRoom { room_id: room_id.into(), settings }).await
    }

    pub async fn join_room(&self, room_id: impl Into<String>, name: impl Into<String>) -> Result<(), ClientError> {
        self.send(&ClientMessage::JoinRoom { room_id: room_id.into(), name: name.into() }).await
    }

    pub async fn set_ready(&self, ready: bool) -> Result<(), ClientError> {
        self.send(&ClientMessage::SetReady { ready }).await
    }

    pub async fn start_game(&self) -> Result<(), ClientError> {
        self.send(&ClientMessage::StartGame).await
    }

    pub async fn send_input(&self, frame: shared::protocol::InputFrame) -> Result<(), ClientError> {
        self.send(&ClientMessage::Input(frame)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_event_wraps_both_message_and_ack_variants() {
        let msg = ServerEvent::Message(ServerMessage::RoomClosed);
        let ack = ServerEvent::Ack(Ack::StartGame { ok: true, error: None });
        assert!(matches!(msg, ServerEvent::Message(_)));
        assert!(matches!(ack, ServerEvent::Ack(_)));
    }
}
