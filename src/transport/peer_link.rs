use super::TransportEvent;
use crate::session::SessionError;
use crate::shared::room_token::new_endpoint_id;
use axum::{
    extract::ws::{Message, WebSocket},
    extract::{Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite};

#[derive(Clone)]
struct PeerAcceptor {
    events: UnboundedSender<TransportEvent>,
}

#[derive(Debug, Deserialize)]
struct PeerQuery {
    peer: Option<String>,
}

/// Binds the host endpoint and serves `/peer` websocket upgrades from joining guests.
pub async fn serve_peers(
    bind: SocketAddr,
    events: UnboundedSender<TransportEvent>,
) -> Result<(SocketAddr, JoinHandle<()>), SessionError> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|error| SessionError::Bind(error.to_string()))?;
    let addr = listener
        .local_addr()
        .map_err(|error| SessionError::Bind(error.to_string()))?;

    let app = Router::new()
        .route("/peer", get(peer_ws_handler))
        .with_state(PeerAcceptor { events });

    let handle = tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, app).await {
            tracing::warn!(?error, "peer listener stopped");
        }
    });
    tracing::info!(%addr, "accepting peers");
    Ok((addr, handle))
}

async fn peer_ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<PeerQuery>,
    State(acceptor): State<PeerAcceptor>,
) -> impl IntoResponse {
    let peer_id = query
        .peer
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(new_endpoint_id);
    ws.on_upgrade(move |socket| accept_peer(socket, peer_id, acceptor.events))
}

async fn accept_peer(socket: WebSocket, peer_id: String, events: UnboundedSender<TransportEvent>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let opened = TransportEvent::Opened {
        peer_id: peer_id.clone(),
        outbound: tx,
    };
    if events.send(opened).is_err() {
        return;
    }

    let send_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if sender.send(Message::Text(payload)).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let _ = events.send(TransportEvent::Data {
                    peer_id: peer_id.clone(),
                    text,
                });
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(error) => {
                let _ = events.send(TransportEvent::Error {
                    peer_id: peer_id.clone(),
                    message: error.to_string(),
                });
                break;
            }
        }
    }

    let _ = events.send(TransportEvent::Closed { peer_id });
    send_task.abort();
}

/// Connects to a host's `/peer` endpoint. Returns the outbound queue once the handshake completes.
pub async fn dial_peer(
    peer_id: &str,
    url: &str,
    timeout: Duration,
    events: UnboundedSender<TransportEvent>,
) -> Result<UnboundedSender<String>, SessionError> {
    let (stream, _) = match tokio::time::timeout(timeout, connect_async(url)).await {
        Ok(Ok(connected)) => connected,
        Ok(Err(error)) => return Err(SessionError::Connect(error.to_string())),
        Err(_) => return Err(SessionError::Timeout),
    };
    tracing::info!(peer = %peer_id, "connected to host");

    let (mut sender, mut receiver) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let peer_id = peer_id.to_string();

    let send_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if sender.send(tungstenite::Message::Text(payload)).await.is_err() {
                return;
            }
        }
        let _ = sender.send(tungstenite::Message::Close(None)).await;
    });

    tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(tungstenite::Message::Text(text)) => {
                    let _ = events.send(TransportEvent::Data {
                        peer_id: peer_id.clone(),
                        text,
                    });
                }
                Ok(tungstenite::Message::Close(_)) => break,
                Ok(_) => {}
                Err(error) => {
                    let _ = events.send(TransportEvent::Error {
                        peer_id: peer_id.clone(),
                        message: error.to_string(),
                    });
                    break;
                }
            }
        }
        let _ = events.send(TransportEvent::Closed { peer_id });
        send_task.abort();
    });

    Ok(tx)
}
