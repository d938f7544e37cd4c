use crate::protocol::{decode_view_command, ViewCommand, ViewEvent};
use axum::{
    extract::ws::{Message, WebSocket},
    extract::{State, WebSocketUpgrade},
    http::Method,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::Notify;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

/// Single-slot frame buffer: a slow view only ever sees the newest frame.
#[derive(Debug)]
pub struct LatestFrame {
    frame: StdMutex<Option<String>>,
    notify: Notify,
}

impl LatestFrame {
    fn new() -> Self {
        Self {
            frame: StdMutex::new(None),
            notify: Notify::new(),
        }
    }

    fn store(&self, payload: String) {
        let mut slot = self.frame.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(payload);
        drop(slot);
        self.notify.notify_one();
    }

    fn take_latest(&self) -> Option<String> {
        self.frame
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    async fn wait_for_update(&self) {
        self.notify.notified().await;
    }
}

struct ViewClient {
    frames: Arc<LatestFrame>,
    notices: UnboundedSender<String>,
}

#[derive(Debug, Serialize)]
struct OkResponse {
    ok: bool,
}

/// Connected local views. Frames are latest-wins, notices are delivered in order.
#[derive(Clone)]
pub struct ViewHub {
    clients: Arc<DashMap<String, ViewClient>>,
    commands: UnboundedSender<ViewCommand>,
}

impl ViewHub {
    pub fn new(commands: UnboundedSender<ViewCommand>) -> Self {
        Self {
            clients: Arc::new(DashMap::new()),
            commands,
        }
    }

    pub fn has_clients(&self) -> bool {
        !self.clients.is_empty()
    }

    pub fn publish_frame(&self, event: &ViewEvent) {
        let Some(payload) = event.to_json() else { return };
        for client in self.clients.iter() {
            client.frames.store(payload.clone());
        }
    }

    pub fn notify(&self, event: &ViewEvent) {
        let Some(payload) = event.to_json() else { return };
        for client in self.clients.iter() {
            let _ = client.notices.send(payload.clone());
        }
    }

    pub fn router(self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET])
            .allow_headers(Any);

        Router::new()
            .route("/api/health", get(health))
            .route("/api/view", get(view_ws_handler))
            .layer(cors)
            .with_state(self)
    }
}

async fn health() -> impl IntoResponse {
    Json(OkResponse { ok: true })
}

async fn view_ws_handler(ws: WebSocketUpgrade, State(hub): State<ViewHub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

pub async fn handle_socket(socket: WebSocket, hub: ViewHub) {
    let (mut sender, mut receiver) = socket.split();
    let client_id = Uuid::new_v4().to_string();
    let frames = Arc::new(LatestFrame::new());
    let (notices_tx, mut notices_rx) = mpsc::unbounded_channel::<String>();
    hub.clients.insert(
        client_id.clone(),
        ViewClient {
            frames: Arc::clone(&frames),
            notices: notices_tx,
        },
    );
    tracing::debug!(client = %client_id, "view connected");

    let send_task = tokio::spawn(async move {
        loop {
            let mut pending = Vec::new();
            tokio::select! {
                Some(payload) = notices_rx.recv() => pending.push(payload),
                _ = frames.wait_for_update() => {}
            }
            while let Ok(payload) = notices_rx.try_recv() {
                pending.push(payload);
            }

            for payload in pending {
                if sender.send(Message::Text(payload)).await.is_err() {
                    return;
                }
            }
            if let Some(payload) = frames.take_latest() {
                if sender.send(Message::Text(payload)).await.is_err() {
                    return;
                }
            }
        }
    });

    while let Some(result) = receiver.next().await {
        let Ok(message) = result else { break };
        match message {
            Message::Text(text) => match decode_view_command(&text) {
                Some(command) => {
                    if hub.commands.send(command).is_err() {
                        break;
                    }
                }
                None => tracing::debug!(client = %client_id, "ignoring malformed view command"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    hub.clients.remove(&client_id);
    send_task.abort();
    tracing::debug!(client = %client_id, "view disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::simulation::GameSummary;

    #[test]
    fn latest_frame_keeps_only_newest() {
        let frames = LatestFrame::new();
        frames.store("one".to_string());
        frames.store("two".to_string());
        assert_eq!(frames.take_latest().as_deref(), Some("two"));
        assert_eq!(frames.take_latest(), None);
    }

    #[tokio::test]
    async fn view_socket_forwards_commands_and_notices() {
        let (commands_tx, mut commands_rx) = mpsc::unbounded_channel();
        let hub = ViewHub::new(commands_tx);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server_hub = hub.clone();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, server_hub.router()).await;
        });

        let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/api/view"))
            .await
            .expect("connect");
        socket
            .send(tokio_tungstenite::tungstenite::Message::Text(
                r#"{"type":"input","heading":0.5,"boost":false}"#.to_string(),
            ))
            .await
            .unwrap();
        let command = tokio::time::timeout(std::time::Duration::from_secs(5), commands_rx.recv())
            .await
            .unwrap();
        assert_eq!(
            command,
            Some(ViewCommand::Input {
                heading: 0.5,
                boost: Some(false)
            })
        );

        assert!(hub.has_clients());
        hub.notify(&ViewEvent::GameOver(GameSummary {
            score: 3,
            kills: 1,
            killer: String::new(),
        }));
        let reply = tokio::time::timeout(std::time::Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(reply.to_text().unwrap()).unwrap();
        assert_eq!(value["type"], "gameOver");
        assert_eq!(value["score"], 3);
        server.abort();
    }
}
