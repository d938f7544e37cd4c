pub mod directory;
pub mod peer_link;
pub mod ws_session;

use crate::session::SessionError;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Everything a peer link reports back. Delivered through one queue and applied between ticks.
#[derive(Debug)]
pub enum TransportEvent {
    Opened {
        peer_id: String,
        outbound: UnboundedSender<String>,
    },
    Data {
        peer_id: String,
        text: String,
    },
    Closed {
        peer_id: String,
    },
    Error {
        peer_id: String,
        message: String,
    },
}

/// Open peer connections, keyed by remote peer id.
pub struct SessionTransport {
    state: ConnectionState,
    connections: HashMap<String, UnboundedSender<String>>,
    events: UnboundedSender<TransportEvent>,
    listener: Option<JoinHandle<()>>,
}

impl SessionTransport {
    pub fn new(events: UnboundedSender<TransportEvent>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            connections: HashMap::new(),
            events,
            listener: None,
        }
    }

    pub fn channel() -> (UnboundedSender<TransportEvent>, UnboundedReceiver<TransportEvent>) {
        tokio::sync::mpsc::unbounded_channel()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[cfg(test)]
    pub fn peer_ids(&self) -> impl Iterator<Item = &String> {
        self.connections.keys()
    }

    #[cfg(test)]
    pub fn is_open(&self, peer_id: &str) -> bool {
        self.connections.contains_key(peer_id)
    }

    /// Starts accepting peers on `bind`. Returns the bound address.
    pub async fn listen(&mut self, bind: SocketAddr) -> Result<SocketAddr, SessionError> {
        self.state = ConnectionState::Connecting;
        match peer_link::serve_peers(bind, self.events.clone()).await {
            Ok((addr, handle)) => {
                self.listener = Some(handle);
                self.state = ConnectionState::Connected;
                Ok(addr)
            }
            Err(error) => {
                self.state = ConnectionState::Disconnected;
                Err(error)
            }
        }
    }

    /// Opens a link to `peer_id` at `url`, failing if the handshake does not finish within `timeout`.
    pub async fn connect(
        &mut self,
        peer_id: &str,
        url: &str,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        self.state = ConnectionState::Connecting;
        match peer_link::dial_peer(peer_id, url, timeout, self.events.clone()).await {
            Ok(outbound) => {
                self.connections.insert(peer_id.to_string(), outbound);
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(error) => {
                self.state = ConnectionState::Disconnected;
                Err(error)
            }
        }
    }

    pub fn register(&mut self, peer_id: String, outbound: UnboundedSender<String>) {
        self.connections.insert(peer_id, outbound);
    }

    /// Forgets a closed connection. Returns false if it was not tracked.
    pub fn remove(&mut self, peer_id: &str) -> bool {
        let removed = self.connections.remove(peer_id).is_some();
        if self.listener.is_none() && self.connections.is_empty() {
            self.state = ConnectionState::Disconnected;
        }
        removed
    }

    pub fn send(&self, peer_id: &str, payload: String) {
        if let Some(outbound) = self.connections.get(peer_id) {
            let _ = outbound.send(payload);
        }
    }

    /// Best-effort fan-out. Closed links drop the message silently.
    pub fn broadcast(&self, payload: &str, exclude: Option<&str>) {
        for (peer_id, outbound) in &self.connections {
            if Some(peer_id.as_str()) == exclude {
                continue;
            }
            let _ = outbound.send(payload.to_string());
        }
    }

    /// Drops every link and stops accepting. Link tasks close their sockets once their queue closes.
    pub fn close(&mut self) {
        self.connections.clear();
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.state = ConnectionState::Disconnected;
    }
}

impl Drop for SessionTransport {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn broadcast_skips_excluded_peer() {
        let (events, _rx) = SessionTransport::channel();
        let mut transport = SessionTransport::new(events);
        let (a_tx, mut a_rx) = mpsc::unbounded_channel();
        let (b_tx, mut b_rx) = mpsc::unbounded_channel();
        transport.register("a".to_string(), a_tx);
        transport.register("b".to_string(), b_tx);

        transport.broadcast("hello", Some("a"));
        assert!(a_rx.try_recv().is_err());
        assert_eq!(b_rx.try_recv().ok().as_deref(), Some("hello"));
    }

    #[test]
    fn closed_links_are_ignored() {
        let (events, _rx) = SessionTransport::channel();
        let mut transport = SessionTransport::new(events);
        let (tx, rx) = mpsc::unbounded_channel();
        transport.register("gone".to_string(), tx);
        drop(rx);
        transport.broadcast("hello", None);
        transport.send("gone", "again".to_string());
        transport.send("unknown", "again".to_string());
        assert!(transport.remove("gone"));
        assert!(!transport.remove("gone"));
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn close_resets_state() {
        let (events, _rx) = SessionTransport::channel();
        let mut transport = SessionTransport::new(events);
        let addr = transport
            .listen("127.0.0.1:0".parse().unwrap())
            .await
            .expect("listener should bind");
        assert_ne!(addr.port(), 0);
        assert_eq!(transport.state(), ConnectionState::Connected);
        transport.close();
        assert_eq!(transport.state(), ConnectionState::Disconnected);
        assert_eq!(transport.peer_ids().count(), 0);
    }
}
