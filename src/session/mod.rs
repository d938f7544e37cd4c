//! Multiplayer session lifecycle.
//!
//! A session is either hosting (accepting guests and owning the food and power-up layout)
//! or joined to a host. Transport events and update-timer ticks land on one queue,
//! [`SessionEvents`], which the driver drains between simulation ticks.

mod error;
mod sync;
pub mod timer;

pub use error::SessionError;
pub use sync::SessionNotice;

use crate::game::remote::RemotePlayer;
use crate::game::types::Skin;
use crate::protocol::{self, WireMessage};
use crate::shared::room_token::{derive_room_token, new_endpoint_id};
use crate::transport::directory::{Directory, PeerRecord};
use crate::transport::{SessionTransport, TransportEvent};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;
use timer::{UpdateKind, UpdateTimer};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Guest,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub peer_bind: SocketAddr,
    pub advertise_host: String,
    pub join_timeout: Duration,
    pub player_update_period: Duration,
    pub game_state_period: Duration,
    pub max_update_segments: usize,
    pub remote_timeout: Duration,
}

#[derive(Debug)]
pub enum SessionEvent {
    Transport(TransportEvent),
    UpdateDue(UpdateKind),
}

/// Receiving half of the session queue.
pub struct SessionEvents {
    transport: UnboundedReceiver<TransportEvent>,
    timer: UnboundedReceiver<UpdateKind>,
}

impl SessionEvents {
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        tokio::select! {
            Some(event) = self.transport.recv() => Some(SessionEvent::Transport(event)),
            Some(kind) = self.timer.recv() => Some(SessionEvent::UpdateDue(kind)),
            else => None,
        }
    }
}

/// Name and skin this peer announces to others.
#[derive(Debug, Clone)]
struct LocalIdentity {
    name: String,
    skin: Skin,
}

pub struct Session {
    config: SessionConfig,
    directory: Directory,
    transport: SessionTransport,
    timer_tx: UnboundedSender<UpdateKind>,
    timer: Option<UpdateTimer>,
    role: Option<Role>,
    endpoint_id: Option<String>,
    host_peer: Option<String>,
    token: Option<String>,
    local: LocalIdentity,
    remote_players: BTreeMap<String, RemotePlayer>,
}

impl Session {
    pub fn new(config: SessionConfig, directory: Directory) -> (Self, SessionEvents) {
        let (transport_tx, transport_rx) = SessionTransport::channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let session = Self {
            config,
            directory,
            transport: SessionTransport::new(transport_tx),
            timer_tx,
            timer: None,
            role: None,
            endpoint_id: None,
            host_peer: None,
            token: None,
            local: LocalIdentity {
                name: String::new(),
                skin: Skin::default(),
            },
            remote_players: BTreeMap::new(),
        };
        let events = SessionEvents {
            transport: transport_rx,
            timer: timer_rx,
        };
        (session, events)
    }

    #[cfg(test)]
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn is_active(&self) -> bool {
        self.role.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[cfg(test)]
    pub fn state(&self) -> crate::transport::ConnectionState {
        self.transport.state()
    }

    pub fn remote_players(&self) -> Vec<&RemotePlayer> {
        self.remote_players.values().collect()
    }

    /// Local player first, then every known remote player.
    pub fn player_names(&self) -> Vec<String> {
        std::iter::once(self.local.name.clone())
            .chain(self.remote_players.values().map(|remote| remote.name.clone()))
            .collect()
    }

    /// Opens a host endpoint, registers it and returns the shareable room token.
    pub async fn host(&mut self, name: String, skin: Skin) -> Result<String, SessionError> {
        if self.is_active() {
            return Err(SessionError::AlreadyActive);
        }
        let endpoint_id = new_endpoint_id();
        let addr = self.transport.listen(self.config.peer_bind).await?;
        let record = PeerRecord {
            peer_id: endpoint_id.clone(),
            addr: format!("{}:{}", self.config.advertise_host, addr.port()),
        };
        if let Err(error) = self.directory.register(&record).await {
            self.transport.close();
            return Err(error);
        }

        let token = derive_room_token(&endpoint_id);
        info!(%token, addr = %record.addr, "session created");
        self.local = LocalIdentity { name, skin };
        self.endpoint_id = Some(endpoint_id);
        self.token = Some(token.clone());
        self.role = Some(Role::Host);
        self.timer = Some(UpdateTimer::start(
            self.config.player_update_period,
            Some(self.config.game_state_period),
            self.timer_tx.clone(),
        ));
        Ok(token)
    }

    /// Resolves `token`, connects to the host and announces this player.
    pub async fn join(&mut self, name: String, skin: Skin, token: &str) -> Result<(), SessionError> {
        if self.is_active() {
            return Err(SessionError::AlreadyActive);
        }
        let host = self.directory.resolve(token).await?;
        let endpoint_id = new_endpoint_id();
        let url = format!("ws://{}/peer?peer={}", host.addr, endpoint_id);
        self.transport
            .connect(&host.peer_id, &url, self.config.join_timeout)
            .await?;

        let join = WireMessage::Join {
            player_name: name.clone(),
            skin: Some(skin.clone()),
        };
        if let Some(payload) = protocol::encode(&join) {
            self.transport.send(&host.peer_id, payload);
        }

        let token = derive_room_token(&host.peer_id);
        info!(%token, host = %host.peer_id, "joined session");
        self.local = LocalIdentity { name, skin };
        self.endpoint_id = Some(endpoint_id);
        self.host_peer = Some(host.peer_id);
        self.token = Some(token);
        self.role = Some(Role::Guest);
        self.timer = Some(UpdateTimer::start(
            self.config.player_update_period,
            None,
            self.timer_tx.clone(),
        ));
        Ok(())
    }

    /// Stops the update timer, closes every link and forgets remote players.
    pub async fn leave(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.transport.close();
        if self.role == Some(Role::Host) {
            if let Some(endpoint_id) = self.endpoint_id.as_deref() {
                if let Err(error) = self.directory.unregister(endpoint_id).await {
                    warn!(%error, "failed to unregister host endpoint");
                }
            }
        }
        if self.role.is_some() {
            info!(token = self.token.as_deref().unwrap_or_default(), "left session");
        }
        self.remote_players.clear();
        self.role = None;
        self.endpoint_id = None;
        self.host_peer = None;
        self.token = None;
    }
}

#[cfg(test)]
mod tests;
