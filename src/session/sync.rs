use super::timer::UpdateKind;
use super::{Role, Session, SessionEvent};
use crate::game::remote::RemotePlayer;
use crate::game::simulation::Simulation;
use crate::protocol::{self, GameStateData, PlayerData, WireMessage};
use crate::shared::names::sanitize_player_name;
use crate::transport::{ConnectionState, TransportEvent};
use rand::Rng;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What the driver should tell the local view after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    PlayersChanged,
    /// A guest lost its host. The session is over.
    HostLost,
}

impl Session {
    /// Applies one queued event. Runs between simulation ticks, never inside one.
    pub fn handle_event(&mut self, event: SessionEvent, sim: &mut Simulation) -> Option<SessionNotice> {
        match event {
            SessionEvent::UpdateDue(kind) => {
                self.send_update(kind, sim);
                self.prune_silent(Instant::now())
            }
            SessionEvent::Transport(TransportEvent::Opened { peer_id, outbound }) => {
                if self.role != Some(Role::Host) {
                    return None;
                }
                info!(peer = %peer_id, "peer connected");
                self.transport.register(peer_id.clone(), outbound);
                let welcome = WireMessage::Welcome {
                    host_name: self.local.name.clone(),
                    game_state: Some(GameStateData::capture(&sim.world.foods, &sim.world.powerups)),
                };
                self.send_to(&peer_id, &welcome);
                if let Some(host_id) = self.endpoint_id.clone() {
                    let host = WireMessage::PlayerJoined {
                        peer_id: host_id,
                        player_data: PlayerData {
                            name: Some(self.local.name.clone()),
                            skin: Some(self.local.skin.clone()),
                            ..PlayerData::default()
                        },
                    };
                    self.send_to(&peer_id, &host);
                }
                None
            }
            SessionEvent::Transport(TransportEvent::Data { peer_id, text }) => {
                let Some(message) = protocol::decode(&text) else {
                    debug!(peer = %peer_id, "ignoring malformed message");
                    return None;
                };
                self.apply_message(&peer_id, message, sim)
            }
            SessionEvent::Transport(TransportEvent::Closed { peer_id }) => {
                let was_open = self.transport.remove(&peer_id);
                let had_player = self.remote_players.remove(&peer_id).is_some();
                if !was_open && !had_player {
                    return None;
                }
                info!(peer = %peer_id, "peer disconnected");
                if self.host_peer.as_deref() == Some(peer_id.as_str()) {
                    return Some(SessionNotice::HostLost);
                }
                Some(SessionNotice::PlayersChanged)
            }
            SessionEvent::Transport(TransportEvent::Error { peer_id, message }) => {
                warn!(peer = %peer_id, %message, "peer connection error");
                None
            }
        }
    }

    /// Drops relayed players that have gone quiet. A guest never sees other guests' links
    /// close, so silence is the only sign they left. The host record is kept until its link closes.
    pub fn prune_silent(&mut self, now: Instant) -> Option<SessionNotice> {
        if self.role != Some(Role::Guest) {
            return None;
        }
        let timeout = self.config.remote_timeout;
        let host_peer = self.host_peer.as_deref();
        let before = self.remote_players.len();
        self.remote_players.retain(|peer_id, remote| {
            let fresh = Some(peer_id.as_str()) == host_peer
                || remote
                    .last_seen
                    .is_some_and(|seen| now.saturating_duration_since(seen) <= timeout);
            if !fresh {
                info!(peer = %peer_id, name = %remote.name, "dropping silent player");
            }
            fresh
        });
        (self.remote_players.len() != before).then_some(SessionNotice::PlayersChanged)
    }

    /// Marks a remote snake as already killed locally.
    pub fn mark_defeated(&mut self, peer_id: &str) {
        if let Some(remote) = self.remote_players.get_mut(peer_id) {
            remote.defeated = true;
        }
    }

    fn send_update(&self, kind: UpdateKind, sim: &Simulation) {
        if !self.is_active() || self.transport.state() != ConnectionState::Connected {
            return;
        }
        match kind {
            UpdateKind::PlayerUpdate => {
                if sim.is_over() {
                    return;
                }
                let update = WireMessage::PlayerUpdate {
                    peer_id: None,
                    player_data: PlayerData::kinematics(sim.player(), self.config.max_update_segments),
                };
                self.broadcast(&update, None);
            }
            UpdateKind::GameState => {
                if self.role != Some(Role::Host) {
                    return;
                }
                let state = WireMessage::GameState {
                    state: GameStateData::capture(&sim.world.foods, &sim.world.powerups),
                };
                self.broadcast(&state, None);
            }
        }
    }

    fn apply_message(
        &mut self,
        sender: &str,
        message: WireMessage,
        sim: &mut Simulation,
    ) -> Option<SessionNotice> {
        match (self.role?, message) {
            (Role::Host, WireMessage::Join { player_name, skin }) => {
                let mut rng = rand::thread_rng();
                let world_size = sim.world.config.world_size;
                let data = PlayerData {
                    name: Some(sanitize_player_name(&player_name, "Guest")),
                    skin,
                    x: Some(rng.gen::<f64>() * world_size),
                    y: Some(rng.gen::<f64>() * world_size),
                    segments: Some(Vec::new()),
                    score: Some(0),
                    kills: Some(0),
                    ..PlayerData::default()
                };
                info!(peer = %sender, name = ?data.name, "player joined");

                for (peer_id, remote) in &self.remote_players {
                    let known = WireMessage::PlayerJoined {
                        peer_id: peer_id.clone(),
                        player_data: snapshot_of(remote),
                    };
                    self.send_to(sender, &known);
                }
                self.remote_players
                    .insert(sender.to_string(), RemotePlayer::new(sender.to_string(), data.clone()));
                let joined = WireMessage::PlayerJoined {
                    peer_id: sender.to_string(),
                    player_data: data,
                };
                self.broadcast(&joined, None);
                Some(SessionNotice::PlayersChanged)
            }
            (Role::Guest, WireMessage::Welcome { host_name, game_state }) => {
                debug!(host = %host_name, "welcomed by host");
                let host = self
                    .remote_players
                    .entry(sender.to_string())
                    .or_insert_with(|| RemotePlayer::new(sender.to_string(), PlayerData::default()));
                host.name = host_name;
                if let Some(state) = game_state {
                    let (foods, powerups) = state.into_layout(&mut rand::thread_rng());
                    sim.replace_layout(foods, powerups);
                }
                Some(SessionNotice::PlayersChanged)
            }
            (Role::Guest, WireMessage::PlayerJoined { peer_id, player_data }) => {
                if self.endpoint_id.as_deref() == Some(peer_id.as_str()) {
                    return None;
                }
                match self.remote_players.get_mut(&peer_id) {
                    Some(remote) => remote.merge(player_data),
                    None => {
                        self.remote_players
                            .insert(peer_id.clone(), RemotePlayer::new(peer_id, player_data));
                    }
                }
                Some(SessionNotice::PlayersChanged)
            }
            (role, WireMessage::PlayerUpdate { peer_id, player_data }) => {
                // Only the host may speak for another peer.
                let owner = match (role, peer_id) {
                    (Role::Guest, Some(origin)) => origin,
                    _ => sender.to_string(),
                };
                if self.endpoint_id.as_deref() == Some(owner.as_str()) {
                    return None;
                }
                if role == Role::Host {
                    let relay = WireMessage::PlayerUpdate {
                        peer_id: Some(owner.clone()),
                        player_data: player_data.clone(),
                    };
                    self.broadcast(&relay, Some(sender));
                }
                match self.remote_players.get_mut(&owner) {
                    Some(remote) => {
                        remote.merge(player_data);
                        None
                    }
                    None => {
                        self.remote_players
                            .insert(owner.clone(), RemotePlayer::new(owner, player_data));
                        Some(SessionNotice::PlayersChanged)
                    }
                }
            }
            (Role::Guest, WireMessage::GameState { state }) => {
                let (foods, powerups) = state.into_layout(&mut rand::thread_rng());
                sim.replace_layout(foods, powerups);
                None
            }
            (role, message) => {
                debug!(?role, ?message, peer = %sender, "ignoring message not meant for this role");
                None
            }
        }
    }

    fn send_to(&self, peer_id: &str, message: &WireMessage) {
        if let Some(payload) = protocol::encode(message) {
            self.transport.send(peer_id, payload);
        }
    }

    fn broadcast(&self, message: &WireMessage, exclude: Option<&str>) {
        if let Some(payload) = protocol::encode(message) {
            self.transport.broadcast(&payload, exclude);
        }
    }
}

fn snapshot_of(remote: &RemotePlayer) -> PlayerData {
    PlayerData {
        name: Some(remote.name.clone()),
        skin: remote.skin.clone(),
        x: Some(remote.position.x),
        y: Some(remote.position.y),
        angle: Some(remote.heading),
        segments: Some(remote.segments.clone()),
        score: Some(remote.score),
        kills: Some(remote.kills),
        active_powerups: Some(remote.powerups.clone()),
    }
}
