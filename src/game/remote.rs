use super::types::{ActivePowerUp, Point, Skin};
use crate::protocol::PlayerData;
use std::time::Instant;

/// Last-known state of a peer's snake, assembled from partial updates.
#[derive(Debug, Clone, Default)]
pub struct RemotePlayer {
  pub peer_id: String,
  pub name: String,
  pub skin: Option<Skin>,
  pub position: Point,
  pub heading: f64,
  pub segments: Vec<Point>,
  pub score: u32,
  pub kills: u32,
  pub powerups: Vec<ActivePowerUp>,
  /// Already credited as a kill locally; ignored for further kills.
  pub defeated: bool,
  pub last_seen: Option<Instant>,
}

impl RemotePlayer {
  pub fn new(peer_id: String, data: PlayerData) -> Self {
    let mut player = Self {
      peer_id,
      ..Self::default()
    };
    player.merge(data);
    player
  }

  /// Overwrites only the fields present in `data` and marks the player as seen.
  pub fn merge(&mut self, data: PlayerData) {
    self.last_seen = Some(Instant::now());
    if let Some(name) = data.name {
      self.name = name;
    }
    if let Some(skin) = data.skin {
      self.skin = Some(skin);
    }
    if let Some(x) = data.x {
      self.position.x = x;
    }
    if let Some(y) = data.y {
      self.position.y = y;
    }
    if let Some(angle) = data.angle {
      self.heading = angle;
    }
    if let Some(segments) = data.segments {
      self.segments = segments;
    }
    if let Some(score) = data.score {
      self.score = score;
    }
    if let Some(kills) = data.kills {
      self.kills = kills;
    }
    if let Some(powerups) = data.active_powerups {
      self.powerups = powerups;
    }
  }
}
