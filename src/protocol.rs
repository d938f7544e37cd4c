use crate::game::food::{Food, FoodKind, PowerUp};
use crate::game::simulation::{Frame, GameSummary};
use crate::game::snake::Snake;
use crate::game::types::{ActivePowerUp, Point, PowerUpKind, Skin};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Messages exchanged between peers. Unknown `type` values fail to decode and are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireMessage {
  #[serde(rename = "join")]
  Join {
    #[serde(rename = "playerName")]
    player_name: String,
    #[serde(default)]
    skin: Option<Skin>,
  },
  #[serde(rename = "welcome")]
  Welcome {
    #[serde(rename = "hostName")]
    host_name: String,
    #[serde(rename = "gameState", default)]
    game_state: Option<GameStateData>,
  },
  #[serde(rename = "playerJoined")]
  PlayerJoined {
    #[serde(rename = "peerId")]
    peer_id: String,
    #[serde(rename = "playerData")]
    player_data: PlayerData,
  },
  #[serde(rename = "playerUpdate")]
  PlayerUpdate {
    /// Set by the host when relaying another guest's update.
    #[serde(rename = "peerId", default, skip_serializing_if = "Option::is_none")]
    peer_id: Option<String>,
    #[serde(rename = "playerData")]
    player_data: PlayerData,
  },
  #[serde(rename = "gameState")]
  GameState { state: GameStateData },
}

/// Partial snapshot of one peer's snake; absent fields leave the receiver's copy untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerData {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub skin: Option<Skin>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub x: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub y: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub angle: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub segments: Option<Vec<Point>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub score: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub kills: Option<u32>,
  #[serde(rename = "activePowerups", default, skip_serializing_if = "Option::is_none")]
  pub active_powerups: Option<Vec<ActivePowerUp>>,
}

impl PlayerData {
  /// Kinematic update for the periodic `playerUpdate`, segments capped at `max_segments`.
  pub fn kinematics(snake: &Snake, max_segments: usize) -> Self {
    Self {
      x: Some(snake.position.x),
      y: Some(snake.position.y),
      angle: Some(snake.heading),
      segments: Some(snake.segments.iter().take(max_segments).copied().collect()),
      score: Some(snake.score),
      kills: Some(snake.kills),
      active_powerups: Some(snake.powerups.clone()),
      ..Self::default()
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodData {
  pub x: f64,
  pub y: f64,
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(default)]
  pub value: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUpData {
  pub x: f64,
  pub y: f64,
  #[serde(rename = "type")]
  pub kind: String,
}

/// Host-authoritative food and power-up layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStateData {
  #[serde(default)]
  pub foods: Vec<FoodData>,
  #[serde(default)]
  pub powerups: Vec<PowerUpData>,
}

impl GameStateData {
  pub fn capture(foods: &[Food], powerups: &[PowerUp]) -> Self {
    Self {
      foods: foods
        .iter()
        .map(|food| FoodData {
          x: food.position.x,
          y: food.position.y,
          kind: food.kind.name().to_string(),
          value: Some(food.value()),
        })
        .collect(),
      powerups: powerups
        .iter()
        .map(|powerup| PowerUpData {
          x: powerup.position.x,
          y: powerup.position.y,
          kind: powerup.kind.name().to_string(),
        })
        .collect(),
    }
  }

  /// Rebuilds local collections. Unknown food kinds become normal food, unknown power-ups are dropped.
  pub fn into_layout<R: Rng + ?Sized>(self, rng: &mut R) -> (Vec<Food>, Vec<PowerUp>) {
    let foods = self
      .foods
      .into_iter()
      .map(|food| {
        let position = Point { x: food.x, y: food.y };
        Food::new(rng, position, FoodKind::from_name(&food.kind))
      })
      .collect();
    let powerups = self
      .powerups
      .into_iter()
      .filter_map(|powerup| {
        let kind = PowerUpKind::from_name(&powerup.kind)?;
        Some(PowerUp {
          position: Point {
            x: powerup.x,
            y: powerup.y,
          },
          kind,
        })
      })
      .collect();
    (foods, powerups)
  }
}

pub fn decode(text: &str) -> Option<WireMessage> {
  serde_json::from_str(text).ok()
}

pub fn encode(message: &WireMessage) -> Option<String> {
  serde_json::to_string(message).ok()
}

/// Commands from the local menu and input layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ViewCommand {
  #[serde(rename = "play")]
  Play {
    name: Option<String>,
    skin: Option<String>,
  },
  #[serde(rename = "host")]
  Host {
    name: Option<String>,
    skin: Option<String>,
  },
  #[serde(rename = "join")]
  Join {
    name: Option<String>,
    skin: Option<String>,
    token: String,
  },
  #[serde(rename = "leave")]
  Leave,
  #[serde(rename = "input")]
  Input { heading: f64, boost: Option<bool> },
}

pub fn decode_view_command(text: &str) -> Option<ViewCommand> {
  serde_json::from_str(text).ok()
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ViewEvent {
  #[serde(rename = "frame")]
  Frame(Frame),
  #[serde(rename = "sessionCreated")]
  SessionCreated { token: String },
  #[serde(rename = "sessionJoined")]
  SessionJoined { token: String },
  #[serde(rename = "sessionError")]
  SessionError { message: String },
  #[serde(rename = "gameOver")]
  GameOver(GameSummary),
  #[serde(rename = "players")]
  Players { names: Vec<String> },
}

impl ViewEvent {
  pub fn to_json(&self) -> Option<String> {
    serde_json::to_string(self).ok()
  }
}
