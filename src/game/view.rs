use super::remote::RemotePlayer;
use super::snake::Snake;
use super::types::{ActivePowerUp, Point, PowerUpKind, Skin};
use serde::Serialize;

/// Read-only projection shared by locally simulated and remote snakes.
pub trait SnakeView {
  fn name(&self) -> &str;
  fn head(&self) -> Point;
  fn heading(&self) -> f64;
  fn segments(&self) -> Box<dyn Iterator<Item = Point> + '_>;
  fn segment_count(&self) -> usize;
  fn score(&self) -> u32;
  fn kills(&self) -> u32;
  fn skin(&self) -> Skin;
  fn active_powerups(&self) -> &[ActivePowerUp];

  fn has_powerup(&self, kind: PowerUpKind, now: i64) -> bool {
    self
      .active_powerups()
      .iter()
      .any(|effect| effect.kind == kind && effect.end_time > now)
  }
}

impl SnakeView for Snake {
  fn name(&self) -> &str {
    &self.name
  }

  fn head(&self) -> Point {
    self.position
  }

  fn heading(&self) -> f64 {
    self.heading
  }

  fn segments(&self) -> Box<dyn Iterator<Item = Point> + '_> {
    Box::new(self.segments.iter().copied())
  }

  fn segment_count(&self) -> usize {
    self.segments.len()
  }

  fn score(&self) -> u32 {
    self.score
  }

  fn kills(&self) -> u32 {
    self.kills
  }

  fn skin(&self) -> Skin {
    self.skin.clone()
  }

  fn active_powerups(&self) -> &[ActivePowerUp] {
    &self.powerups
  }
}

impl SnakeView for RemotePlayer {
  fn name(&self) -> &str {
    &self.name
  }

  fn head(&self) -> Point {
    self.position
  }

  fn heading(&self) -> f64 {
    self.heading
  }

  fn segments(&self) -> Box<dyn Iterator<Item = Point> + '_> {
    Box::new(self.segments.iter().copied())
  }

  fn segment_count(&self) -> usize {
    self.segments.len()
  }

  fn score(&self) -> u32 {
    self.score
  }

  fn kills(&self) -> u32 {
    self.kills
  }

  fn skin(&self) -> Skin {
    self.skin.clone().unwrap_or_default()
  }

  fn active_powerups(&self) -> &[ActivePowerUp] {
    &self.powerups
  }
}

#[derive(Debug, Clone, Copy)]
pub enum PlayerView<'a> {
  Local(&'a Snake),
  Remote(&'a RemotePlayer),
}

impl<'a> PlayerView<'a> {
  fn inner(&self) -> &'a dyn SnakeView {
    match *self {
      PlayerView::Local(snake) => snake,
      PlayerView::Remote(remote) => remote,
    }
  }

  pub fn is_remote(&self) -> bool {
    matches!(self, PlayerView::Remote(_))
  }

  pub fn frame(&self, now: i64) -> SnakeFrame {
    let view = self.inner();
    let (is_player, level) = match *self {
      PlayerView::Local(snake) => (snake.is_player, snake.level()),
      PlayerView::Remote(_) => (false, None),
    };
    SnakeFrame {
      name: view.name().to_string(),
      is_player,
      remote: self.is_remote(),
      ai_level: level,
      x: view.head().x,
      y: view.head().y,
      angle: view.heading(),
      segments: view.segments().collect(),
      score: view.score(),
      kills: view.kills(),
      skin: view.skin(),
      active_powerups: view
        .active_powerups()
        .iter()
        .filter(|effect| effect.end_time > now)
        .copied()
        .collect(),
    }
  }
}

impl SnakeView for PlayerView<'_> {
  fn name(&self) -> &str {
    self.inner().name()
  }

  fn head(&self) -> Point {
    self.inner().head()
  }

  fn heading(&self) -> f64 {
    self.inner().heading()
  }

  fn segments(&self) -> Box<dyn Iterator<Item = Point> + '_> {
    self.inner().segments()
  }

  fn segment_count(&self) -> usize {
    self.inner().segment_count()
  }

  fn score(&self) -> u32 {
    self.inner().score()
  }

  fn kills(&self) -> u32 {
    self.inner().kills()
  }

  fn skin(&self) -> Skin {
    self.inner().skin()
  }

  fn active_powerups(&self) -> &[ActivePowerUp] {
    self.inner().active_powerups()
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct SnakeFrame {
  pub name: String,
  #[serde(rename = "isPlayer")]
  pub is_player: bool,
  pub remote: bool,
  #[serde(rename = "aiLevel", skip_serializing_if = "Option::is_none")]
  pub ai_level: Option<u8>,
  pub x: f64,
  pub y: f64,
  pub angle: f64,
  pub segments: Vec<Point>,
  pub score: u32,
  pub kills: u32,
  pub skin: Skin,
  #[serde(rename = "activePowerups")]
  pub active_powerups: Vec<ActivePowerUp>,
}
