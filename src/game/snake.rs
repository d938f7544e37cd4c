use super::math::{clamp, project};
use super::types::{ActivePowerUp, Point, PowerUpKind, Skin};
use crate::config::GameConfig;
use rand::Rng;
use serde::Serialize;
use std::collections::VecDeque;

/// Difficulty-derived bot parameters. Every field grows with `level`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AiProfile {
  pub level: u8,
  pub reaction_speed: f64,
  pub vision_range: f64,
  pub aggression: f64,
}

impl AiProfile {
  pub const MIN_LEVEL: u8 = 1;
  pub const MAX_LEVEL: u8 = 4;

  pub fn new(level: u8) -> Self {
    let level = level.clamp(Self::MIN_LEVEL, Self::MAX_LEVEL);
    let scale = level as f64;
    Self {
      level,
      reaction_speed: 0.03 + scale * 0.02,
      vision_range: 200.0 + scale * 100.0,
      aggression: scale * 0.2,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Snake {
  pub name: String,
  #[serde(rename = "isPlayer")]
  pub is_player: bool,
  pub skin: Skin,
  pub position: Point,
  pub heading: f64,
  pub segments: VecDeque<Point>,
  pub score: u32,
  pub kills: u32,
  #[serde(rename = "activePowerups")]
  pub powerups: Vec<ActivePowerUp>,
  #[serde(skip)]
  pub ai: Option<AiProfile>,
}

impl Snake {
  pub fn new(
    name: String,
    position: Point,
    heading: f64,
    skin: Skin,
    ai: Option<AiProfile>,
    config: &GameConfig,
  ) -> Self {
    let segments = (0..config.initial_length)
      .map(|index| Point {
        x: position.x - index as f64 * config.segment_size,
        y: position.y,
      })
      .collect();
    Self {
      name,
      is_player: ai.is_none(),
      skin,
      position,
      heading,
      segments,
      score: 0,
      kills: 0,
      powerups: Vec::new(),
      ai,
    }
  }

  pub fn player(name: String, skin: Skin, config: &GameConfig) -> Self {
    let center = Point {
      x: config.world_size / 2.0,
      y: config.world_size / 2.0,
    };
    Self::new(name, center, 0.0, skin, None, config)
  }

  pub fn head(&self) -> Point {
    self.position
  }

  pub fn level(&self) -> Option<u8> {
    self.ai.map(|profile| profile.level)
  }

  pub fn target_length(&self, config: &GameConfig) -> usize {
    config.initial_length + self.score as usize
  }

  pub fn has_powerup(&self, kind: PowerUpKind, now: i64) -> bool {
    self
      .powerups
      .iter()
      .any(|effect| effect.kind == kind && effect.end_time > now)
  }

  /// Installs `kind` until `now + duration`, replacing any effect of the same kind.
  pub fn apply_powerup(&mut self, kind: PowerUpKind, now: i64) {
    self.powerups.retain(|effect| effect.kind != kind);
    self.powerups.push(ActivePowerUp {
      kind,
      end_time: now + kind.duration_ms(),
    });
  }

  pub fn expire_powerups(&mut self, now: i64) {
    self.powerups.retain(|effect| effect.end_time > now);
  }

  /// Speed in world units per frame. Boost only counts while the snake has score to spend.
  pub fn effective_speed(&self, config: &GameConfig, boost: bool, now: i64) -> f64 {
    let mut speed = config.snake_speed;
    if boost && self.score > 0 {
      speed *= config.boost_multiplier;
    }
    if self.has_powerup(PowerUpKind::Speed, now) {
      speed *= config.speed_powerup_multiplier;
    }
    speed
  }

  /// Moves the head `dt` frames along the heading and refits the body.
  pub fn advance<R: Rng + ?Sized>(
    &mut self,
    config: &GameConfig,
    dt: f64,
    boost: bool,
    now: i64,
    rng: &mut R,
  ) {
    self.expire_powerups(now);
    let speed = self.effective_speed(config, boost, now);
    if boost && self.score > 0 && rng.gen::<f64>() < config.boost_cost_chance {
      self.score -= 1;
    }

    let moved = project(self.position, self.heading, speed * dt);
    let low = config.bounds_margin;
    let high = config.world_size - config.bounds_margin;
    self.position = Point {
      x: clamp(moved.x, low, high),
      y: clamp(moved.y, low, high),
    };
    self.segments.push_front(self.position);
    self.fit_length(config);
  }

  /// Enforces `segments == initial_length + score`, growing by repeating the tail.
  pub fn fit_length(&mut self, config: &GameConfig) {
    let target = self.target_length(config);
    self.segments.truncate(target);
    let tail = self.segments.back().copied().unwrap_or(self.position);
    while self.segments.len() < target {
      self.segments.push_back(tail);
    }
  }

  /// Body segments eligible for collisions, skipping the curling neck.
  pub fn body(&self, near_head: usize) -> impl Iterator<Item = &Point> {
    self.segments.iter().skip(near_head)
  }
}
