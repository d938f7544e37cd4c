//! Bot steering. One call per bot per tick; only the bot's own heading changes.
//!
//! Concerns are tried in strict priority order (danger, hunting, power-ups, food,
//! exploration) and at most one of them picks the target heading. Boundary repulsion
//! and the expert encirclement bias are applied afterwards, independently.

use super::food::{Food, PowerUp};
use super::math::{angle_to, distance, ease_angle, project, rotate_toward};
use super::snake::{AiProfile, Snake};
use super::types::Point;
use crate::config::GameConfig;
use rand::Rng;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

pub const DANGER_THRESHOLD: f64 = 0.4;
pub const POWERUP_SEEK_DISTANCE: f64 = 200.0;
pub const ENCIRCLE_DISTANCE: f64 = 150.0;
pub const ENCIRCLE_BIAS: f64 = 0.03;
const EXPLORE_JITTER: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concern {
  Danger,
  Hunt,
  PowerUp,
  Food,
  Explore,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steering {
  pub heading: f64,
  pub concern: Concern,
}

/// Level-scaled thresholds. Higher levels see farther, evade earlier and hunt
/// larger prey from a smaller body.
#[derive(Debug, Clone, Copy)]
pub struct Tuning {
  pub level: u8,
  pub reaction_speed: f64,
  pub vision_range: f64,
  pub danger_range: f64,
  pub min_hunt_length: usize,
  pub prey_ratio: f64,
  pub hunt_chance: f64,
  pub predict_distance: f64,
  pub powerup_chance: f64,
  pub food_value_multiplier: f64,
  pub explore_chance: f64,
  pub boundary_margin: f64,
  pub boundary_turn: f64,
}

impl Tuning {
  pub fn for_profile(profile: AiProfile) -> Self {
    let level = profile.level as f64;
    Self {
      level: profile.level,
      reaction_speed: profile.reaction_speed,
      vision_range: profile.vision_range,
      danger_range: 80.0 + level * 20.0,
      min_hunt_length: 10 + profile.level as usize * 5,
      prey_ratio: 0.5 + level * 0.1,
      hunt_chance: 0.3 + profile.aggression,
      predict_distance: 30.0 + level * 20.0,
      powerup_chance: 0.4 + level * 0.15,
      food_value_multiplier: 5.0 + level * 5.0,
      explore_chance: 0.02 + level * 0.005,
      boundary_margin: 150.0 + level * 50.0,
      boundary_turn: 0.05 + level * 0.02,
    }
  }

  fn dodges_sideways(&self) -> bool {
    self.level >= 3
  }

  fn intercepts(&self) -> bool {
    self.level >= 3
  }

  fn encircles(&self) -> bool {
    self.level >= AiProfile::MAX_LEVEL
  }
}

/// Picks the next heading for `bot`. `others` excludes the bot itself.
pub fn steer<R: Rng + ?Sized>(
  bot: &Snake,
  others: &[&Snake],
  foods: &[Food],
  powerups: &[PowerUp],
  config: &GameConfig,
  rng: &mut R,
) -> Steering {
  let tuning = Tuning::for_profile(bot.ai.unwrap_or_else(|| AiProfile::new(1)));
  let head = bot.head();

  let mut max_danger = 0.0;
  let mut danger_angle = None;
  for other in others {
    for segment in other.body(config.near_head_segments) {
      let dist = distance(head, *segment);
      if dist < tuning.danger_range {
        let danger = 1.0 - dist / tuning.danger_range;
        if danger > max_danger {
          max_danger = danger;
          danger_angle = Some(angle_to(head, *segment));
        }
      }
    }
  }

  let mut prey: Option<(&Snake, f64)> = None;
  if bot.segments.len() > tuning.min_hunt_length {
    let size_limit = bot.segments.len() as f64 * tuning.prey_ratio;
    for other in others {
      if (other.segments.len() as f64) >= size_limit {
        continue;
      }
      let dist = distance(head, other.head());
      if dist < tuning.vision_range && prey.map_or(true, |(_, best)| dist < best) {
        prey = Some((*other, dist));
      }
    }
  }

  let mut best_food: Option<(&Food, f64)> = None;
  for food in foods {
    let dist = distance(head, food.position);
    if dist >= tuning.vision_range {
      continue;
    }
    let score = food.value() as f64 * tuning.food_value_multiplier - dist / 10.0;
    if best_food.map_or(true, |(_, best)| score > best) {
      best_food = Some((food, score));
    }
  }

  let mut nearest_powerup: Option<(&PowerUp, f64)> = None;
  if rng.gen::<f64>() < tuning.powerup_chance {
    for powerup in powerups {
      let dist = distance(head, powerup.position);
      if dist < tuning.vision_range && nearest_powerup.map_or(true, |(_, best)| dist < best) {
        nearest_powerup = Some((powerup, dist));
      }
    }
  }

  let mut heading = bot.heading;
  let mut target = bot.heading;
  let mut turn_rate = tuning.reaction_speed;
  let concern;

  if let Some(angle) = danger_angle.filter(|_| max_danger > DANGER_THRESHOLD) {
    target = angle + PI;
    turn_rate = tuning.reaction_speed * 3.0;
    if tuning.dodges_sideways() {
      let side = if rng.gen::<bool>() { 1.0 } else { -1.0 };
      target += FRAC_PI_4 * side;
    }
    concern = Concern::Danger;
  } else if let Some((target_snake, _)) = prey.filter(|_| rng.gen::<f64>() < tuning.hunt_chance) {
    let aim = if tuning.intercepts() {
      project(target_snake.head(), target_snake.heading, tuning.predict_distance)
    } else {
      target_snake.head()
    };
    target = angle_to(head, aim);
    turn_rate = tuning.reaction_speed * 1.5;
    concern = Concern::Hunt;
  } else if let Some((powerup, _)) =
    nearest_powerup.filter(|(_, dist)| *dist < POWERUP_SEEK_DISTANCE)
  {
    target = angle_to(head, powerup.position);
    turn_rate = tuning.reaction_speed * 1.2;
    concern = Concern::PowerUp;
  } else if let Some((food, _)) = best_food {
    target = angle_to(head, food.position);
    concern = Concern::Food;
  } else {
    if rng.gen::<f64>() < tuning.explore_chance {
      heading += (rng.gen::<f64>() - 0.5) * EXPLORE_JITTER;
      target = heading;
    }
    concern = Concern::Explore;
  }

  if concern != Concern::Explore {
    heading = ease_angle(heading, target, turn_rate);
  }

  heading = repel_from_edges(heading, head, &tuning, config);

  if concern == Concern::Hunt && tuning.encircles() {
    if let Some((target_snake, dist)) = prey {
      if dist < ENCIRCLE_DISTANCE {
        let perpendicular = angle_to(head, target_snake.head()) + FRAC_PI_2;
        heading += perpendicular.sin() * ENCIRCLE_BIAS;
      }
    }
  }

  Steering { heading, concern }
}

fn repel_from_edges(heading: f64, head: Point, tuning: &Tuning, config: &GameConfig) -> f64 {
  let far = config.world_size - tuning.boundary_margin;
  let mut heading = heading;
  if head.x < tuning.boundary_margin {
    heading = rotate_toward(heading, 0.0, tuning.boundary_turn);
  } else if head.x > far {
    heading = rotate_toward(heading, PI, tuning.boundary_turn);
  }
  if head.y < tuning.boundary_margin {
    heading = rotate_toward(heading, FRAC_PI_2, tuning.boundary_turn);
  } else if head.y > far {
    heading = rotate_toward(heading, -FRAC_PI_2, tuning.boundary_turn);
  }
  heading
}
