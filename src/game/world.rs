use super::constants::BOT_ROSTER;
use super::food::{Food, FoodKind, PowerUp};
use super::math::{random_angle, random_point};
use super::snake::{AiProfile, Snake};
use super::types::{Point, Skin};
use crate::config::GameConfig;
use rand::Rng;

/// Canonical state of one arena: the local player, its bots, food and power-ups.
#[derive(Debug, Clone)]
pub struct World {
  pub config: GameConfig,
  pub player: Snake,
  pub bots: Vec<Snake>,
  pub foods: Vec<Food>,
  pub powerups: Vec<PowerUp>,
}

impl World {
  pub fn new<R: Rng + ?Sized>(
    config: GameConfig,
    player_name: String,
    skin: Skin,
    with_bots: bool,
    rng: &mut R,
  ) -> Self {
    let player = Snake::player(player_name, skin, &config);
    let bots = if with_bots {
      BOT_ROSTER
        .iter()
        .take(config.bot_count)
        .map(|(name, level)| spawn_bot(&config, name.to_string(), *level, rng))
        .collect()
    } else {
      Vec::new()
    };

    let mut world = Self {
      config,
      player,
      bots,
      foods: Vec::new(),
      powerups: Vec::new(),
    };
    world.replenish(rng);
    world.place_starting_specials(rng);
    world
  }

  fn place_starting_specials<R: Rng + ?Sized>(&mut self, rng: &mut R) {
    let center = self.config.world_size / 2.0;
    let specials = [
      (200.0, 0.0, FoodKind::Big),
      (-200.0, 0.0, FoodKind::Big),
      (0.0, 200.0, FoodKind::Mega),
      (0.0, -200.0, FoodKind::Mega),
      (300.0, 300.0, FoodKind::Super),
    ];
    for (dx, dy, kind) in specials {
      let position = Point {
        x: center + dx,
        y: center + dy,
      };
      self.foods.push(Food::new(rng, position, kind));
    }
  }

  /// Tops food and power-ups back up to their targets.
  pub fn replenish<R: Rng + ?Sized>(&mut self, rng: &mut R) {
    while self.foods.len() < self.config.food_target {
      self.foods.push(Food::random(rng, self.config.world_size));
    }
    while self.powerups.len() < self.config.powerup_target {
      self.powerups.push(PowerUp::random(rng, self.config.world_size));
    }
  }

  /// Replaces the bot at `index` with a fresh snake of the same name and level.
  pub fn respawn_bot<R: Rng + ?Sized>(&mut self, index: usize, rng: &mut R) {
    let Some(bot) = self.bots.get(index) else { return };
    let name = bot.name.clone();
    let level = bot.level().unwrap_or(AiProfile::MIN_LEVEL);
    let replacement = spawn_bot(&self.config, name, level, rng);
    tracing::debug!(bot = %replacement.name, level, "bot respawned");
    self.bots[index] = replacement;
  }
}

pub fn spawn_bot<R: Rng + ?Sized>(config: &GameConfig, name: String, level: u8, rng: &mut R) -> Snake {
  let position = random_point(rng, config.world_size);
  let heading = random_angle(rng);
  let skin = Skin::by_index(rng.gen_range(0..Skin::count()));
  Snake::new(name, position, heading, skin, Some(AiProfile::new(level)), config)
}
