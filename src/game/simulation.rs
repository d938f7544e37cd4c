use super::bot::steer;
use super::collision::{resolve_food, resolve_powerups, resolve_snakes, CollisionOutcome, Kill};
use super::constants::LEADERBOARD_SIZE;
use super::food::{Food, PowerUp};
use super::math::normalize_angle;
use super::remote::RemotePlayer;
use super::snake::Snake;
use super::types::{LeaderboardEntry, Point, Skin};
use super::view::{PlayerView, SnakeFrame, SnakeView};
use super::world::World;
use crate::config::GameConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerInput {
  pub heading: f64,
  pub boost: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSummary {
  pub score: u32,
  pub kills: u32,
  #[serde(skip)]
  pub killer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
  /// The game had already ended; nothing moved.
  Idle,
  Running { kills: Vec<Kill> },
  GameOver(GameSummary),
}

/// Snapshot handed to the rendering side once per tick.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
  pub snakes: Vec<SnakeFrame>,
  pub foods: Vec<Food>,
  pub powerups: Vec<PowerUp>,
  pub camera: Point,
  pub score: u32,
  pub kills: u32,
  pub leaderboard: Vec<LeaderboardEntry>,
  #[serde(rename = "worldSize")]
  pub world_size: f64,
}

pub struct Simulation {
  pub world: World,
  rng: StdRng,
  input: PlayerInput,
  over: bool,
}

impl Simulation {
  pub fn new(config: GameConfig, player_name: String, skin: Skin, with_bots: bool, seed: u64) -> Self {
    let mut rng = StdRng::seed_from_u64(seed);
    let world = World::new(config, player_name, skin, with_bots, &mut rng);
    Self {
      world,
      rng,
      input: PlayerInput::default(),
      over: false,
    }
  }

  pub fn set_input(&mut self, input: PlayerInput) {
    self.input = input;
  }

  pub fn is_over(&self) -> bool {
    self.over
  }

  pub fn player(&self) -> &Snake {
    &self.world.player
  }

  /// Host-authoritative layout replaces ours wholesale.
  pub fn replace_layout(&mut self, foods: Vec<Food>, powerups: Vec<PowerUp>) {
    self.world.foods = foods;
    self.world.powerups = powerups;
  }

  /// One atomic simulation pass: input, bot steering, movement, pickups, collisions.
  pub fn tick(&mut self, now: i64, dt: f64, remotes: &[&RemotePlayer]) -> TickOutcome {
    if self.is_over() {
      return TickOutcome::Idle;
    }
    let input = self.input;
    let world = &mut self.world;
    let rng = &mut self.rng;
    let config = world.config.clone();

    world.player.heading = normalize_angle(input.heading);
    world.player.advance(&config, dt, input.boost, now, rng);

    let headings: Vec<f64> = (0..world.bots.len())
      .map(|index| {
        let others: Vec<&Snake> = std::iter::once(&world.player)
          .chain(
            world
              .bots
              .iter()
              .enumerate()
              .filter(|(other, _)| *other != index)
              .map(|(_, bot)| bot),
          )
          .collect();
        steer(&world.bots[index], &others, &world.foods, &world.powerups, &config, &mut *rng).heading
      })
      .collect();
    for (bot, heading) in world.bots.iter_mut().zip(headings) {
      bot.heading = heading;
      bot.advance(&config, dt, false, now, rng);
    }

    resolve_food(&mut world.player, &mut world.foods, &config, now);
    resolve_powerups(&mut world.player, &mut world.powerups, &config, now);
    for bot in world.bots.iter_mut() {
      resolve_food(bot, &mut world.foods, &config, now);
      resolve_powerups(bot, &mut world.powerups, &config, now);
    }

    let kills = match resolve_snakes(world, remotes, now, rng) {
      CollisionOutcome::PlayerDied { killer } => {
        fit_all(world);
        let summary = GameSummary {
          score: world.player.score,
          kills: world.player.kills,
          killer,
        };
        info!(score = summary.score, kills = summary.kills, killer = %summary.killer, "game over");
        self.over = true;
        return TickOutcome::GameOver(summary);
      }
      CollisionOutcome::Survived { kills, .. } => kills,
    };

    fit_all(world);
    world.replenish(rng);
    TickOutcome::Running { kills }
  }

  pub fn frame(&self, now: i64, remotes: &[&RemotePlayer]) -> Frame {
    let views: Vec<PlayerView<'_>> = std::iter::once(PlayerView::Local(&self.world.player))
      .chain(self.world.bots.iter().map(PlayerView::Local))
      .chain(remotes.iter().map(|remote| PlayerView::Remote(*remote)))
      .collect();

    let mut leaderboard: Vec<LeaderboardEntry> = views
      .iter()
      .map(|view| LeaderboardEntry {
        name: view.name().to_string(),
        score: view.score(),
        kills: view.kills(),
      })
      .collect();
    leaderboard.sort_by(|a, b| b.score.cmp(&a.score));
    leaderboard.truncate(LEADERBOARD_SIZE);

    Frame {
      snakes: views.iter().map(|view| view.frame(now)).collect(),
      foods: self.world.foods.clone(),
      powerups: self.world.powerups.clone(),
      camera: self.world.player.head(),
      score: self.world.player.score,
      kills: self.world.player.kills,
      leaderboard,
      world_size: self.world.config.world_size,
    }
  }
}

/// Trims or grows every local snake to `initial_length + score`.
fn fit_all(world: &mut World) {
  let config = &world.config;
  world.player.fit_length(config);
  for bot in world.bots.iter_mut() {
    bot.fit_length(config);
  }
}
