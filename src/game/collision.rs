use super::food::{Food, PowerUp};
use super::math::{angle_to, distance, project};
use super::remote::RemotePlayer;
use super::snake::Snake;
use super::types::PowerUpKind;
use super::view::SnakeView;
use super::world::World;
use crate::config::GameConfig;
use rand::Rng;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kill {
  pub victim: String,
  pub awarded: u32,
  /// Set when the victim is a remote peer's snake; that peer resolves its own death.
  pub remote_peer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollisionOutcome {
  /// The local player's head ran into another body. Terminal for the session.
  PlayerDied { killer: String },
  Survived {
    kills: Vec<Kill>,
    bot_respawns: usize,
  },
}

/// Eats every food item in reach and drags magnet-range items closer. Returns score gained.
pub fn resolve_food(snake: &mut Snake, foods: &mut Vec<Food>, config: &GameConfig, now: i64) -> u32 {
  let magnet = snake.has_powerup(PowerUpKind::Magnet, now);
  let head = snake.head();
  let mut gained = 0;
  foods.retain_mut(|food| {
    let dist = distance(head, food.position);
    if magnet && dist < config.magnet_range {
      food.position = project(food.position, angle_to(food.position, head), config.magnet_pull);
    }
    if dist < config.segment_size + food.radius() {
      gained += food.value();
      return false;
    }
    true
  });
  snake.score += gained;
  gained
}

pub fn resolve_powerups(
  snake: &mut Snake,
  powerups: &mut Vec<PowerUp>,
  config: &GameConfig,
  now: i64,
) -> usize {
  let head = snake.head();
  let mut picked = Vec::new();
  powerups.retain(|powerup| {
    if distance(head, powerup.position) < config.segment_size + config.powerup_radius {
      picked.push(powerup.kind);
      return false;
    }
    true
  });
  for kind in &picked {
    snake.apply_powerup(*kind, now);
  }
  picked.len()
}

fn is_immune(mover: &dyn SnakeView, target: &dyn SnakeView, now: i64) -> bool {
  mover.has_powerup(PowerUpKind::Shield, now)
    || mover.has_powerup(PowerUpKind::Ghost, now)
    || target.has_powerup(PowerUpKind::Ghost, now)
}

/// True when `mover`'s head touches `target`'s body past the near-head grace segments.
pub fn head_hits_body(mover: &dyn SnakeView, target: &dyn SnakeView, config: &GameConfig, now: i64) -> bool {
  if is_immune(mover, target, now) {
    return false;
  }
  let head = mover.head();
  target
    .segments()
    .skip(config.near_head_segments)
    .any(|segment| distance(head, segment) < config.collision_distance)
}

/// Resolves snake-vs-snake contacts for one tick. The player-death check runs first and wins.
pub fn resolve_snakes<R: Rng + ?Sized>(
  world: &mut World,
  remotes: &[&RemotePlayer],
  now: i64,
  rng: &mut R,
) -> CollisionOutcome {
  let config = world.config.clone();

  let killer = world
    .bots
    .iter()
    .map(|bot| bot as &dyn SnakeView)
    .chain(remotes.iter().map(|remote| *remote as &dyn SnakeView))
    .find(|other| head_hits_body(&world.player, *other, &config, now))
    .map(|other| other.name().to_string());
  if let Some(killer) = killer {
    return CollisionOutcome::PlayerDied { killer };
  }

  let mut kills = Vec::new();
  let mut bot_respawns = 0;

  let victims: Vec<usize> = world
    .bots
    .iter()
    .enumerate()
    .filter(|(_, bot)| head_hits_body(*bot, &world.player, &config, now))
    .map(|(index, _)| index)
    .collect();
  for index in victims {
    let victim = world.bots[index].clone();
    let kill = drop_body_as_food(world, &victim, rng);
    kills.push(kill);
    world.respawn_bot(index, rng);
    bot_respawns += 1;
  }

  for remote in remotes.iter().filter(|remote| !remote.defeated) {
    if head_hits_body(*remote, &world.player, &config, now) {
      let mut kill = drop_body_as_food(world, *remote, rng);
      kill.remote_peer = Some(remote.peer_id.clone());
      kills.push(kill);
    }
  }

  let crashed: Vec<usize> = (0..world.bots.len())
    .filter(|&index| {
      let bot = &world.bots[index];
      world
        .bots
        .iter()
        .enumerate()
        .any(|(other_index, other)| other_index != index && head_hits_body(bot, other, &config, now))
    })
    .collect();
  for index in crashed {
    world.respawn_bot(index, rng);
    bot_respawns += 1;
  }

  CollisionOutcome::Survived { kills, bot_respawns }
}

/// Scatters every other body segment of `victim` as food and credits the player.
fn drop_body_as_food<R: Rng + ?Sized>(world: &mut World, victim: &dyn SnakeView, rng: &mut R) -> Kill {
  for segment in victim.segments().step_by(2) {
    world.foods.push(Food::random_at(rng, segment));
  }
  let awarded = (victim.segment_count() / 2) as u32;
  world.player.score += awarded;
  world.player.kills += 1;
  tracing::debug!(victim = victim.name(), awarded, "player scored a kill");
  Kill {
    victim: victim.name().to_string(),
    awarded,
    remote_peer: None,
  }
}
