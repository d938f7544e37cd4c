pub const WORLD_SIZE: f64 = 3000.0;
pub const BOUNDS_MARGIN: f64 = 50.0;
pub const TICK_MS: u64 = 16;
pub const SNAKE_SPEED: f64 = 3.0;
pub const BOOST_MULTIPLIER: f64 = 2.0;
pub const SPEED_POWERUP_MULTIPLIER: f64 = 1.5;
pub const BOOST_SCORE_COST_CHANCE: f64 = 0.1;
pub const INITIAL_LENGTH: usize = 5;
pub const SEGMENT_SIZE: f64 = 8.0;
pub const COLLISION_DISTANCE: f64 = SEGMENT_SIZE * 1.5;
pub const NEAR_HEAD_SEGMENTS: usize = 3;
pub const FOOD_COUNT: usize = 100;
pub const POWERUP_COUNT: usize = 5;
pub const POWERUP_RADIUS: f64 = 12.0;
pub const BOT_COUNT: usize = 8;
pub const MAGNET_RANGE: f64 = 100.0;
pub const MAGNET_PULL: f64 = 5.0;

pub const PLAYER_UPDATE_MS: u64 = 50;
pub const GAME_STATE_MS: u64 = 1000;
pub const MAX_UPDATE_SEGMENTS: usize = 50;
pub const REMOTE_TIMEOUT_MS: u64 = 2000;
pub const JOIN_TIMEOUT_MS: u64 = 10_000;
pub const LEADERBOARD_SIZE: usize = 5;

pub const COLOR_POOL: [&str; 8] = [
  "#FF6B6B",
  "#4ECDC4",
  "#45B7D1",
  "#FFA07A",
  "#98D8C8",
  "#F7DC6F",
  "#BB8FCE",
  "#85C1E2",
];

pub const BOT_ROSTER: [(&str, u8); BOT_COUNT] = [
  ("Bot Newbie", 1),
  ("Bot Rookie", 1),
  ("Bot Fighter", 2),
  ("Bot Warrior", 2),
  ("Bot Hunter", 3),
  ("Bot Predator", 3),
  ("Bot Master", 4),
  ("Bot Legend", 4),
];
