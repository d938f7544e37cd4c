use crate::game::constants::{
    BOOST_MULTIPLIER, BOOST_SCORE_COST_CHANCE, BOT_COUNT, BOUNDS_MARGIN, COLLISION_DISTANCE,
    FOOD_COUNT, GAME_STATE_MS, INITIAL_LENGTH, JOIN_TIMEOUT_MS, MAGNET_PULL, MAGNET_RANGE,
    MAX_UPDATE_SEGMENTS, NEAR_HEAD_SEGMENTS, PLAYER_UPDATE_MS, POWERUP_COUNT, POWERUP_RADIUS,
    REMOTE_TIMEOUT_MS, SEGMENT_SIZE, SNAKE_SPEED, SPEED_POWERUP_MULTIPLIER, TICK_MS, WORLD_SIZE,
};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Tunables for one simulated world. Defaults mirror `game::constants`.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub world_size: f64,
    pub bounds_margin: f64,
    pub snake_speed: f64,
    pub boost_multiplier: f64,
    pub speed_powerup_multiplier: f64,
    pub boost_cost_chance: f64,
    pub initial_length: usize,
    pub segment_size: f64,
    pub collision_distance: f64,
    pub near_head_segments: usize,
    pub food_target: usize,
    pub powerup_target: usize,
    pub powerup_radius: f64,
    pub bot_count: usize,
    pub magnet_range: f64,
    pub magnet_pull: f64,
    pub tick: Duration,
    pub player_update_period: Duration,
    pub game_state_period: Duration,
    pub max_update_segments: usize,
    pub join_timeout: Duration,
    /// Relayed players silent for longer than this are dropped.
    pub remote_timeout: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            world_size: WORLD_SIZE,
            bounds_margin: BOUNDS_MARGIN,
            snake_speed: SNAKE_SPEED,
            boost_multiplier: BOOST_MULTIPLIER,
            speed_powerup_multiplier: SPEED_POWERUP_MULTIPLIER,
            boost_cost_chance: BOOST_SCORE_COST_CHANCE,
            initial_length: INITIAL_LENGTH,
            segment_size: SEGMENT_SIZE,
            collision_distance: COLLISION_DISTANCE,
            near_head_segments: NEAR_HEAD_SEGMENTS,
            food_target: FOOD_COUNT,
            powerup_target: POWERUP_COUNT,
            powerup_radius: POWERUP_RADIUS,
            bot_count: BOT_COUNT,
            magnet_range: MAGNET_RANGE,
            magnet_pull: MAGNET_PULL,
            tick: Duration::from_millis(TICK_MS),
            player_update_period: Duration::from_millis(PLAYER_UPDATE_MS),
            game_state_period: Duration::from_millis(GAME_STATE_MS),
            max_update_segments: MAX_UPDATE_SEGMENTS,
            join_timeout: Duration::from_millis(JOIN_TIMEOUT_MS),
            remote_timeout: Duration::from_millis(REMOTE_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Play,
    Host,
    Join,
    Directory,
}

impl Mode {
    fn parse(value: &str) -> Option<Mode> {
        match value.trim().to_ascii_lowercase().as_str() {
            "play" | "offline" => Some(Mode::Play),
            "host" => Some(Mode::Host),
            "join" => Some(Mode::Join),
            "directory" => Some(Mode::Directory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mode: Mode,
    pub view_port: u16,
    pub peer_bind: SocketAddr,
    pub peer_advertise_host: String,
    pub directory_url: Option<String>,
    pub directory_port: u16,
    pub player_name: String,
    pub player_skin: String,
    pub room_token: Option<String>,
    pub seed: Option<u64>,
    pub game: GameConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mode = env::var("MODE")
            .ok()
            .and_then(|value| Mode::parse(&value))
            .unwrap_or(Mode::Play);
        let view_port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(8787);
        let peer_bind = env::var("PEER_BIND")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 0)));
        let peer_advertise_host = non_empty_var("PEER_ADVERTISE_HOST")
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let directory_url = non_empty_var("DIRECTORY_URL");
        let directory_port = env::var("DIRECTORY_PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(9000);
        let player_name = non_empty_var("PLAYER_NAME").unwrap_or_else(|| "Player".to_string());
        let player_skin = non_empty_var("PLAYER_SKIN").unwrap_or_else(|| "Classic".to_string());
        let room_token = non_empty_var("ROOM_TOKEN");
        let seed = env::var("GAME_SEED").ok().and_then(|value| value.parse().ok());

        Self {
            mode,
            view_port,
            peer_bind,
            peer_advertise_host,
            directory_url,
            directory_port,
            player_name,
            player_skin,
            room_token,
            seed,
            game: GameConfig::default(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .map(|value| value.trim().to_string())
        .ok()
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parse_accepts_aliases() {
        assert_eq!(Mode::parse("HOST"), Some(Mode::Host));
        assert_eq!(Mode::parse(" offline "), Some(Mode::Play));
        assert_eq!(Mode::parse("spectate"), None);
    }

    #[test]
    fn default_collision_distance_scales_segment_size() {
        let config = GameConfig::default();
        assert_eq!(config.collision_distance, config.segment_size * 1.5);
        assert_eq!(config.player_update_period, Duration::from_millis(50));
    }
}
