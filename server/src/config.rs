//! Runtime settings for the server, its pools and their simulations
//!
//! Nothing here is read from disk: the binary builds these structs from its
//! command line, and tests build them directly.

use crate::error::ServerError;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 17530;
pub const DEFAULT_MAX_CLIENTS: usize = 4;
pub const DEFAULT_TARGET_TPS: u32 = 30;
// Headless boards never follow a terminal, so their size is fixed.
pub const DEFAULT_BOARD_WIDTH: i32 = 64;
pub const DEFAULT_BOARD_HEIGHT: i32 = 32;

/// Gameplay tuning for one simulation
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Simulation ticks per second the run loop aims for.
    pub target_tps: u32,
    /// Snakes move every `max(1, target_tps / player_speed)` ticks.
    pub player_speed: u32,
    /// Seconds between food sweeps.
    pub food_spawn_delay: u32,
    /// Food items the sweep tops the board back up to.
    pub food_spawn_limit: usize,
    /// Food items spawned when the game starts.
    pub food_start_count: usize,
    /// Seconds the bonus flag stays up after a pickup.
    pub bonus_delay: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            target_tps: DEFAULT_TARGET_TPS,
            player_speed: 24,
            food_spawn_delay: 5,
            food_spawn_limit: 3,
            food_start_count: 1,
            bonus_delay: 1,
        }
    }
}

impl GameConfig {
    /// Food tuning that scales with the number of players a pool hosts:
    /// more players means more food and shorter gaps between sweeps.
    pub fn for_pool(max_clients: usize) -> Self {
        let clients = max_clients as u32;
        Self {
            food_spawn_delay: 5u32.saturating_sub(clients).max(1),
            food_spawn_limit: 4 * max_clients,
            food_start_count: 2 * max_clients,
            ..Self::default()
        }
    }

    pub fn tick_budget(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_tps.max(1) as f64)
    }

    /// Ticks between two moves of every snake.
    pub fn player_frames(&self) -> u64 {
        (self.target_tps / self.player_speed.max(1)).max(1) as u64
    }

    /// Ticks between two food sweeps.
    pub fn food_frames(&self) -> u64 {
        (self.food_spawn_delay as u64 * self.target_tps as u64).max(1)
    }

    /// Ticks the bonus flag stays up.
    pub fn bonus_frames(&self) -> u64 {
        (self.bonus_delay as u64 * self.target_tps as u64).max(1)
    }
}

/// Policy for connections that arrive after a pool left its lobby
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidGameJoin {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pub max_clients: usize,
    pub width: i32,
    pub height: i32,
    /// How long a lobby with at least one client waits before starting short-handed.
    pub queue_timeout: Duration,
    /// Lobby ping interval for an empty pool; shrinks as the pool fills.
    pub lobby_interval: Duration,
    pub mid_game_join: MidGameJoin,
    /// Log an ASCII dump of the board with every broadcast.
    pub debug_board: bool,
    pub game: GameConfig,
}

impl PoolConfig {
    pub fn new(max_clients: usize) -> Self {
        Self {
            max_clients,
            width: DEFAULT_BOARD_WIDTH,
            height: DEFAULT_BOARD_HEIGHT,
            queue_timeout: Duration::from_secs(60),
            lobby_interval: Duration::from_secs(3),
            mid_game_join: MidGameJoin::Allow,
            debug_board: false,
            game: GameConfig::for_pool(max_clients),
        }
    }

    /// Time between lobby pings with `clients` already queued.
    pub fn lobby_ping_interval(&self, clients: usize) -> Duration {
        let max = self.max_clients.max(1);
        let remaining = max.saturating_sub(clients).max(1);
        let scaled = self.lobby_interval.mul_f64(remaining as f64 / max as f64);
        scaled.max(Duration::from_millis(100))
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        if self.max_clients == 0 {
            return Err(ServerError::Config("max clients must be at least 1".into()));
        }
        if self.game.target_tps == 0 {
            return Err(ServerError::Config("tick rate must be at least 1".into()));
        }
        if self.width < 5 || self.height < 5 {
            return Err(ServerError::Config(format!(
                "board {}x{} is smaller than 5x5",
                self.width, self.height
            )));
        }
        // Start rows fan out two cells apart around the middle row.
        if self.max_clients as i32 > self.height / 2 - 1 {
            return Err(ServerError::Config(format!(
                "board height {} cannot seat {} players",
                self.height, self.max_clients
            )));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CLIENTS)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub pool: PoolConfig,
    pub stats_interval: Duration,
    pub handshake_timeout: Duration,
}

impl ServerConfig {
    pub fn new(listen_addr: SocketAddr, pool: PoolConfig) -> Self {
        Self {
            listen_addr,
            pool,
            stats_interval: Duration::from_secs(1),
            handshake_timeout: Duration::from_secs(10),
        }
    }
}
