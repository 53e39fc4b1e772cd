use clap::Parser;
use log::{error, info};
use server::config::{
    GameConfig, MidGameJoin, PoolConfig, ServerConfig, DEFAULT_BOARD_HEIGHT, DEFAULT_BOARD_WIDTH,
    DEFAULT_MAX_CLIENTS, DEFAULT_PORT, DEFAULT_TARGET_TPS,
};
use server::network::Server;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Multiplayer snake server", long_about = None)]
struct Args {
    /// IP address to listen on
    #[arg(short = 'i', long, default_value = "0.0.0.0")]
    ip: IpAddr,

    /// Port to listen on
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Players per pool
    #[arg(short = 'm', long, default_value_t = DEFAULT_MAX_CLIENTS)]
    max_clients: usize,

    /// Simulation ticks per second
    #[arg(short = 't', long, default_value_t = DEFAULT_TARGET_TPS)]
    tick_rate: u32,

    /// Board width
    #[arg(long, default_value_t = DEFAULT_BOARD_WIDTH)]
    width: i32,

    /// Board height
    #[arg(long, default_value_t = DEFAULT_BOARD_HEIGHT)]
    height: i32,

    /// Seconds a lobby waits for more players before starting
    #[arg(long, default_value_t = 60)]
    queue_timeout: u64,

    /// Refuse connections into pools that are already playing
    #[arg(long)]
    no_mid_game_join: bool,

    /// Log the board of every pool after each broadcast
    #[arg(short = 'd', long)]
    debug: bool,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let pool = PoolConfig {
            width: self.width,
            height: self.height,
            queue_timeout: Duration::from_secs(self.queue_timeout),
            mid_game_join: if self.no_mid_game_join {
                MidGameJoin::Deny
            } else {
                MidGameJoin::Allow
            },
            debug_board: self.debug,
            game: GameConfig {
                target_tps: self.tick_rate,
                ..GameConfig::for_pool(self.max_clients)
            },
            ..PoolConfig::new(self.max_clients)
        };
        ServerConfig::new(SocketAddr::new(self.ip, self.port), pool)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.into_config();
    info!(
        "Starting server: {} players per pool, {} TPS, {}x{} board",
        config.pool.max_clients, config.pool.game.target_tps, config.pool.width, config.pool.height
    );

    let server = Arc::new(Server::new(config).await?);
    let accept_loop = tokio::spawn(Arc::clone(&server).run());

    tokio::select! {
        result = accept_loop => {
            if let Err(e) = result {
                error!("Accept loop panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    server.shutdown().await;
    Ok(())
}
