use clap::Parser;
use client::game::ClientGameState;
use client::input::{steer, Autopilot};
use client::network::{Connection, ServerEvent};
use log::{debug, info, warn};
use shared::Direction;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless snake client", long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:17530")]
    server: String,

    /// Steer automatically toward the nearest food
    #[arg(long)]
    autopilot: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("Connecting to: {}", args.server);
    let mut connection = Connection::join(&args.server).await?;
    if args.autopilot {
        info!("Autopilot engaged");
    } else {
        info!("Type up/right/down/left and press enter to steer");
    }

    let mut state = ClientGameState::new();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = !args.autopilot;

    loop {
        tokio::select! {
            event = connection.next_event() => {
                let Some(event) = event? else {
                    info!("Server closed the connection");
                    break;
                };
                match &event {
                    ServerEvent::Waiting => info!("Waiting for players..."),
                    ServerEvent::Started(initial) => info!(
                        "Game started as {} on a {}x{} board",
                        initial.client_id, initial.width, initial.height
                    ),
                    ServerEvent::Update(snapshot) => debug!(
                        "{} players, {} food, {} TPS",
                        snapshot.players.len(),
                        snapshot.food.len(),
                        snapshot.ticks_per_second
                    ),
                }
                state.apply(event);

                if state.is_game_over() {
                    let size = state.me().map(|p| p.size()).unwrap_or(0);
                    info!("Game over, final length {}", size);
                    break;
                }
                if args.autopilot {
                    if let Some(direction) = Autopilot.next_command(&state) {
                        connection.steer(direction).await?;
                    }
                }
            }
            line = stdin.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    stdin_open = false;
                    continue;
                };
                let wanted = match line.trim().parse::<Direction>() {
                    Ok(direction) => direction,
                    Err(e) => {
                        warn!("{}", e);
                        continue;
                    }
                };
                match state.me().and_then(|me| steer(me, wanted)) {
                    Some(direction) => connection.steer(direction).await?,
                    None => debug!("Not turning {}", wanted),
                }
            }
        }
    }

    Ok(())
}
