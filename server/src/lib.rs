//! # Snake Pool Server Library
//!
//! Authoritative server for a grid-based multiplayer snake game. Clients
//! connect over TCP, greet the server with a `Join` line and are grouped
//! into pools of a bounded size. Each pool runs its own game on its own
//! board and pushes newline-delimited JSON snapshots to its clients.
//!
//! ## Architecture
//!
//! ### Pools
//! A pool is a small state machine (`initialized → waiting → starting →
//! started → stopping → stopped`) driven by one long-lived task. While
//! waiting it pings its lobby with `waiting` lines; once full or once the
//! queue timeout expires it seats every client and runs a fixed-tick loop
//! until nobody is left alive.
//!
//! ### Connections
//! Every admitted connection gets a writer task fed by an outbound line
//! queue and a reader task that turns direction lines into steering
//! commands. Steering never touches the simulation directly: commands are
//! queued on the pool's channel and drained at the start of the next tick.
//!
//! ### Simulation
//! The simulation is a plain synchronous state machine over a walled cell
//! board. Snakes move one cell per move, wrap around inside the walls,
//! grow by eating food and die on contact with any snake body. Within one
//! tick snakes are processed in ascending id order, so the first snake to
//! reach a contested cell keeps it.
//!
//! ## Module Organization
//!
//! - `grid`: bounds-checked cell board
//! - `game`: per-pool simulation (movement, collisions, food, bonus)
//! - `pool`: lobby, start, tick loop and teardown
//! - `client_manager`: registry of a pool's connections
//! - `client`: reader and writer tasks of one connection
//! - `network`: accept loop, handshake, pool placement and stats
//! - `config`: server, pool and gameplay settings
//! - `error`: error types

pub mod client;
pub mod client_manager;
pub mod config;
pub mod error;
pub mod game;
pub mod grid;
pub mod network;
pub mod pool;
pub mod utils;

pub use config::{GameConfig, MidGameJoin, PoolConfig, ServerConfig};
pub use error::{AdmitError, HandshakeError, ServerError};
pub use network::{Server, ServerStats};
pub use pool::{Pool, PoolStatus};
