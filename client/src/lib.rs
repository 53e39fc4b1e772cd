//! # Snake Client Library
//!
//! Thin network client for the snake pool server. It performs the join
//! handshake, turns the server's line stream into events, mirrors the
//! latest snapshot locally and sends direction changes back.
//!
//! Nothing is simulated on the client: the server is authoritative and
//! every snapshot simply replaces the previous one.
//!
//! ## Module Organization
//!
//! - `network`: `Connection` (handshake, events, steering) and `ClientError`
//! - `game`: `ClientGameState`, the local mirror of the last snapshot
//! - `input`: the no-reversal steering rule and the greedy `Autopilot`
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::game::ClientGameState;
//! use client::input::Autopilot;
//! use client::network::Connection;
//!
//! # async fn play() -> Result<(), client::network::ClientError> {
//! let mut connection = Connection::join("127.0.0.1:17530").await?;
//! let mut state = ClientGameState::new();
//!
//! while let Some(event) = connection.next_event().await? {
//!     state.apply(event);
//!     if state.is_game_over() {
//!         break;
//!     }
//!     if let Some(direction) = Autopilot.next_command(&state) {
//!         connection.steer(direction).await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod game;
pub mod input;
pub mod network;
