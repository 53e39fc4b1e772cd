//! Error types for the snake server
//!
//! Only `ServerError` is fatal. Everything else is scoped to one connection
//! and ends with that connection being rejected or closed.

use crate::pool::PoolStatus;

/// Setup failures that terminate the process.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Why a pool turned a connection away.
#[derive(Debug, thiserror::Error)]
pub enum AdmitError {
    #[error("pool is full")]
    PoolFull,

    #[error("pool is {0} and takes no new players")]
    NotAccepting(PoolStatus),

    #[error("no free spawn point for a new player")]
    NoSpawnPoint,

    #[error("failed to encode initial snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("i/o error during handshake: {0}")]
    Io(#[from] std::io::Error),

    #[error("no greeting before the handshake deadline")]
    Timeout,

    #[error("connection closed before greeting")]
    Closed,

    #[error("unexpected greeting {0:?}")]
    UnexpectedGreeting(String),
}
