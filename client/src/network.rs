//! Client network layer: join handshake and the server's line stream

use log::{debug, info};
use shared::{text_line, Direction, InitialSnapshot, ProtocolError, ServerLine, Snapshot, JOIN};
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("server rejected the join request")]
    Rejected,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("server closed the connection")]
    Closed,
}

/// Something the server told us after the handshake
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Still in the lobby.
    Waiting,
    /// The game started (or we joined a running one).
    Started(InitialSnapshot),
    Update(Snapshot),
}

pub struct Connection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    local_addr: SocketAddr,
}

impl Connection {
    /// Connects and performs the `Join` / `Accept` handshake.
    pub async fn join<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let local_addr = stream.local_addr()?;
        let (read_half, mut writer) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        writer.write_all(text_line(JOIN).as_bytes()).await?;
        let reply = lines.next_line().await?.ok_or(ClientError::Closed)?;
        match ServerLine::decode(&reply)? {
            ServerLine::Accept => {
                info!("Joined as {}", local_addr);
                Ok(Self {
                    lines,
                    writer,
                    local_addr,
                })
            }
            _ => Err(ClientError::Rejected),
        }
    }

    /// Our end of the socket. The server uses it as our player id.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the next lobby ping or snapshot. `None` once the server
    /// has closed the connection.
    pub async fn next_event(&mut self) -> Result<Option<ServerEvent>, ClientError> {
        while let Some(line) = self.lines.next_line().await? {
            if line.is_empty() {
                continue;
            }
            match ServerLine::decode(&line)? {
                ServerLine::Waiting => return Ok(Some(ServerEvent::Waiting)),
                ServerLine::Initial(initial) => return Ok(Some(ServerEvent::Started(initial))),
                ServerLine::Update(snapshot) => return Ok(Some(ServerEvent::Update(snapshot))),
                other => debug!("Ignoring stray {:?}", other),
            }
        }
        Ok(None)
    }

    pub async fn steer(&mut self, direction: Direction) -> Result<(), ClientError> {
        self.writer
            .write_all(text_line(direction.as_str()).as_bytes())
            .await?;
        Ok(())
    }
}
