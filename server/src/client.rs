//! Tasks behind one admitted connection
//!
//! The writer drains the connection's outbound queue onto the socket and
//! shuts the write half down once the `Client` handle is dropped. The reader
//! turns direction lines into steering commands for the pool and
//! deregisters the client when the peer goes away.

use crate::client_manager::{Client, OUTBOUND_QUEUE};
use crate::pool::Pool;
use log::{debug, info, warn};
use shared::Direction;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// A peer that accepts no bytes for this long is given up on.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// A fresh client handle together with the receiving ends its tasks need.
pub fn open(addr: SocketAddr) -> (Client, mpsc::Receiver<Arc<str>>, oneshot::Receiver<()>) {
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
    let (close_tx, close_rx) = oneshot::channel();
    (Client::new(addr, outbound_tx, close_tx), outbound_rx, close_rx)
}

pub fn spawn_writer<W>(
    mut writer: W,
    mut outbound: mpsc::Receiver<Arc<str>>,
    id: String,
) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(line) = outbound.recv().await {
            match timeout(WRITE_TIMEOUT, writer.write_all(line.as_bytes())).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!("Write to {} failed: {}", id, e);
                    return;
                }
                Err(_) => {
                    warn!("Write to {} timed out", id);
                    return;
                }
            }
        }
        if let Ok(Err(e)) = timeout(WRITE_TIMEOUT, writer.shutdown()).await {
            debug!("Shutdown of {} failed: {}", id, e);
        }
    })
}

/// Parses one raw input line. Anything but an exact direction token is
/// refused, including bytes that are not UTF-8.
fn parse_input(raw: &[u8]) -> Result<Direction, String> {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let text = std::str::from_utf8(raw).map_err(|e| e.to_string())?;
    text.parse::<Direction>().map_err(|e| e.to_string())
}

pub fn spawn_reader<R>(
    mut reader: R,
    id: String,
    pool: Arc<Pool>,
    mut close: oneshot::Receiver<()>,
) -> JoinHandle<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut line = Vec::new();
        loop {
            tokio::select! {
                _ = &mut close => {
                    debug!("Input of {} closed by pool {}", id, pool.id());
                    return;
                }
                read = reader.read_until(b'\n', &mut line) => match read {
                    Ok(0) => {
                        info!("Client {} hung up", id);
                        break;
                    }
                    Ok(_) => {
                        match parse_input(&line) {
                            Ok(direction) => pool.steer(&id, direction),
                            Err(e) => debug!("Ignoring input from {}: {}", id, e),
                        }
                        line.clear();
                    }
                    Err(e) => {
                        warn!("Read from {} failed: {}", id, e);
                        break;
                    }
                }
            }
        }
        pool.deregister(&id).await;
    })
}
