//! Connection registry for one pool
//!
//! Each admitted connection is represented by a `Client` handle. The handle
//! owns the sending side of the connection's outbound line queue and the
//! close signal of its input reader, so dropping the handle is what closes
//! the connection: queued lines are flushed, the write half is shut down and
//! the reader stops.
//!
//! The outbound queue is bounded. A client that falls `OUTBOUND_QUEUE` lines
//! behind is reported as failed, the same as one whose writer is gone.

use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

/// Lines a connection may have queued before it counts as stuck.
pub const OUTBOUND_QUEUE: usize = 64;

/// Server-side handle of one admitted connection
#[derive(Debug)]
pub struct Client {
    /// Remote address as a string; doubles as the player id.
    pub id: String,
    pub addr: SocketAddr,
    pub connected_at: Instant,
    outbound: mpsc::Sender<Arc<str>>,
    close: Option<oneshot::Sender<()>>,
}

impl Client {
    pub fn new(
        addr: SocketAddr,
        outbound: mpsc::Sender<Arc<str>>,
        close: oneshot::Sender<()>,
    ) -> Self {
        Self {
            id: addr.to_string(),
            addr,
            connected_at: Instant::now(),
            outbound,
            close: Some(close),
        }
    }

    /// Queues one already newline-terminated line without waiting. Fails
    /// once the writer has gone away or its queue is full.
    pub fn send(&self, line: Arc<str>) -> bool {
        match self.outbound.try_send(line) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Client {} is not reading, dropping it", self.id);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(close) = self.close.take() {
            let _ = close.send(());
        }
        debug!("Closed connection {}", self.id);
    }
}

/// Registered clients of one pool, keyed and iterated by id
#[derive(Debug)]
pub struct ClientManager {
    clients: BTreeMap<String, Client>,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: BTreeMap::new(),
            max_clients,
        }
    }

    /// Registers a client. Hands the client back if the registry is full
    /// or its id is already taken.
    pub fn register(&mut self, client: Client) -> Result<(), Client> {
        if self.is_full() || self.clients.contains_key(&client.id) {
            return Err(client);
        }
        info!("Client {} registered", client.id);
        self.clients.insert(client.id.clone(), client);
        Ok(())
    }

    /// Removes and closes a client. Returns false if it was already gone.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.clients.remove(id) {
            Some(client) => {
                info!(
                    "Client {} disconnected after {:.1}s",
                    client.addr,
                    client.connected_at.elapsed().as_secs_f64()
                );
                true
            }
            None => false,
        }
    }

    pub fn send_to(&self, id: &str, line: Arc<str>) -> bool {
        self.clients
            .get(id)
            .map(|client| client.send(line))
            .unwrap_or(false)
    }

    /// Queues a line for every client. Returns the ids whose connection is
    /// already gone; delivery to the rest is unaffected.
    pub fn broadcast(&self, line: Arc<str>) -> Vec<String> {
        self.clients
            .values()
            .filter(|client| !client.send(Arc::clone(&line)))
            .map(|client| client.id.clone())
            .collect()
    }

    /// Takes every client out of the registry.
    pub fn drain(&mut self) -> Vec<Client> {
        std::mem::take(&mut self.clients).into_values().collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.clients.len() >= self.max_clients
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }
}
