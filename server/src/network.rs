//! Server network layer: TCP accept loop, join handshake and pool placement

use crate::client::{self, spawn_reader, spawn_writer};
use crate::client_manager::Client;
use crate::config::ServerConfig;
use crate::error::{AdmitError, HandshakeError, ServerError};
use crate::pool::{Pool, PoolStatus};
use log::{debug, info, warn};
use shared::{text_line, ACCEPT, JOIN, REJECTED};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::time::{interval, sleep, timeout};

/// How long `shutdown` waits for each pool to finish tearing down.
const POOL_STOP_GRACE: Duration = Duration::from_secs(5);

/// Aggregate counts over every pool that has not stopped yet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    pub pools: usize,
    pub clients: usize,
}

/// Reads the client's greeting and answers it.
///
/// `Join` is answered with `Accept`; anything else gets `Rejected` and the
/// write half is shut down. No greeting within `deadline` is a timeout.
pub async fn handshake<R, W>(
    lines: &mut Lines<R>,
    writer: &mut W,
    deadline: Duration,
) -> Result<(), HandshakeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let greeting = timeout(deadline, lines.next_line())
        .await
        .map_err(|_| HandshakeError::Timeout)??;

    match greeting {
        None => Err(HandshakeError::Closed),
        Some(line) if line == JOIN => {
            writer.write_all(text_line(ACCEPT).as_bytes()).await?;
            Ok(())
        }
        Some(line) => {
            writer.write_all(text_line(REJECTED).as_bytes()).await?;
            let _ = writer.shutdown().await;
            Err(HandshakeError::UnexpectedGreeting(line))
        }
    }
}

pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    pools: Mutex<Vec<Arc<Pool>>>,
    next_pool_id: AtomicUsize,
}

impl Server {
    /// Validates the configuration and binds the listening socket.
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        config.pool.validate()?;
        let listener = TcpListener::bind(config.listen_addr)
            .await
            .map_err(ServerError::Bind)?;
        info!(
            "Server listening on {}",
            listener.local_addr().map_err(ServerError::Bind)?
        );

        Ok(Self {
            listener,
            config,
            pools: Mutex::new(Vec::new()),
            next_pool_id: AtomicUsize::new(1),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accepts connections forever. Every connection is served on its own
    /// task; a stats task prunes stopped pools alongside.
    pub async fn run(self: Arc<Self>) {
        let stats = Arc::clone(&self);
        tokio::spawn(async move { stats.report_stats().await });

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let server = Arc::clone(&self);
                    tokio::spawn(async move { server.handle_connection(stream, addr).await });
                }
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }

    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        info!("Serving {}", addr);
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        if let Err(e) = handshake(&mut lines, &mut write_half, self.config.handshake_timeout).await {
            warn!("Handshake with {} failed: {}", addr, e);
            return;
        }

        let (client, outbound, close) = client::open(addr);
        let id = client.id.clone();
        spawn_writer(write_half, outbound, id.clone());

        match self.place(client).await {
            Ok(pool) => {
                spawn_reader(lines.into_inner(), id, pool, close);
            }
            Err(e) => warn!("Could not place {}: {}", addr, e),
        }
    }

    /// Admits a client into the first pool that takes it, opening a new
    /// pool when none does.
    async fn place(&self, mut client: Client) -> Result<Arc<Pool>, AdmitError> {
        let mut pools = self.pools.lock().await;

        for pool in pools.iter() {
            match pool.admit(client).await {
                Ok(()) => return Ok(Arc::clone(pool)),
                Err((returned, AdmitError::PoolFull | AdmitError::NotAccepting(_))) => {
                    client = returned;
                }
                Err((_, e)) => return Err(e),
            }
        }

        let id = self.next_pool_id.fetch_add(1, Ordering::SeqCst);
        info!("Opening pool {}", id);
        let pool = Pool::spawn(id, self.config.pool.clone());
        pools.push(Arc::clone(&pool));
        pool.admit(client).await.map_err(|(_, e)| e)?;
        Ok(pool)
    }

    pub async fn stats(&self) -> ServerStats {
        let pools = self.pools.lock().await.clone();
        let mut stats = ServerStats::default();
        for pool in pools {
            if pool.status().await != PoolStatus::Stopped {
                stats.pools += 1;
                stats.clients += pool.client_count().await;
            }
        }
        stats
    }

    /// Forgets every stopped pool. Returns how many were dropped.
    pub async fn prune_stopped(&self) -> usize {
        let mut pools = self.pools.lock().await;
        let before = pools.len();
        let mut kept = Vec::with_capacity(before);
        for pool in pools.drain(..) {
            if pool.status().await == PoolStatus::Stopped {
                debug!("Pruned pool {}", pool.id());
            } else {
                kept.push(pool);
            }
        }
        let pruned = before - kept.len();
        *pools = kept;
        pruned
    }

    async fn report_stats(&self) {
        let mut ticker = interval(self.config.stats_interval);
        let mut last = ServerStats::default();
        loop {
            ticker.tick().await;
            self.prune_stopped().await;
            let stats = self.stats().await;
            if stats != last {
                info!("Server stats: {} pools, {} clients", stats.pools, stats.clients);
                last = stats;
            }
        }
    }

    /// Stops every pool and waits for their connections to close.
    pub async fn shutdown(&self) {
        let pools = self.pools.lock().await.clone();
        info!("Shutting down {} pools", pools.len());
        for pool in &pools {
            pool.shutdown();
        }
        for pool in &pools {
            if timeout(POOL_STOP_GRACE, pool.wait_stopped()).await.is_err() {
                warn!("Pool {} did not stop in time", pool.id());
            }
        }
    }
}
