//! Pool state machine
//!
//! A pool hosts one game: it collects connections in a lobby, seats every
//! queued client on the board, runs the fixed-tick loop until nobody is left
//! alive (or it is told to shut down) and finally closes every connection.
//!
//! Locking: the registry (`state`) is always taken before the simulation
//! (`game`), never the other way round.

use crate::client_manager::{Client, ClientManager};
use crate::config::{MidGameJoin, PoolConfig};
use crate::error::AdmitError;
use crate::game::GameState;
use crate::utils::unix_millis;
use log::{debug, error, info, warn};
use shared::{encode_line, text_line, Direction, InitialSnapshot, WAITING};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify, RwLock};
use tokio::time::{sleep, Instant};

/// Lifecycle of a pool. Transitions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PoolStatus {
    Initialized,
    Waiting,
    Starting,
    Started,
    Stopping,
    Stopped,
}

impl PoolStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PoolStatus::Initialized => "initialized",
            PoolStatus::Waiting => "waiting",
            PoolStatus::Starting => "starting",
            PoolStatus::Started => "started",
            PoolStatus::Stopping => "stopping",
            PoolStatus::Stopped => "stopped",
        }
    }

    /// Whether a pool in this status takes connections at all.
    pub fn is_admitting(self, mid_game_join: MidGameJoin) -> bool {
        match self {
            PoolStatus::Initialized | PoolStatus::Waiting => true,
            PoolStatus::Started => mid_game_join == MidGameJoin::Allow,
            _ => false,
        }
    }
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requests from connection tasks, drained at the start of every tick
#[derive(Debug)]
pub enum PoolCommand {
    Steer { id: String, direction: Direction },
}

#[derive(Debug)]
struct PoolState {
    status: PoolStatus,
    clients: ClientManager,
    start_time: u64,
}

pub struct Pool {
    id: usize,
    config: PoolConfig,
    state: RwLock<PoolState>,
    game: Mutex<GameState>,
    commands: mpsc::UnboundedSender<PoolCommand>,
    inbox: Mutex<Option<mpsc::UnboundedReceiver<PoolCommand>>>,
    measured_tps: AtomicU32,
    shutdown_requested: AtomicBool,
    admitted: Notify,
    cancelled: Notify,
    stopped: Notify,
}

impl Pool {
    pub fn new(id: usize, config: PoolConfig) -> Self {
        let game = GameState::new(config.width, config.height, &config.game);
        let (commands, inbox) = mpsc::unbounded_channel();

        Self {
            id,
            state: RwLock::new(PoolState {
                status: PoolStatus::Initialized,
                clients: ClientManager::new(config.max_clients),
                start_time: 0,
            }),
            game: Mutex::new(game),
            commands,
            inbox: Mutex::new(Some(inbox)),
            measured_tps: AtomicU32::new(config.game.target_tps),
            shutdown_requested: AtomicBool::new(false),
            admitted: Notify::new(),
            cancelled: Notify::new(),
            stopped: Notify::new(),
            config,
        }
    }

    /// Creates a pool and starts its lifecycle on a new task.
    pub fn spawn(id: usize, config: PoolConfig) -> Arc<Self> {
        let pool = Arc::new(Self::new(id, config));
        let runner = Arc::clone(&pool);
        tokio::spawn(async move { runner.run().await });
        pool
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub async fn status(&self) -> PoolStatus {
        self.state.read().await.status
    }

    pub async fn client_count(&self) -> usize {
        self.state.read().await.clients.len()
    }

    /// Tick rate measured over the last full tick.
    pub fn ticks_per_second(&self) -> u32 {
        self.measured_tps.load(Ordering::Relaxed)
    }

    /// Whether `admit` would currently take a connection.
    pub async fn has_room(&self) -> bool {
        let state = self.state.read().await;
        state.status.is_admitting(self.config.mid_game_join) && !state.clients.is_full()
    }

    fn advance(&self, state: &mut PoolState, next: PoolStatus) {
        if next > state.status {
            info!("Pool {}: {} -> {}", self.id, state.status, next);
            state.status = next;
        }
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Registers a connection. A client joining a running game is given a
    /// safe spawn point and its own initial snapshot straight away.
    /// On failure the client is handed back untouched.
    pub async fn admit(&self, client: Client) -> Result<(), (Client, AdmitError)> {
        let mut state = self.state.write().await;
        let status = state.status;
        if !status.is_admitting(self.config.mid_game_join) {
            return Err((client, AdmitError::NotAccepting(status)));
        }
        if state.clients.is_full() {
            return Err((client, AdmitError::PoolFull));
        }

        if status == PoolStatus::Started {
            if let Err(e) = self.join_running_game(&client, state.start_time).await {
                return Err((client, e));
            }
        }

        let id = client.id.clone();
        if let Err(client) = state.clients.register(client) {
            return Err((client, AdmitError::PoolFull));
        }
        info!(
            "Client {} joined pool {} ({}/{})",
            id,
            self.id,
            state.clients.len(),
            self.config.max_clients
        );
        drop(state);

        self.admitted.notify_one();
        Ok(())
    }

    async fn join_running_game(&self, client: &Client, start_time: u64) -> Result<(), AdmitError> {
        let mut game = self.game.lock().await;
        let spawn = game.find_spawn_point().ok_or(AdmitError::NoSpawnPoint)?;
        game.add_player(&client.id, spawn)
            .map_err(|_| AdmitError::NoSpawnPoint)?;

        let initial = InitialSnapshot {
            client_id: client.id.clone(),
            start_time,
            width: self.config.width,
            height: self.config.height,
            state: game.snapshot(self.ticks_per_second()),
        };
        let line = match encode_line(&initial) {
            Ok(line) => line,
            Err(e) => {
                game.mark_dead(&client.id);
                return Err(e.into());
            }
        };
        client.send(line.into());
        Ok(())
    }

    /// Removes a client after its connection failed, ending its game.
    /// Does nothing once the pool is tearing down, and nothing for ids
    /// that are already gone.
    pub async fn deregister(&self, id: &str) {
        let mut state = self.state.write().await;
        if state.status >= PoolStatus::Stopping {
            return;
        }
        if state.clients.remove(id) {
            self.game.lock().await.mark_dead(id);
        }
    }

    /// Queues a direction change for the next tick.
    pub fn steer(&self, id: &str, direction: Direction) {
        let _ = self.commands.send(PoolCommand::Steer {
            id: id.to_string(),
            direction,
        });
    }

    /// Asks the pool to stop as soon as its current phase notices.
    pub fn shutdown(&self) {
        if !self.shutdown_requested.swap(true, Ordering::SeqCst) {
            info!("Pool {}: shutdown requested", self.id);
        }
        self.cancelled.notify_one();
    }

    /// Resolves once the pool has reached `Stopped`.
    pub async fn wait_stopped(&self) {
        loop {
            let notified = self.stopped.notified();
            if self.status().await == PoolStatus::Stopped {
                return;
            }
            notified.await;
        }
    }

    /// Full lifecycle: lobby, start, tick loop, teardown.
    pub async fn run(&self) {
        let Some(mut inbox) = self.inbox.lock().await.take() else {
            warn!("Pool {} is already running", self.id);
            return;
        };

        self.wait_for_players().await;
        if !self.is_cancelled() {
            match self.start().await {
                Ok(()) => {
                    if let Err(e) = self.run_ticks(&mut inbox).await {
                        error!("Pool {}: failed to encode snapshot: {}", self.id, e);
                    }
                }
                Err(e) => error!("Pool {}: failed to encode initial snapshot: {}", self.id, e),
            }
        }
        self.stop().await;
    }

    async fn wait_for_players(&self) {
        {
            let mut state = self.state.write().await;
            self.advance(&mut state, PoolStatus::Waiting);
        }

        let waiting: Arc<str> = Arc::from(text_line(WAITING));
        let mut deadline = Instant::now() + self.config.queue_timeout;

        while !self.is_cancelled() {
            let now = Instant::now();
            let (count, failed) = {
                let state = self.state.read().await;
                let count = state.clients.len();
                // An empty lobby never expires.
                if count == 0 {
                    deadline = now + self.config.queue_timeout;
                }
                if count >= self.config.max_clients || now >= deadline {
                    break;
                }
                (count, state.clients.broadcast(Arc::clone(&waiting)))
            };
            for id in failed {
                self.deregister(&id).await;
            }

            tokio::select! {
                _ = sleep(self.config.lobby_ping_interval(count)) => {}
                _ = self.admitted.notified() => {}
                _ = self.cancelled.notified() => {}
            }
        }
    }

    async fn start(&self) -> Result<(), serde_json::Error> {
        let mut failed = Vec::new();
        {
            let mut state = self.state.write().await;
            self.advance(&mut state, PoolStatus::Starting);
            state.start_time = unix_millis();

            let ids = state.clients.ids();
            let mut game = self.game.lock().await;
            let positions = game.starting_positions(ids.len());
            for (id, position) in ids.iter().zip(positions) {
                if let Err(e) = game.add_player(id, position) {
                    warn!("Pool {}: cannot seat {} at {}: {}", self.id, id, position, e);
                }
            }

            let snapshot = game.snapshot(self.ticks_per_second());
            for id in &ids {
                let initial = InitialSnapshot {
                    client_id: id.clone(),
                    start_time: state.start_time,
                    width: self.config.width,
                    height: self.config.height,
                    state: snapshot.clone(),
                };
                let line = encode_line(&initial)?;
                if !state.clients.send_to(id, line.into()) {
                    failed.push(id.clone());
                }
            }

            for _ in 0..self.config.game.food_start_count {
                game.spawn_food();
            }
            self.advance(&mut state, PoolStatus::Started);
            info!("Pool {} started with {} players", self.id, ids.len());
        }

        for id in failed {
            self.deregister(&id).await;
        }
        Ok(())
    }

    async fn run_ticks(
        &self,
        inbox: &mut mpsc::UnboundedReceiver<PoolCommand>,
    ) -> Result<(), serde_json::Error> {
        let budget = self.config.game.tick_budget();
        let mut tick: u64 = 0;

        loop {
            if self.is_cancelled() {
                info!("Pool {}: stopping on request", self.id);
                return Ok(());
            }

            let tick_start = Instant::now();
            tick += 1;
            if !self.tick(inbox, tick).await? {
                info!("Pool {}: no players left alive", self.id);
                return Ok(());
            }

            let elapsed = tick_start.elapsed();
            if elapsed < budget {
                sleep(budget - elapsed).await;
            }

            let full = tick_start.elapsed().as_secs_f64();
            if full > 0.0 {
                self.measured_tps
                    .store((1.0 / full).round() as u32, Ordering::Relaxed);
            }
        }
    }

    /// Runs one tick. Returns false when nobody was alive to move.
    async fn tick(
        &self,
        inbox: &mut mpsc::UnboundedReceiver<PoolCommand>,
        tick: u64,
    ) -> Result<bool, serde_json::Error> {
        let game_config = &self.config.game;

        let (line, board) = {
            let mut game = self.game.lock().await;
            while let Ok(command) = inbox.try_recv() {
                match command {
                    PoolCommand::Steer { id, direction } => {
                        game.set_direction(&id, direction);
                    }
                }
            }

            if game.alive_count() == 0 {
                return Ok(false);
            }

            let mut changed = game.tick_bonus();
            if tick % game_config.player_frames() == 0 {
                game.step_players();
                changed = true;
            }
            if tick % game_config.food_frames() == 0 {
                let before = game.food().to_vec();
                game.sweep_food();
                changed |= game.food() != before.as_slice();
            }
            if !changed {
                return Ok(true);
            }

            let line = encode_line(&game.snapshot(self.ticks_per_second()))?;
            let board = self.config.debug_board.then(|| game.grid().to_string());
            (line, board)
        };

        if let Some(board) = board {
            debug!("Pool {} tick {}\n{}", self.id, tick, board);
        }

        let failed = self.state.read().await.clients.broadcast(line.into());
        for id in failed {
            self.deregister(&id).await;
        }
        Ok(true)
    }

    /// Ends the game for everyone, pushes a last snapshot and closes every
    /// connection.
    pub async fn stop(&self) {
        let clients = {
            let mut state = self.state.write().await;
            if state.status >= PoolStatus::Stopping {
                return;
            }
            self.advance(&mut state, PoolStatus::Stopping);

            let mut game = self.game.lock().await;
            game.mark_all_dead();
            match encode_line(&game.snapshot(self.ticks_per_second())) {
                Ok(line) => {
                    state.clients.broadcast(line.into());
                }
                Err(e) => error!("Pool {}: failed to encode final snapshot: {}", self.id, e),
            }
            state.clients.drain()
        };

        let closed = clients.len();
        drop(clients);

        {
            let mut state = self.state.write().await;
            self.advance(&mut state, PoolStatus::Stopped);
        }
        info!("Pool {} stopped, closed {} connections", self.id, closed);
        self.stopped.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_manager::OUTBOUND_QUEUE;
    use shared::{Coord, ServerLine};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    struct Conn {
        id: String,
        lines: mpsc::Receiver<Arc<str>>,
        closed: oneshot::Receiver<()>,
    }

    fn connection(port: u16) -> (Client, Conn) {
        let (tx, lines) = mpsc::channel(OUTBOUND_QUEUE);
        let (close, closed) = oneshot::channel();
        let addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();
        let client = Client::new(addr, tx, close);
        let id = client.id.clone();
        (client, Conn { id, lines, closed })
    }

    async fn join(pool: &Pool, port: u16) -> Conn {
        let (client, conn) = connection(port);
        pool.admit(client).await.map_err(|(_, e)| e).unwrap();
        conn
    }

    fn config(max_clients: usize) -> PoolConfig {
        PoolConfig {
            queue_timeout: Duration::from_millis(200),
            lobby_interval: Duration::from_millis(20),
            ..PoolConfig::new(max_clients)
        }
    }

    fn decode(line: &str) -> ServerLine {
        ServerLine::decode(line.trim_end()).unwrap()
    }

    async fn next_non_waiting(conn: &mut Conn) -> ServerLine {
        loop {
            let line = timeout(Duration::from_secs(5), conn.lines.recv())
                .await
                .unwrap()
                .unwrap();
            match decode(&line) {
                ServerLine::Waiting => continue,
                other => return other,
            }
        }
    }

    #[test]
    fn test_status_order_and_names() {
        assert!(PoolStatus::Initialized < PoolStatus::Waiting);
        assert!(PoolStatus::Started < PoolStatus::Stopping);
        assert_eq!(PoolStatus::Stopping.to_string(), "stopping");
        assert!(PoolStatus::Started.is_admitting(MidGameJoin::Allow));
        assert!(!PoolStatus::Started.is_admitting(MidGameJoin::Deny));
        assert!(!PoolStatus::Starting.is_admitting(MidGameJoin::Allow));
        assert!(!PoolStatus::Stopped.is_admitting(MidGameJoin::Allow));
    }

    #[tokio::test]
    async fn test_admit_until_full() {
        let pool = Pool::new(1, config(2));
        join(&pool, 1).await;
        join(&pool, 2).await;
        assert!(!pool.has_room().await);

        let (client, _conn) = connection(3);
        let (returned, err) = pool.admit(client).await.unwrap_err();
        assert!(matches!(err, AdmitError::PoolFull));
        assert_eq!(returned.id, "127.0.0.1:3");
        assert_eq!(pool.client_count().await, 2);
    }

    #[tokio::test]
    async fn test_start_sends_each_client_its_own_snapshot() {
        let pool = Pool::new(1, config(2));
        let mut a = join(&pool, 1).await;
        let mut b = join(&pool, 2).await;

        pool.start().await.unwrap();
        assert_eq!(pool.status().await, PoolStatus::Started);

        let mut heads = Vec::new();
        for conn in [&mut a, &mut b] {
            let line = conn.lines.try_recv().unwrap();
            let ServerLine::Initial(initial) = decode(&line) else {
                panic!("expected an initial snapshot, got {line}");
            };
            assert_eq!(initial.client_id, conn.id);
            assert_eq!(initial.width, 64);
            assert_eq!(initial.height, 32);
            assert_eq!(initial.state.players.len(), 2);
            heads.push(initial.state.players[&conn.id].position);
        }
        assert_ne!(heads[0], heads[1]);

        let game = pool.game.lock().await;
        assert_eq!(game.food().len(), pool.config().game.food_start_count);
    }

    #[tokio::test]
    async fn test_mid_game_join_gets_a_spawn_and_snapshot() {
        let pool = Pool::new(1, config(3));
        let _first = join(&pool, 1).await;
        pool.start().await.unwrap();

        let mut late = join(&pool, 2).await;
        let line = late.lines.try_recv().unwrap();
        let ServerLine::Initial(initial) = decode(&line) else {
            panic!("expected an initial snapshot, got {line}");
        };
        assert_eq!(initial.client_id, late.id);
        assert_eq!(initial.state.players.len(), 2);
        assert!(initial.state.players[&late.id].alive);
    }

    #[tokio::test]
    async fn test_mid_game_join_can_be_denied() {
        let mut config = config(3);
        config.mid_game_join = MidGameJoin::Deny;
        let pool = Pool::new(1, config);
        let _first = join(&pool, 1).await;
        pool.start().await.unwrap();

        let (client, _conn) = connection(2);
        let (_, err) = pool.admit(client).await.unwrap_err();
        assert!(matches!(err, AdmitError::NotAccepting(PoolStatus::Started)));
    }

    #[tokio::test]
    async fn test_steering_waits_for_the_next_tick() {
        let pool = Pool::new(1, config(1));
        let mut conn = join(&pool, 1).await;
        pool.start().await.unwrap();
        conn.lines.try_recv().unwrap();
        let mut inbox = pool.inbox.lock().await.take().unwrap();

        pool.steer(&conn.id, Direction::Up);
        {
            let game = pool.game.lock().await;
            assert_eq!(game.player(&conn.id).unwrap().direction, Direction::Right);
        }

        assert!(pool.tick(&mut inbox, 1).await.unwrap());

        let game = pool.game.lock().await;
        let player = game.player(&conn.id).unwrap();
        assert_eq!(player.committed_direction, Direction::Up);
        assert_eq!(player.position, Coord::new(32, 15));
        drop(game);

        let ServerLine::Update(update) = decode(&conn.lines.try_recv().unwrap()) else {
            panic!("expected a tick snapshot");
        };
        assert_eq!(update.players[&conn.id].position, Coord::new(32, 15));
    }

    #[tokio::test]
    async fn test_failed_broadcast_drops_the_client() {
        let pool = Pool::new(1, config(2));
        let mut a = join(&pool, 1).await;
        let b = join(&pool, 2).await;
        pool.start().await.unwrap();
        let mut inbox = pool.inbox.lock().await.take().unwrap();
        drop(b.lines);

        assert!(pool.tick(&mut inbox, 1).await.unwrap());

        assert_eq!(pool.client_count().await, 1);
        {
            let game = pool.game.lock().await;
            assert!(!game.player(&b.id).unwrap().alive);
            assert!(game.player(&a.id).unwrap().alive);
        }
        a.lines.try_recv().unwrap();
        assert!(matches!(decode(&a.lines.try_recv().unwrap()), ServerLine::Update(_)));
    }

    #[tokio::test]
    async fn test_stuck_client_is_dropped() {
        let pool = Pool::new(1, config(2));
        let mut a = join(&pool, 1).await;
        let mut b = join(&pool, 2).await;
        pool.start().await.unwrap();
        let mut inbox = pool.inbox.lock().await.take().unwrap();

        for tick in 1..=OUTBOUND_QUEUE as u64 {
            assert!(pool.tick(&mut inbox, tick).await.unwrap());
            a.lines.try_recv().unwrap();
        }
        assert_eq!(pool.client_count().await, 1);
        assert_eq!(b.closed.try_recv(), Ok(()));
        let game = pool.game.lock().await;
        assert!(!game.player(&b.id).unwrap().alive);
    }

    #[tokio::test]
    async fn test_bonus_expiry_is_broadcast_between_moves() {
        let mut config = config(1);
        config.game.target_tps = 30;
        config.game.player_speed = 15;
        let pool = Pool::new(1, config);
        let mut conn = join(&pool, 1).await;
        pool.start().await.unwrap();
        conn.lines.try_recv().unwrap();
        let mut inbox = pool.inbox.lock().await.take().unwrap();
        assert_eq!(pool.config().game.player_frames(), 2);

        {
            let mut game = pool.game.lock().await;
            let head = game.player(&conn.id).unwrap().position;
            let ahead = Coord::new(head.x + 1, head.y);
            if game.grid().get(ahead) != Ok(crate::grid::Cell::Food) {
                game.place_food(ahead).unwrap();
            }
            game.update_player(&conn.id);
            assert!(game.bonus_active());
            for _ in 1..pool.config().game.bonus_frames() {
                assert!(!game.tick_bonus());
            }
            assert!(game.bonus_active());
        }

        assert!(pool.tick(&mut inbox, 1).await.unwrap());

        let ServerLine::Update(update) = decode(&conn.lines.try_recv().unwrap()) else {
            panic!("expected a tick snapshot");
        };
        assert!(!update.bonus_active);
    }

    #[tokio::test]
    async fn test_tick_without_living_players_ends_the_game() {
        let pool = Pool::new(1, config(1));
        pool.start().await.unwrap();
        let mut inbox = pool.inbox.lock().await.take().unwrap();

        assert!(!pool.tick(&mut inbox, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_deregister_ends_the_players_game() {
        let pool = Pool::new(1, config(2));
        let mut a = join(&pool, 1).await;
        let _b = join(&pool, 2).await;
        pool.start().await.unwrap();

        pool.deregister(&a.id).await;
        pool.deregister(&a.id).await;

        assert_eq!(pool.client_count().await, 1);
        assert_eq!(a.closed.try_recv(), Ok(()));
        let game = pool.game.lock().await;
        assert!(!game.player(&a.id).unwrap().alive);
        assert_eq!(game.alive_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_closes_connections_and_keeps_players() {
        let pool = Pool::new(1, config(2));
        let mut a = join(&pool, 1).await;
        let mut b = join(&pool, 2).await;
        pool.start().await.unwrap();

        pool.stop().await;
        assert_eq!(pool.status().await, PoolStatus::Stopped);
        assert_eq!(pool.client_count().await, 0);

        for conn in [&mut a, &mut b] {
            assert_eq!(conn.closed.try_recv(), Ok(()));
            conn.lines.try_recv().unwrap();
            let ServerLine::Update(last) = decode(&conn.lines.try_recv().unwrap()) else {
                panic!("expected a final snapshot");
            };
            assert!(last.players.values().all(|p| !p.alive));
        }

        {
            let game = pool.game.lock().await;
            assert_eq!(game.players().len(), 2);
            assert_eq!(game.alive_count(), 0);
        }

        let (client, _conn) = connection(3);
        let (_, err) = pool.admit(client).await.unwrap_err();
        assert!(matches!(err, AdmitError::NotAccepting(PoolStatus::Stopped)));

        pool.deregister(&a.id).await;
        assert_eq!(pool.status().await, PoolStatus::Stopped);
    }

    #[tokio::test]
    async fn test_lobby_pings_then_starts_when_full() {
        let pool = Pool::spawn(1, config(2));
        let mut first = join(&pool, 1).await;

        let line = timeout(Duration::from_secs(5), first.lines.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(line.as_ref(), "waiting\n");

        let mut second = join(&pool, 2).await;
        assert!(matches!(next_non_waiting(&mut first).await, ServerLine::Initial(_)));
        assert!(matches!(next_non_waiting(&mut second).await, ServerLine::Initial(_)));

        pool.shutdown();
        timeout(Duration::from_secs(5), pool.wait_stopped())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_queue_timeout_starts_short_handed() {
        let pool = Pool::spawn(1, config(3));
        let mut only = join(&pool, 1).await;

        let ServerLine::Initial(initial) = next_non_waiting(&mut only).await else {
            panic!("expected an initial snapshot");
        };
        assert_eq!(initial.state.players.len(), 1);

        pool.shutdown();
        timeout(Duration::from_secs(5), pool.wait_stopped())
            .await
            .unwrap();
        let game = pool.game.lock().await;
        assert_eq!(game.alive_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_of_an_empty_lobby() {
        let pool = Pool::spawn(1, config(2));
        pool.shutdown();

        timeout(Duration::from_secs(5), pool.wait_stopped())
            .await
            .unwrap();
        assert!(!pool.has_room().await);
    }
}
