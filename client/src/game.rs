use crate::network::ServerEvent;
use log::debug;
use shared::{Coord, InitialSnapshot, Player, PlayerMap, Snapshot};
use std::collections::HashSet;

/// Client-side mirror of the latest state the server pushed
#[derive(Debug, Clone, Default)]
pub struct ClientGameState {
    client_id: Option<String>,
    board: Option<(i32, i32)>,
    start_time: Option<u64>,
    snapshot: Snapshot,
    lobby_pings: u32,
    updates: u64,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Waiting => self.lobby_pings += 1,
            ServerEvent::Started(initial) => self.apply_initial(initial),
            ServerEvent::Update(snapshot) => self.apply_update(snapshot),
        }
    }

    pub fn apply_initial(&mut self, initial: InitialSnapshot) {
        debug!(
            "Seated as {} on a {}x{} board",
            initial.client_id, initial.width, initial.height
        );
        self.client_id = Some(initial.client_id);
        self.board = Some((initial.width, initial.height));
        self.start_time = Some(initial.start_time);
        self.snapshot = initial.state;
    }

    pub fn apply_update(&mut self, snapshot: Snapshot) {
        self.snapshot = snapshot;
        self.updates += 1;
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn is_started(&self) -> bool {
        self.client_id.is_some()
    }

    /// Board border coordinates, known once the game has started.
    pub fn board_size(&self) -> Option<(i32, i32)> {
        self.board
    }

    pub fn start_time(&self) -> Option<u64> {
        self.start_time
    }

    /// Our own snake.
    pub fn me(&self) -> Option<&Player> {
        self.snapshot.players.get(self.client_id.as_deref()?)
    }

    pub fn players(&self) -> &PlayerMap {
        &self.snapshot.players
    }

    pub fn food(&self) -> &[Coord] {
        &self.snapshot.food
    }

    pub fn bonus_active(&self) -> bool {
        self.snapshot.bonus_active
    }

    pub fn ticks_per_second(&self) -> u32 {
        self.snapshot.ticks_per_second
    }

    pub fn lobby_pings(&self) -> u32 {
        self.lobby_pings
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// True once the game started and our snake is dead or gone.
    pub fn is_game_over(&self) -> bool {
        self.is_started() && !self.me().map(|p| p.alive).unwrap_or(false)
    }

    /// Every cell covered by any snake, dead or alive.
    pub fn occupied(&self) -> HashSet<Coord> {
        self.snapshot
            .players
            .values()
            .flat_map(|player| player.cells())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Direction;

    fn initial(id: &str) -> InitialSnapshot {
        let mut players = PlayerMap::new();
        players.insert("a".into(), Player::new("a", Coord::new(5, 5)));
        players.insert("b".into(), Player::new("b", Coord::new(5, 8)));
        InitialSnapshot {
            client_id: id.into(),
            start_time: 1_000,
            width: 20,
            height: 12,
            state: Snapshot {
                players,
                food: vec![Coord::new(9, 9)],
                bonus_active: false,
                ticks_per_second: 30,
            },
        }
    }

    #[test]
    fn test_lobby_before_start() {
        let mut state = ClientGameState::new();
        state.apply(ServerEvent::Waiting);
        state.apply(ServerEvent::Waiting);

        assert_eq!(state.lobby_pings(), 2);
        assert!(!state.is_started());
        assert!(!state.is_game_over());
        assert_eq!(state.board_size(), None);
        assert!(state.me().is_none());
    }

    #[test]
    fn test_initial_snapshot_identifies_me() {
        let mut state = ClientGameState::new();
        state.apply(ServerEvent::Started(initial("b")));

        assert_eq!(state.client_id(), Some("b"));
        assert_eq!(state.board_size(), Some((20, 12)));
        assert_eq!(state.start_time(), Some(1_000));
        assert_eq!(state.me().unwrap().position, Coord::new(5, 8));
        assert_eq!(state.food(), &[Coord::new(9, 9)]);
        assert!(!state.is_game_over());
    }

    #[test]
    fn test_update_replaces_state_and_detects_game_over() {
        let mut state = ClientGameState::new();
        state.apply(ServerEvent::Started(initial("a")));

        let mut next = state.snapshot.clone();
        let me = next.players.get_mut("a").unwrap();
        me.position = Coord::new(6, 5);
        me.direction = Direction::Down;
        next.bonus_active = true;
        state.apply(ServerEvent::Update(next.clone()));

        assert_eq!(state.updates(), 1);
        assert!(state.bonus_active());
        assert_eq!(state.me().unwrap().position, Coord::new(6, 5));
        assert!(!state.is_game_over());

        next.players.get_mut("a").unwrap().alive = false;
        state.apply(ServerEvent::Update(next));
        assert!(state.is_game_over());
    }

    #[test]
    fn test_occupied_covers_heads_and_tails() {
        let mut start = initial("a");
        start
            .state
            .players
            .get_mut("a")
            .unwrap()
            .tail
            .extend([Coord::new(3, 5), Coord::new(4, 5)]);
        let mut state = ClientGameState::new();
        state.apply_initial(start);

        let occupied = state.occupied();
        assert_eq!(occupied.len(), 4);
        assert!(occupied.contains(&Coord::new(3, 5)));
        assert!(occupied.contains(&Coord::new(5, 8)));
    }
}
