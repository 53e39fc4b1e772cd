//! Authoritative snake simulation for one pool
//!
//! `GameState` owns the board, every snake and the food list. It has no
//! notion of time: the pool's run loop decides when snakes move, when food is
//! swept and when the bonus flag decays, and calls into this module for the
//! actual rules.

use crate::config::GameConfig;
use crate::grid::{Cell, Grid, GridError};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Coord, Direction, Player, PlayerMap, Snapshot};

/// Random probes before food spawning gives up for this call.
pub const SPAWN_ATTEMPTS: usize = 100;
/// Half the side of the empty square a mid-game joiner needs around its head.
pub const SPAWN_CLEARANCE: i32 = 2;

/// What a single `update_player` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Unknown id or the snake is already dead.
    Inactive,
    /// The target cell could not be read; nothing changed this tick.
    Skipped(GridError),
    Moved,
    Ate,
    /// Hit a snake body. The head stays where it was.
    Died,
}

#[derive(Debug, Clone)]
pub struct GameState {
    grid: Grid,
    players: PlayerMap,
    food: Vec<Coord>,
    bonus_active: bool,
    bonus_ticks_left: u64,
    bonus_frames: u64,
    food_spawn_limit: usize,
    rng: StdRng,
}

impl GameState {
    pub fn new(width: i32, height: i32, config: &GameConfig) -> Self {
        Self::with_rng(width, height, config, StdRng::from_entropy())
    }

    /// Deterministic food and spawn placement.
    pub fn with_seed(width: i32, height: i32, config: &GameConfig, seed: u64) -> Self {
        Self::with_rng(width, height, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(width: i32, height: i32, config: &GameConfig, rng: StdRng) -> Self {
        Self {
            grid: Grid::walled(width, height),
            players: PlayerMap::new(),
            food: Vec::new(),
            bonus_active: false,
            bonus_ticks_left: 0,
            bonus_frames: config.bonus_frames(),
            food_spawn_limit: config.food_spawn_limit,
            rng,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn players(&self) -> &PlayerMap {
        &self.players
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn food(&self) -> &[Coord] {
        &self.food
    }

    pub fn bonus_active(&self) -> bool {
        self.bonus_active
    }

    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.alive).count()
    }

    /// Places a fresh snake with its head on `position`, replacing any
    /// previous record under the same id.
    pub fn add_player(&mut self, id: &str, position: Coord) -> Result<(), GridError> {
        self.grid.set(position, Cell::Player)?;
        self.players.insert(id.to_string(), Player::new(id, position));
        info!("Added player {} at {}", id, position);
        Ok(())
    }

    /// Start cells for a freshly started pool: the middle column, fanning
    /// out two rows at a time above and below the middle row.
    pub fn starting_positions(&self, count: usize) -> Vec<Coord> {
        let center_x = self.grid.width() / 2;
        let center_y = self.grid.height() / 2;

        (0..count as i32)
            .map(|i| {
                let offset = if i % 2 == 0 { i } else { -(i + 1) };
                Coord::new(center_x, center_y + offset)
            })
            .collect()
    }

    /// Probes random interior cells for one whose 5x5 neighbourhood is
    /// completely empty. `None` once the attempt budget is spent.
    pub fn find_spawn_point(&mut self) -> Option<Coord> {
        for _ in 0..SPAWN_ATTEMPTS {
            let candidate = self.random_interior()?;
            let clear = (-SPAWN_CLEARANCE..=SPAWN_CLEARANCE).all(|dy| {
                (-SPAWN_CLEARANCE..=SPAWN_CLEARANCE).all(|dx| {
                    let cell = self.grid.get(Coord::new(candidate.x + dx, candidate.y + dy));
                    cell == Ok(Cell::Empty)
                })
            });
            if clear {
                return Some(candidate);
            }
        }
        None
    }

    /// Records the direction the snake takes on its next move.
    pub fn set_direction(&mut self, id: &str, direction: Direction) -> bool {
        match self.players.get_mut(id) {
            Some(player) => {
                player.direction = direction;
                true
            }
            None => false,
        }
    }

    /// Ends a snake's game without removing its record or its body.
    pub fn mark_dead(&mut self, id: &str) -> bool {
        match self.players.get_mut(id) {
            Some(player) => {
                player.alive = false;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_dead(&mut self) {
        for player in self.players.values_mut() {
            player.alive = false;
        }
    }

    /// Advances one snake by one cell.
    pub fn update_player(&mut self, id: &str) -> StepOutcome {
        let Some(player) = self.players.get(id) else {
            return StepOutcome::Inactive;
        };
        if !player.alive {
            return StepOutcome::Inactive;
        }

        let previous = player.position;
        let direction = player.direction;
        let candidate = previous.step(direction);
        debug_assert_eq!(previous.manhattan(candidate), 1);
        let next = candidate.wrap_within(self.grid.width(), self.grid.height());

        let cell = match self.grid.get(next) {
            Ok(cell) => cell,
            Err(e) => {
                debug!("Skipping move of {} to {}: {}", id, next, e);
                return StepOutcome::Skipped(e);
            }
        };

        let Some(player) = self.players.get_mut(id) else {
            return StepOutcome::Inactive;
        };
        player.committed_direction = direction;

        if cell.is_solid() {
            player.alive = false;
            info!("Player {} crashed at {}", id, next);
            return StepOutcome::Died;
        }

        player.position = next;
        let outcome = if cell == Cell::Food {
            self.food.retain(|food| *food != next);
            player.tail.push_back(previous);
            self.bonus_active = true;
            self.bonus_ticks_left = self.bonus_frames;
            StepOutcome::Ate
        } else {
            let vacated = if player.tail.is_empty() {
                previous
            } else {
                player.tail.push_back(previous);
                player.tail.pop_front().unwrap_or(previous)
            };
            if let Err(e) = self.grid.set(vacated, Cell::Empty) {
                debug!("Could not clear {} behind {}: {}", vacated, id, e);
            }
            StepOutcome::Moved
        };

        if let Err(e) = self.grid.set(next, Cell::Player) {
            debug!("Could not mark head of {} at {}: {}", id, next, e);
        }
        outcome
    }

    /// Moves every living snake once, in ascending id order. An earlier
    /// snake claims a contested cell and a later one runs into it.
    /// Returns how many snakes were alive before the step.
    pub fn step_players(&mut self) -> usize {
        let alive: Vec<String> = self
            .players
            .values()
            .filter(|p| p.alive)
            .map(|p| p.id.clone())
            .collect();

        for id in &alive {
            self.update_player(id);
        }
        alive.len()
    }

    /// Counts the bonus flag down by one tick. Returns true on the tick
    /// that clears it.
    pub fn tick_bonus(&mut self) -> bool {
        if !self.bonus_active {
            return false;
        }
        self.bonus_ticks_left = self.bonus_ticks_left.saturating_sub(1);
        if self.bonus_ticks_left == 0 {
            self.bonus_active = false;
            return true;
        }
        false
    }

    fn random_interior(&mut self) -> Option<Coord> {
        let (width, height) = (self.grid.width(), self.grid.height());
        if width < 2 || height < 2 {
            return None;
        }
        Some(Coord::new(
            self.rng.gen_range(1..width),
            self.rng.gen_range(1..height),
        ))
    }

    /// Drops one food item on a random empty interior cell. Gives up
    /// quietly after `SPAWN_ATTEMPTS` misses.
    pub fn spawn_food(&mut self) -> Option<Coord> {
        for _ in 0..SPAWN_ATTEMPTS {
            let candidate = self.random_interior()?;
            if self.grid.get(candidate) == Ok(Cell::Empty) {
                self.place_food(candidate).ok()?;
                return Some(candidate);
            }
        }
        None
    }

    /// Puts food on a specific cell.
    pub fn place_food(&mut self, coord: Coord) -> Result<(), GridError> {
        self.grid.set(coord, Cell::Food)?;
        self.food.push(coord);
        Ok(())
    }

    /// Forgets food whose cell no longer reads as food.
    pub fn reap_stale_food(&mut self) -> usize {
        let before = self.food.len();
        let grid = &self.grid;
        self.food.retain(|coord| grid.get(*coord) == Ok(Cell::Food));
        before - self.food.len()
    }

    /// Reaps stale food, then tops the board back up to the food limit.
    pub fn sweep_food(&mut self) {
        let reaped = self.reap_stale_food();
        if reaped > 0 {
            debug!("Reaped {} stale food items", reaped);
        }
        while self.food.len() < self.food_spawn_limit {
            if self.spawn_food().is_none() {
                break;
            }
        }
    }

    /// Resizes the board and repaints walls, snakes and food onto it.
    /// Anything that no longer fits stays in the state but off the board.
    pub fn resize(&mut self, width: i32, height: i32) {
        self.grid.reload(width, height);
        self.grid.draw_border();

        for player in self.players.values() {
            for cell in player.cells() {
                let _ = self.grid.set(cell, Cell::Player);
            }
        }
        for food in &self.food {
            let _ = self.grid.set(*food, Cell::Food);
        }
    }

    pub fn snapshot(&self, ticks_per_second: u32) -> Snapshot {
        Snapshot {
            players: self.players.clone(),
            food: self.food.clone(),
            bonus_active: self.bonus_active,
            ticks_per_second,
        }
    }
}
