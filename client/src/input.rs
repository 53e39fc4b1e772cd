//! Turning wishes into direction commands
//!
//! A snake can never turn straight back onto its own neck, so every
//! steering request is checked against the direction of the last move the
//! server actually made. The autopilot builds on the same rule.

use crate::game::ClientGameState;
use shared::{Coord, Direction, Player};

/// The direction to send for `wanted`, or `None` when it would reverse the
/// last committed move or change nothing.
pub fn steer(player: &Player, wanted: Direction) -> Option<Direction> {
    if wanted == player.committed_direction.opposite() || wanted == player.direction {
        return None;
    }
    Some(wanted)
}

/// Greedy steering toward the nearest food
#[derive(Debug, Default, Clone, Copy)]
pub struct Autopilot;

impl Autopilot {
    /// Picks the best next direction for our snake. Cells covered by any
    /// snake are avoided when possible; among safe moves the one closest to
    /// the nearest food wins and the current heading breaks ties.
    pub fn choose(&self, state: &ClientGameState) -> Option<Direction> {
        let me = state.me().filter(|p| p.alive)?;
        let (width, height) = state.board_size()?;
        let occupied = state.occupied();
        let head = me.position;

        let target = state
            .food()
            .iter()
            .copied()
            .min_by_key(|food| head.manhattan(*food));

        Direction::ALL
            .into_iter()
            .filter(|d| *d != me.committed_direction.opposite())
            .map(|d| {
                let next = next_cell(head, d, (width, height));
                let blocked = occupied.contains(&next);
                let distance = target.map(|t| next.manhattan(t)).unwrap_or(0);
                let turn = d != me.direction;
                (d, (blocked, distance, turn))
            })
            .min_by_key(|(_, score)| *score)
            .map(|(d, _)| d)
    }

    /// Like `choose`, but only when it differs from the direction already
    /// requested.
    pub fn next_command(&self, state: &ClientGameState) -> Option<Direction> {
        let me = state.me()?;
        self.choose(state).and_then(|d| steer(me, d))
    }
}

/// Cell a snake would enter moving `direction` from `from`.
pub fn next_cell(from: Coord, direction: Direction, board: (i32, i32)) -> Coord {
    from.step(direction).wrap_within(board.0, board.1)
}
