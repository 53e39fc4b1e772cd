use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;

/// Greeting a client sends right after connecting.
pub const JOIN: &str = "Join";
/// Server reply when the greeting was understood.
pub const ACCEPT: &str = "Accept";
/// Server reply when the greeting was not understood.
pub const REJECTED: &str = "Rejected";
/// Lobby status line repeated while a pool waits for players.
pub const WAITING: &str = "waiting";

/// Player records keyed by client id. Ordered so every tick walks the
/// players in the same (ascending id) order.
pub type PlayerMap = BTreeMap<String, Player>;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Unit step in `direction`. Grid origin is the top-left corner.
    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn manhattan(self, other: Coord) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Folds a coordinate that stepped onto or past the border of a
    /// `width` x `height` board back into the interior on the opposite
    /// side. X is settled before Y; a single-axis step only ever needs one.
    pub fn wrap_within(self, width: i32, height: i32) -> Self {
        if self.x <= 0 {
            Self::new(width - 1, self.y)
        } else if self.x >= width {
            Self::new(1, self.y)
        } else if self.y <= 0 {
            Self::new(self.x, height - 1)
        } else if self.y >= height {
            Self::new(self.x, 1)
        } else {
            self
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }

    /// The literal token used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Right => "right",
            Direction::Down => "down",
            Direction::Left => "left",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a direction: {0:?}")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    /// Exact, case-sensitive match against the four wire tokens.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "right" => Ok(Direction::Right),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            other => Err(ParseDirectionError(other.to_string())),
        }
    }
}

/// One snake as seen by every client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: String,
    pub position: Coord,
    /// Direction requested by the client, applied on the next move.
    pub direction: Direction,
    /// Direction of the last move actually made.
    pub committed_direction: Direction,
    /// Body segments, oldest first.
    pub tail: VecDeque<Coord>,
    pub alive: bool,
}

impl Player {
    pub fn new(id: impl Into<String>, position: Coord) -> Self {
        Self {
            id: id.into(),
            position,
            direction: Direction::Right,
            committed_direction: Direction::Right,
            tail: VecDeque::new(),
            alive: true,
        }
    }

    /// Every cell covered by this snake, head first.
    pub fn cells(&self) -> impl Iterator<Item = Coord> + '_ {
        std::iter::once(self.position).chain(self.tail.iter().copied())
    }

    pub fn size(&self) -> usize {
        self.tail.len() + 1
    }
}

/// Per-tick state pushed to every client of a pool.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub players: PlayerMap,
    pub food: Vec<Coord>,
    pub bonus_active: bool,
    pub ticks_per_second: u32,
}

/// First packet a client receives once its pool starts (or once it
/// joins a running pool). Carries the board size and the client's own id
/// on top of the regular snapshot fields.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InitialSnapshot {
    pub client_id: String,
    /// Milliseconds since the Unix epoch when the game started.
    pub start_time: u64,
    pub width: i32,
    pub height: i32,
    #[serde(flatten)]
    pub state: Snapshot,
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed server line {line:?}: {source}")]
    Malformed {
        line: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Every line a server can send, decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerLine {
    Accept,
    Rejected,
    Waiting,
    Initial(InitialSnapshot),
    Update(Snapshot),
}

impl ServerLine {
    /// Decodes one line with its trailing newline already stripped.
    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        match line {
            ACCEPT => return Ok(ServerLine::Accept),
            REJECTED => return Ok(ServerLine::Rejected),
            WAITING => return Ok(ServerLine::Waiting),
            _ => {}
        }

        let value: serde_json::Value =
            serde_json::from_str(line).map_err(|source| ProtocolError::Malformed {
                line: line.to_string(),
                source,
            })?;

        let decoded = if value.get("client_id").is_some() {
            serde_json::from_value(value).map(ServerLine::Initial)
        } else {
            serde_json::from_value(value).map(ServerLine::Update)
        };

        decoded.map_err(|source| ProtocolError::Malformed {
            line: line.to_string(),
            source,
        })
    }
}

/// Serializes `value` as one JSON document terminated by `\n`.
pub fn encode_line<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    Ok(line)
}

/// A bare status line (`Join`, `Accept`, a direction, ...) with its newline.
pub fn text_line(text: &str) -> String {
    format!("{text}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parsing_is_exact() {
        assert_eq!("up".parse::<Direction>(), Ok(Direction::Up));
        assert_eq!("right".parse::<Direction>(), Ok(Direction::Right));
        assert_eq!("down".parse::<Direction>(), Ok(Direction::Down));
        assert_eq!("left".parse::<Direction>(), Ok(Direction::Left));

        assert!("Up".parse::<Direction>().is_err());
        assert!("sideways".parse::<Direction>().is_err());
        assert!(" up".parse::<Direction>().is_err());
        assert!("".parse::<Direction>().is_err());
    }

    #[test]
    fn test_direction_tokens_match_display() {
        for direction in Direction::ALL {
            assert_eq!(direction.to_string().parse::<Direction>(), Ok(direction));
            assert_eq!(direction.opposite().opposite(), direction);
            assert_ne!(direction.opposite(), direction);
        }
    }

    #[test]
    fn test_coord_step_is_single_axis() {
        let origin = Coord::new(5, 5);
        assert_eq!(origin.step(Direction::Up), Coord::new(5, 4));
        assert_eq!(origin.step(Direction::Down), Coord::new(5, 6));
        assert_eq!(origin.step(Direction::Left), Coord::new(4, 5));
        assert_eq!(origin.step(Direction::Right), Coord::new(6, 5));

        for direction in Direction::ALL {
            assert_eq!(origin.manhattan(origin.step(direction)), 1);
        }
    }

    #[test]
    fn test_wrap_within_folds_each_edge() {
        assert_eq!(Coord::new(10, 5).wrap_within(10, 10), Coord::new(1, 5));
        assert_eq!(Coord::new(0, 5).wrap_within(10, 10), Coord::new(9, 5));
        assert_eq!(Coord::new(5, 0).wrap_within(10, 8), Coord::new(5, 7));
        assert_eq!(Coord::new(5, 8).wrap_within(10, 8), Coord::new(5, 1));
        assert_eq!(Coord::new(4, 4).wrap_within(10, 8), Coord::new(4, 4));
    }

    #[test]
    fn test_player_creation() {
        let player = Player::new("127.0.0.1:4000", Coord::new(3, 4));
        assert_eq!(player.id, "127.0.0.1:4000");
        assert_eq!(player.position, Coord::new(3, 4));
        assert_eq!(player.direction, Direction::Right);
        assert_eq!(player.committed_direction, Direction::Right);
        assert!(player.tail.is_empty());
        assert!(player.alive);
        assert_eq!(player.size(), 1);
    }

    #[test]
    fn test_player_cells_head_first() {
        let mut player = Player::new("a", Coord::new(3, 3));
        player.tail.push_back(Coord::new(1, 3));
        player.tail.push_back(Coord::new(2, 3));

        let cells: Vec<Coord> = player.cells().collect();
        assert_eq!(
            cells,
            vec![Coord::new(3, 3), Coord::new(1, 3), Coord::new(2, 3)]
        );
    }

    #[test]
    fn test_direction_serializes_as_token() {
        let json = serde_json::to_string(&Direction::Left).unwrap();
        assert_eq!(json, "\"left\"");
    }

    #[test]
    fn test_initial_snapshot_wire_fields() {
        let mut players = PlayerMap::new();
        players.insert("a".to_string(), Player::new("a", Coord::new(1, 1)));

        let packet = InitialSnapshot {
            client_id: "a".to_string(),
            start_time: 1_700_000_000_000,
            width: 64,
            height: 32,
            state: Snapshot {
                players,
                food: vec![Coord::new(2, 2)],
                bonus_active: false,
                ticks_per_second: 30,
            },
        };

        let line = encode_line(&packet).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);

        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        for field in [
            "client_id",
            "players",
            "food",
            "start_time",
            "bonus_active",
            "ticks_per_second",
            "width",
            "height",
        ] {
            assert!(value.get(field).is_some(), "missing field {field}");
        }
    }

    #[test]
    fn test_decode_status_lines() {
        assert_eq!(ServerLine::decode("Accept").unwrap(), ServerLine::Accept);
        assert_eq!(ServerLine::decode("Rejected").unwrap(), ServerLine::Rejected);
        assert_eq!(ServerLine::decode("waiting").unwrap(), ServerLine::Waiting);
    }

    #[test]
    fn test_decode_distinguishes_initial_and_update() {
        let update = Snapshot {
            players: PlayerMap::new(),
            food: vec![Coord::new(4, 4)],
            bonus_active: true,
            ticks_per_second: 29,
        };
        let line = encode_line(&update).unwrap();
        match ServerLine::decode(line.trim_end()).unwrap() {
            ServerLine::Update(snapshot) => assert_eq!(snapshot, update),
            other => panic!("expected update, got {other:?}"),
        }

        let initial = InitialSnapshot {
            client_id: "me".to_string(),
            start_time: 0,
            width: 10,
            height: 10,
            state: update,
        };
        let line = encode_line(&initial).unwrap();
        match ServerLine::decode(line.trim_end()).unwrap() {
            ServerLine::Initial(packet) => {
                assert_eq!(packet.client_id, "me");
                assert_eq!(packet.width, 10);
                assert_eq!(packet.state.food, vec![Coord::new(4, 4)]);
            }
            other => panic!("expected initial snapshot, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(ServerLine::decode("hello there").is_err());
        assert!(ServerLine::decode("{\"players\": 3}").is_err());
    }

    #[test]
    fn test_text_line() {
        assert_eq!(text_line(JOIN), "Join\n");
        assert_eq!(text_line(Direction::Down.as_str()), "down\n");
    }
}
