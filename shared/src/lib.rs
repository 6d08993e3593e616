use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_PLAYERS: usize = 4;
pub const PALETTE: [&str; MAX_PLAYERS] = ["#b71c1c", "#880E4F", "#4A148C", "#1A237E"];

/// Largest payload a single UDP datagram can carry over IPv4.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    /// Up/Down share the vertical axis, Left/Right the horizontal one.
    pub fn same_axis(self, other: Direction) -> bool {
        self.is_vertical() == other.is_vertical()
    }

    /// Unit step in grid space. The y axis grows downwards.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Visible path of one player: trail oldest-first, head last.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TrailInfo {
    pub coordinates: Vec<Coordinate>,
    pub color: String,
}

/// Per-tick render payload keyed by slot index.
pub type Trails = BTreeMap<usize, TrailInfo>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MatchSummary {
    pub match_id: String,
    pub height: u32,
    pub width: u32,
    pub joined: usize,
    pub required: usize,
}

pub fn slot_color(slot: usize) -> &'static str {
    PALETTE[slot % PALETTE.len()]
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    CreateMatch {
        height: u32,
        width: u32,
        required: usize,
    },
    ListMatches,
    JoinMatch {
        match_id: String,
    },
    Move {
        direction: Direction,
    },
    Heartbeat,
    Disconnect,

    Connected {
        client_id: u32,
    },
    MatchCreated {
        match_id: String,
    },
    MatchList {
        matches: Vec<MatchSummary>,
    },
    Joined {
        match_id: String,
        slot: usize,
        height: u32,
        width: u32,
        color: String,
    },
    Countdown {
        starts_in_ms: u64,
    },
    Frame {
        tick: u64,
        trails: Trails,
    },
    MatchOver {
        victory: bool,
        score: u64,
    },
    Rejected {
        reason: String,
    },
    Disconnected {
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_axes() {
        assert!(Direction::Up.same_axis(Direction::Down));
        assert!(Direction::Down.same_axis(Direction::Down));
        assert!(Direction::Left.same_axis(Direction::Right));
        assert!(!Direction::Up.same_axis(Direction::Left));
        assert!(!Direction::Right.same_axis(Direction::Down));
    }

    #[test]
    fn test_coordinate_step() {
        let origin = Coordinate::new(2, 2);
        assert_eq!(origin.step(Direction::Up), Coordinate::new(2, 1));
        assert_eq!(origin.step(Direction::Down), Coordinate::new(2, 3));
        assert_eq!(origin.step(Direction::Left), Coordinate::new(1, 2));
        assert_eq!(origin.step(Direction::Right), Coordinate::new(3, 2));
    }

    #[test]
    fn test_step_can_leave_grid() {
        let corner = Coordinate::new(0, 0);
        assert_eq!(corner.step(Direction::Left), Coordinate::new(-1, 0));
        assert_eq!(corner.step(Direction::Up), Coordinate::new(0, -1));
    }

    #[test]
    fn test_slot_colors_are_distinct() {
        let colors: Vec<&str> = (0..MAX_PLAYERS).map(slot_color).collect();
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_packet_serialization_move() {
        let packet = Packet::Move {
            direction: Direction::Left,
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Move { direction } => assert_eq!(direction, Direction::Left),
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_frame() {
        let mut trails = Trails::new();
        trails.insert(
            0,
            TrailInfo {
                coordinates: vec![Coordinate::new(2, 0), Coordinate::new(2, 1)],
                color: slot_color(0).to_string(),
            },
        );
        trails.insert(
            3,
            TrailInfo {
                coordinates: vec![Coordinate::new(4, 2)],
                color: slot_color(3).to_string(),
            },
        );

        let packet = Packet::Frame { tick: 7, trails };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Frame { tick, trails } => {
                assert_eq!(tick, 7);
                assert_eq!(trails.len(), 2);
                assert_eq!(trails[&0].coordinates.len(), 2);
                assert_eq!(trails[&0].coordinates[1], Coordinate::new(2, 1));
                assert_eq!(trails[&3].color, PALETTE[3]);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_match_list() {
        let packet = Packet::MatchList {
            matches: vec![MatchSummary {
                match_id: "abc".to_string(),
                height: 40,
                width: 60,
                joined: 1,
                required: 3,
            }],
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::MatchList { matches } => {
                assert_eq!(matches.len(), 1);
                assert_eq!(matches[0].match_id, "abc");
                assert_eq!(matches[0].required, 3);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }
}
