//! Per-player trail state owned by the match engine.

use shared::{Coordinate, Direction, MAX_PLAYERS};
use std::collections::VecDeque;

/// Starting cell and heading for a seat.
///
/// Seats sit on the middle of each edge facing inwards: top, left, bottom,
/// right. Returns `None` for seats beyond the supported maximum.
pub fn initial_slot_position(
    slot: usize,
    height: usize,
    width: usize,
) -> Option<(Coordinate, Direction)> {
    if slot >= MAX_PLAYERS {
        return None;
    }

    let mid_x = (width / 2) as i32;
    let mid_y = (height / 2) as i32;
    let last_x = width.saturating_sub(1) as i32;
    let last_y = height.saturating_sub(1) as i32;

    let start = match slot {
        0 => (Coordinate::new(mid_x, 0), Direction::Down),
        1 => (Coordinate::new(0, mid_y), Direction::Right),
        2 => (Coordinate::new(mid_x, last_y), Direction::Up),
        _ => (Coordinate::new(last_x, mid_y), Direction::Left),
    };
    Some(start)
}

#[derive(Debug, Clone)]
pub struct Player {
    pub slot: usize,
    pub heading: Direction,
    pub position: Coordinate,
    /// Previously occupied cells, oldest first. The head is not included.
    pub trail: VecDeque<Coordinate>,
    pub score: u64,
}

impl Player {
    pub fn new(slot: usize, position: Coordinate, heading: Direction) -> Self {
        Self {
            slot,
            heading,
            position,
            trail: VecDeque::new(),
            score: 0,
        }
    }

    /// Where the head lands after one step along the current heading.
    pub fn advance(&self) -> Coordinate {
        self.position.step(self.heading)
    }

    /// Moves the head one cell, leaving the old head on the trail.
    pub fn step(&mut self) -> Coordinate {
        self.trail.push_back(self.position);
        self.position = self.advance();
        self.position
    }

    /// Applies a heading change unless it stays on the current axis.
    pub fn turn(&mut self, direction: Direction) -> bool {
        if self.heading.same_axis(direction) {
            return false;
        }
        self.heading = direction;
        true
    }

    /// Every cell this player currently holds on the grid.
    pub fn occupied_cells(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.trail
            .iter()
            .copied()
            .chain(std::iter::once(self.position))
    }

    pub fn visible_path(&self) -> Vec<Coordinate> {
        self.occupied_cells().collect()
    }
}
