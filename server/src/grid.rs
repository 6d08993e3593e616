//! Occupancy grid for a single match.
//!
//! The grid is only ever touched from the match engine that owns it, so it
//! carries no synchronization of its own.

use shared::Coordinate;

#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl Grid {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, at: Coordinate) -> bool {
        at.x >= 0 && at.y >= 0 && (at.x as usize) < self.width && (at.y as usize) < self.height
    }

    /// Cells outside the grid are reported as free; callers check bounds first.
    pub fn occupied(&self, at: Coordinate) -> bool {
        self.index(at).map(|i| self.cells[i]).unwrap_or(false)
    }

    /// Writes outside the grid are ignored.
    pub fn set(&mut self, at: Coordinate, occupied: bool) {
        if let Some(i) = self.index(at) {
            self.cells[i] = occupied;
        }
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| **cell).count()
    }

    fn index(&self, at: Coordinate) -> Option<usize> {
        if self.in_bounds(at) {
            Some(at.y as usize * self.width + at.x as usize)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_is_empty() {
        let grid = Grid::new(3, 4);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.occupied_count(), 0);
    }

    #[test]
    fn test_bounds_follow_axes() {
        // Wider than tall: x may reach width - 1, y only height - 1.
        let grid = Grid::new(2, 5);
        assert!(grid.in_bounds(Coordinate::new(4, 1)));
        assert!(!grid.in_bounds(Coordinate::new(5, 0)));
        assert!(!grid.in_bounds(Coordinate::new(0, 2)));
        assert!(!grid.in_bounds(Coordinate::new(-1, 0)));
        assert!(!grid.in_bounds(Coordinate::new(0, -1)));
    }

    #[test]
    fn test_set_and_clear() {
        let mut grid = Grid::new(5, 5);
        let cell = Coordinate::new(1, 3);

        grid.set(cell, true);
        assert!(grid.occupied(cell));
        assert!(!grid.occupied(Coordinate::new(3, 1)));
        assert_eq!(grid.occupied_count(), 1);

        grid.set(cell, false);
        assert!(!grid.occupied(cell));
        assert_eq!(grid.occupied_count(), 0);
    }

    #[test]
    fn test_out_of_bounds_access_is_harmless() {
        let mut grid = Grid::new(2, 2);
        grid.set(Coordinate::new(2, 0), true);
        grid.set(Coordinate::new(-1, -1), true);
        assert_eq!(grid.occupied_count(), 0);
        assert!(!grid.occupied(Coordinate::new(7, 7)));
    }
}
