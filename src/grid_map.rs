//! Per-cell contamination lifecycle.
//!
//! Cells move strictly Clean -> Contaminated (seed only) -> PartiallyTreated
//! -> Clean. Every mutator reports `false` instead of applying an illegal
//! transition, so repeated calls are harmless.

use tracing::warn;

use crate::error::{Result, SimError};
use crate::types::Position;

/// Largest grid `initialize` accepts, in cells.
pub const MAX_CELLS: usize = 1 << 26;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    Clean,
    Contaminated,
    PartiallyTreated,
}

#[derive(Debug, Default)]
pub struct GridMap {
    width: i32,
    height: i32,
    // Row-major, `width * height` entries.
    cells: Vec<CellState>,
}

impl GridMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the grid with a fresh `width` x `height` map seeded from
    /// `seed`. On failure the previous map is left untouched.
    pub fn initialize(&mut self, width: i32, height: i32, seed: &[Position]) -> Result<()> {
        if width <= 0 || height <= 0 {
            warn!(width, height, "grid dimensions must be positive");
            return Err(SimError::InvalidDimensions { width, height });
        }

        let count = (width as usize)
            .checked_mul(height as usize)
            .filter(|&count| count <= MAX_CELLS)
            .ok_or(SimError::GridTooLarge {
                width,
                height,
                max: MAX_CELLS,
            })?;

        let mut cells = vec![CellState::Clean; count];
        for spot in seed {
            if !within(width, height, *spot) {
                warn!(x = spot.x, y = spot.y, "seed cell out of bounds");
                return Err(SimError::SeedOutOfBounds {
                    x: spot.x,
                    y: spot.y,
                    width,
                    height,
                });
            }
            // Duplicate seed entries collapse onto the same cell.
            cells[spot.y as usize * width as usize + spot.x as usize] = CellState::Contaminated;
        }

        self.width = width;
        self.height = height;
        self.cells = cells;
        Ok(())
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, cell: Position) -> bool {
        within(self.width, self.height, cell)
    }

    /// State of `cell`, or `None` outside the grid.
    pub fn state(&self, cell: Position) -> Option<CellState> {
        self.index(cell).map(|idx| self.cells[idx])
    }

    pub fn is_contaminated(&self, cell: Position) -> bool {
        self.state(cell) == Some(CellState::Contaminated)
    }

    pub fn needs_finishing(&self, cell: Position) -> bool {
        self.state(cell) == Some(CellState::PartiallyTreated)
    }

    /// Contaminated -> PartiallyTreated.
    pub fn mark_collected(&mut self, cell: Position) -> bool {
        self.transition(cell, CellState::Contaminated, CellState::PartiallyTreated)
    }

    /// PartiallyTreated -> Clean.
    pub fn mark_finished(&mut self, cell: Position) -> bool {
        self.transition(cell, CellState::PartiallyTreated, CellState::Clean)
    }

    /// Number of cells that are not yet Clean.
    pub fn remaining(&self) -> usize {
        self.cells
            .iter()
            .filter(|state| **state != CellState::Clean)
            .count()
    }

    pub fn is_all_clean(&self) -> bool {
        self.remaining() == 0
    }

    fn transition(&mut self, cell: Position, from: CellState, to: CellState) -> bool {
        match self.index(cell) {
            Some(idx) if self.cells[idx] == from => {
                self.cells[idx] = to;
                true
            }
            _ => false,
        }
    }

    fn index(&self, cell: Position) -> Option<usize> {
        if self.in_bounds(cell) {
            Some(cell.y as usize * self.width as usize + cell.x as usize)
        } else {
            None
        }
    }
}

fn within(width: i32, height: i32, cell: Position) -> bool {
    cell.x >= 0 && cell.y >= 0 && cell.x < width && cell.y < height
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn contamination_matches_seed_exactly() {
        let mut map = GridMap::new();
        let seed = [p(0, 0), p(2, 1), p(3, 3)];
        map.initialize(4, 4, &seed).expect("valid grid");
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(map.is_contaminated(p(x, y)), seed.contains(&p(x, y)));
            }
        }
    }

    #[test]
    fn rejects_non_positive_dimensions() {
        let mut map = GridMap::new();
        assert!(matches!(
            map.initialize(0, 3, &[]),
            Err(SimError::InvalidDimensions { width: 0, height: 3 })
        ));
        assert!(map.initialize(3, -1, &[]).is_err());
    }

    #[test]
    fn out_of_bounds_seed_leaves_previous_map_intact() {
        let mut map = GridMap::new();
        map.initialize(2, 2, &[p(1, 1)]).expect("valid grid");
        let err = map.initialize(5, 5, &[p(0, 0), p(5, 0)]);
        assert!(matches!(err, Err(SimError::SeedOutOfBounds { x: 5, y: 0, .. })));
        assert_eq!(map.width(), 2);
        assert!(map.is_contaminated(p(1, 1)));
        assert!(!map.in_bounds(p(3, 3)));
    }

    #[test]
    fn oversized_grid_is_an_error_not_an_abort() {
        let mut map = GridMap::new();
        map.initialize(2, 2, &[p(0, 1)]).expect("valid grid");
        assert!(matches!(
            map.initialize(100_000, 100_000, &[]),
            Err(SimError::GridTooLarge { width: 100_000, .. })
        ));
        assert!(map.initialize(i32::MAX, i32::MAX, &[]).is_err());
        assert_eq!(map.width(), 2);
        assert!(map.is_contaminated(p(0, 1)));
    }

    #[test]
    fn duplicate_seed_is_recorded_once() {
        let mut map = GridMap::new();
        map.initialize(4, 4, &[p(3, 3), p(3, 3), p(3, 3)])
            .expect("valid grid");
        assert_eq!(map.remaining(), 1);
    }

    #[test]
    fn lifecycle_transitions_are_strict_and_idempotent() {
        let mut map = GridMap::new();
        map.initialize(3, 3, &[p(1, 1)]).expect("valid grid");

        assert!(!map.mark_finished(p(1, 1)));
        assert!(map.mark_collected(p(1, 1)));
        assert!(!map.mark_collected(p(1, 1)));
        assert!(map.needs_finishing(p(1, 1)));

        assert!(map.mark_finished(p(1, 1)));
        assert!(!map.mark_finished(p(1, 1)));
        assert_eq!(map.state(p(1, 1)), Some(CellState::Clean));

        // Clean cells never accept a collection.
        assert!(!map.mark_collected(p(0, 0)));
        assert_eq!(map.state(p(0, 0)), Some(CellState::Clean));
        assert!(map.is_all_clean());
    }

    #[test]
    fn queries_outside_grid_are_false() {
        let mut map = GridMap::new();
        map.initialize(2, 2, &[p(0, 0)]).expect("valid grid");
        assert!(!map.is_contaminated(p(-1, 0)));
        assert!(!map.mark_collected(p(2, 2)));
        assert_eq!(map.state(p(0, 9)), None);
    }
}
