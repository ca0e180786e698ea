use std::fmt;

use super::{Cell, Column, HEIGHT, WIDTH};

/// Rolling grid of `WIDTH` columns.
///
/// Columns live in a fixed array addressed through a rotating head offset, so
/// scrolling the cavern never allocates. Logical index 0 is the oldest column
/// (left edge) and `WIDTH - 1` the newest (right edge).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CavernGrid {
    columns: [Column; WIDTH],
    head: usize,
}

impl Default for CavernGrid {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl CavernGrid {
    /// Grid with every cell open.
    pub const INITIAL: Self = Self {
        columns: [Column::OPEN; WIDTH],
        head: 0,
    };

    #[inline]
    fn slot(&self, index: usize) -> usize {
        debug_assert!(index < WIDTH);
        (self.head + index) % WIDTH
    }

    /// Returns the column at logical `index`, clamped to the last column.
    #[must_use]
    pub fn column(&self, index: usize) -> Column {
        self.columns[self.slot(index.min(WIDTH - 1))]
    }

    /// Replaces the column at logical `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= WIDTH`.
    pub fn set_column(&mut self, index: usize, column: Column) {
        assert!(index < WIDTH, "column index {index} out of range");
        let slot = self.slot(index);
        self.columns[slot] = column;
    }

    #[must_use]
    pub fn cell(&self, x: usize, y: usize) -> Cell {
        self.column(x).cell(y)
    }

    #[must_use]
    pub fn is_blocked(&self, x: usize, y: usize) -> bool {
        x >= WIDTH || self.column(x).is_blocked(y)
    }

    /// Iterates columns from oldest to newest.
    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        (0..WIDTH).map(|index| self.column(index))
    }

    /// Moves the oldest column to the newest position and returns it for reuse.
    ///
    /// Every other column shifts one index to the left.
    pub fn recycle_oldest(&mut self) -> &mut Column {
        let slot = self.head;
        self.head = (self.head + 1) % WIDTH;
        &mut self.columns[slot]
    }

    /// Opens every cell.
    pub fn clear(&mut self) {
        for column in &mut self.columns {
            column.open_all();
        }
    }
}

impl fmt::Display for CavernGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..HEIGHT {
            for column in self.columns() {
                let ch = match column.cell(row) {
                    Cell::Open => '.',
                    Cell::Blocked => '#',
                };
                write!(f, "{ch}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_grid_is_open() {
        let grid = CavernGrid::INITIAL;
        assert_eq!(grid.columns().count(), WIDTH);
        assert!(grid.columns().all(|c| c == Column::OPEN));
    }

    #[test]
    fn test_recycle_moves_oldest_to_tail() {
        let mut grid = CavernGrid::INITIAL;
        grid.set_column(0, Column::carved(0..1));
        grid.set_column(1, Column::carved(0..2));

        let recycled = grid.recycle_oldest();
        assert_eq!(*recycled, Column::carved(0..1));
        recycled.block_all();

        assert_eq!(grid.column(0), Column::carved(0..2));
        assert_eq!(grid.column(WIDTH - 1), Column::BLOCKED);
        assert_eq!(grid.columns().count(), WIDTH);
    }

    #[test]
    fn test_head_wraps_around() {
        let mut grid = CavernGrid::INITIAL;
        for i in 0..(WIDTH * 2 + 3) {
            *grid.recycle_oldest() = Column::carved(0..(i % HEIGHT));
        }
        // the last WIDTH recycled columns are in generation order
        let last = WIDTH * 2 + 2;
        for index in 0..WIDTH {
            let generation = last + 1 - WIDTH + index;
            assert_eq!(grid.column(index), Column::carved(0..(generation % HEIGHT)));
        }
    }

    #[test]
    fn test_column_index_is_clamped() {
        let mut grid = CavernGrid::INITIAL;
        grid.set_column(WIDTH - 1, Column::BLOCKED);
        assert_eq!(grid.column(WIDTH + 5), Column::BLOCKED);
        assert!(grid.is_blocked(WIDTH, 0));
    }

    #[test]
    fn test_clear_opens_everything() {
        let mut grid = CavernGrid::INITIAL;
        for _ in 0..7 {
            grid.recycle_oldest().block_all();
        }
        grid.clear();
        assert_eq!(grid.columns().filter(|c| *c != Column::OPEN).count(), 0);
    }

    #[test]
    fn test_display_is_row_major() {
        let mut grid = CavernGrid::INITIAL;
        grid.set_column(0, Column::BLOCKED);
        let text = grid.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), HEIGHT);
        assert!(lines.iter().all(|l| l.len() == WIDTH && l.starts_with("#.")));
    }
}
