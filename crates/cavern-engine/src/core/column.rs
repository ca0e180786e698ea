use std::{fmt, ops::Range};

use serde::{Deserialize, Serialize};

use super::HEIGHT;

const ALL_BLOCKED: u32 = (1 << HEIGHT) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum Cell {
    Open,
    Blocked,
}

/// Single column of the cavern.
///
/// Stored as a 32-bit mask where bit `row` is set when the cell at `row` is
/// blocked. Bits at and above `HEIGHT` are always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    blocked: u32,
}

impl Default for Column {
    fn default() -> Self {
        Self::OPEN
    }
}

impl Column {
    pub const OPEN: Self = Self { blocked: 0 };
    pub const BLOCKED: Self = Self {
        blocked: ALL_BLOCKED,
    };

    /// Creates a blocked column with the rows in `open` carved out.
    #[must_use]
    pub fn carved(open: Range<usize>) -> Self {
        let mut column = Self::BLOCKED;
        column.open_rows(open);
        column
    }

    /// Builds a column from cells listed top to bottom.
    ///
    /// Missing trailing cells are open; cells beyond `HEIGHT` are ignored.
    pub fn from_cells<I>(cells: I) -> Self
    where
        I: IntoIterator<Item = Cell>,
    {
        let blocked = cells
            .into_iter()
            .take(HEIGHT)
            .enumerate()
            .filter(|(_, cell)| cell.is_blocked())
            .fold(0, |acc, (row, _)| acc | (1 << row));
        Self { blocked }
    }

    #[inline]
    #[must_use]
    pub fn cell(self, row: usize) -> Cell {
        if self.is_blocked(row) {
            Cell::Blocked
        } else {
            Cell::Open
        }
    }

    /// Checks whether the cell at `row` is blocked.
    ///
    /// Rows outside the column count as blocked.
    #[inline]
    #[must_use]
    pub fn is_blocked(self, row: usize) -> bool {
        row >= HEIGHT || (self.blocked & (1 << row)) != 0
    }

    pub fn iter_cells(self) -> impl Iterator<Item = Cell> {
        (0..HEIGHT).map(move |row| self.cell(row))
    }

    /// Marks every cell blocked.
    pub fn block_all(&mut self) {
        self.blocked = ALL_BLOCKED;
    }

    /// Marks every cell open.
    pub fn open_all(&mut self) {
        self.blocked = 0;
    }

    /// Opens the rows in `rows`, clipped to the column height.
    pub fn open_rows(&mut self, rows: Range<usize>) {
        let start = rows.start.min(HEIGHT);
        let end = rows.end.min(HEIGHT);
        if start >= end {
            return;
        }
        let mask = ((1 << end) - 1) & !((1 << start) - 1);
        self.blocked &= !mask;
    }

    /// Counts consecutive open cells from `row` upward (towards row 0), `row` included.
    #[must_use]
    pub fn open_run_up(self, row: usize) -> usize {
        if row >= HEIGHT {
            return 0;
        }
        let window = self.blocked & ((1 << (row + 1)) - 1);
        if window == 0 {
            return row + 1;
        }
        let nearest_blocked = (u32::BITS - 1 - window.leading_zeros()) as usize;
        row - nearest_blocked
    }

    /// Counts consecutive open cells from `row` downward (towards the last row), `row` included.
    #[must_use]
    pub fn open_run_down(self, row: usize) -> usize {
        if row >= HEIGHT {
            return 0;
        }
        let run = (self.blocked >> row).trailing_zeros() as usize;
        run.min(HEIGHT - row)
    }

    /// Open cells between the top edge and the first blocked cell.
    #[must_use]
    pub fn top_clearance(self) -> usize {
        self.open_run_down(0)
    }

    /// Open cells between the bottom edge and the first blocked cell.
    #[must_use]
    pub fn bottom_clearance(self) -> usize {
        self.open_run_up(HEIGHT - 1)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cell in self.iter_cells() {
            let ch = match cell {
                Cell::Open => '.',
                Cell::Blocked => '#',
            };
            write!(f, "{ch}")?;
        }
        Ok(())
    }
}
