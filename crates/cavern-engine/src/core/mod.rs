//! Grid data structures.
//!
//! The cavern is a `WIDTH` x `HEIGHT` field of [`Cell`]s stored column by
//! column. Rows are numbered from the top (row 0) to the bottom
//! (row `HEIGHT - 1`); columns from the oldest (index 0, left edge) to the most
//! recently generated (index `WIDTH - 1`, right edge).

pub use self::{column::*, grid::*};

mod column;
mod grid;

/// Number of columns in the grid.
pub const WIDTH: usize = 30;
/// Number of cells in each column.
pub const HEIGHT: usize = 20;
/// Fixed column the player flies in.
pub const PLAYER_COLUMN: usize = 15;
