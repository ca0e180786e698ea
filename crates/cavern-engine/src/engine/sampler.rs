use serde::{Deserialize, Serialize};

use crate::core::{CavernGrid, HEIGHT, PLAYER_COLUMN};

/// Number of features in an [`Observation`].
pub const OBSERVATION_LEN: usize = 5;
/// Number of columns ahead of the player averaged into the look-ahead features.
pub const LOOK_AHEAD: usize = 2;

/// Fixed-size feature vector describing the player's surroundings.
///
/// | index | feature |
/// |-------|---------|
/// | 0 | open cells from the player upward, `/ HEIGHT` |
/// | 1 | open cells from the player downward, `/ HEIGHT` |
/// | 2 | average top clearance of the look-ahead columns, `/ HEIGHT` |
/// | 3 | average bottom clearance of the look-ahead columns, `/ HEIGHT` |
/// | 4 | player row, `/ HEIGHT` |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation([f64; OBSERVATION_LEN]);

impl Observation {
    #[must_use]
    pub const fn new(values: [f64; OBSERVATION_LEN]) -> Self {
        Self(values)
    }

    #[must_use]
    pub const fn values(&self) -> &[f64; OBSERVATION_LEN] {
        &self.0
    }

    #[must_use]
    pub const fn immediate_top(&self) -> f64 {
        self.0[0]
    }

    #[must_use]
    pub const fn immediate_bottom(&self) -> f64 {
        self.0[1]
    }

    #[must_use]
    pub const fn average_top(&self) -> f64 {
        self.0[2]
    }

    #[must_use]
    pub const fn average_bottom(&self) -> f64 {
        self.0[3]
    }

    #[must_use]
    pub const fn player_row(&self) -> f64 {
        self.0[4]
    }
}

impl AsRef<[f64]> for Observation {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

impl From<[f64; OBSERVATION_LEN]> for Observation {
    fn from(values: [f64; OBSERVATION_LEN]) -> Self {
        Self(values)
    }
}

/// Extracts the observation for a player at `player_row`.
///
/// Pure function of its inputs: identical grids and rows give identical vectors.
/// A player sitting on a blocked cell has zero immediate clearance.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn sample(grid: &CavernGrid, player_row: usize) -> Observation {
    let height = HEIGHT as f64;
    let player_column = grid.column(PLAYER_COLUMN);
    let immediate_top = player_column.open_run_up(player_row) as f64;
    let immediate_bottom = player_column.open_run_down(player_row) as f64;

    let (sum_top, sum_bottom) = (1..=LOOK_AHEAD)
        .map(|offset| grid.column(PLAYER_COLUMN + offset))
        .fold((0, 0), |(top, bottom), column| {
            (top + column.top_clearance(), bottom + column.bottom_clearance())
        });
    let average_top = sum_top as f64 / LOOK_AHEAD as f64;
    let average_bottom = sum_bottom as f64 / LOOK_AHEAD as f64;

    Observation([
        immediate_top / height,
        immediate_bottom / height,
        average_top / height,
        average_bottom / height,
        player_row as f64 / height,
    ])
}
