use serde::{Deserialize, Serialize};

use crate::core::HEIGHT;

/// Row the player starts at and returns to on reset.
pub const PLAYER_START_ROW: usize = 11;

/// Vertical position of the player inside [`PLAYER_COLUMN`](crate::PLAYER_COLUMN).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    row: usize,
}

impl Default for Player {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl Player {
    pub const INITIAL: Self = Self {
        row: PLAYER_START_ROW,
    };

    /// Creates a player at `row`, clamped to the grid.
    #[must_use]
    pub fn at_row(row: usize) -> Self {
        Self {
            row: row.min(HEIGHT - 1),
        }
    }

    #[must_use]
    pub const fn row(self) -> usize {
        self.row
    }

    /// Moves by `step` rows (negative is up), staying inside `0..HEIGHT`.
    pub fn move_by(&mut self, step: i32) {
        let step = isize::try_from(step).unwrap_or(if step < 0 { isize::MIN } else { isize::MAX });
        self.row = self.row.saturating_add_signed(step).min(HEIGHT - 1);
    }

    pub fn recenter(&mut self) {
        *self = Self::INITIAL;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_is_clamped() {
        let mut player = Player::INITIAL;
        player.move_by(-1000);
        assert_eq!(player.row(), 0);
        player.move_by(1000);
        assert_eq!(player.row(), HEIGHT - 1);
        player.move_by(i32::MIN);
        assert_eq!(player.row(), 0);
        player.move_by(i32::MAX);
        assert_eq!(player.row(), 19);
    }

    #[test]
    fn test_unit_moves() {
        let mut player = Player::INITIAL;
        player.move_by(-1);
        assert_eq!(player.row(), PLAYER_START_ROW - 1);
        player.move_by(0);
        assert_eq!(player.row(), PLAYER_START_ROW - 1);
        player.move_by(2);
        assert_eq!(player.row(), PLAYER_START_ROW + 1);
        player.recenter();
        assert_eq!(player, Player::INITIAL);
    }

    #[test]
    fn test_at_row_clamps() {
        assert_eq!(Player::at_row(99).row(), HEIGHT - 1);
    }
}
