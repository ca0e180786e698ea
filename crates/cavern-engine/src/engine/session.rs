use std::time::Duration;

use crate::core::{CavernGrid, PLAYER_COLUMN};

use super::{
    CarveState, CavernGenerator, CavernSeed, Observation, Player, RandomWalk, WalkSource, sample,
};

/// Design cadence of the external tick driver, in milliseconds.
pub const TICK_INTERVAL_MILLIS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum SessionState {
    Flying,
    Crashed,
}

/// A single flight through the cavern.
///
/// Owns the generator (and through it the grid), the player and the tick clock.
/// The session crashes as soon as the player's cell is blocked after a tick or
/// a move; a crashed session ignores ticks until [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct CavernSession<W = RandomWalk> {
    generator: CavernGenerator<W>,
    player: Player,
    state: SessionState,
    ticks: u64,
}

impl Default for CavernSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CavernSession {
    #[must_use]
    pub fn new() -> Self {
        Self::with_generator(CavernGenerator::new())
    }

    #[must_use]
    pub fn with_seed(seed: CavernSeed) -> Self {
        Self::with_generator(CavernGenerator::with_seed(seed))
    }
}

impl<W> CavernSession<W>
where
    W: WalkSource,
{
    #[must_use]
    pub fn with_generator(generator: CavernGenerator<W>) -> Self {
        Self {
            generator,
            player: Player::INITIAL,
            state: SessionState::Flying,
            ticks: 0,
        }
    }

    #[must_use]
    pub fn grid(&self) -> &CavernGrid {
        self.generator.grid()
    }

    #[must_use]
    pub fn carve_state(&self) -> CarveState {
        self.generator.carve_state()
    }

    #[must_use]
    pub fn player(&self) -> Player {
        self.player
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulated flight time at the design cadence.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.ticks.saturating_mul(TICK_INTERVAL_MILLIS))
    }

    /// Whether the player's current cell is blocked.
    #[must_use]
    pub fn is_collided(&self) -> bool {
        self.grid().is_blocked(PLAYER_COLUMN, self.player.row())
    }

    /// Current observation for the player.
    #[must_use]
    pub fn sample(&self) -> Observation {
        sample(self.grid(), self.player.row())
    }

    /// Advances the cavern by one column.
    pub fn tick(&mut self) -> SessionState {
        if self.state.is_crashed() {
            return self.state;
        }
        self.ticks += 1;
        self.generator.advance();
        self.update_state();
        self.state
    }

    /// Moves the player by `step` rows, clamped to the grid.
    pub fn move_player(&mut self, step: i32) -> SessionState {
        self.player.move_by(step);
        self.update_state();
        self.state
    }

    /// Opens the whole grid, recenters the player and zeroes the clock.
    pub fn reset(&mut self) {
        self.generator.clear();
        self.player.recenter();
        self.ticks = 0;
        self.state = SessionState::Flying;
    }

    fn update_state(&mut self) {
        if self.is_collided() {
            self.state = SessionState::Crashed;
        }
    }
}
