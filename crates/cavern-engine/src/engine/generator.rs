use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::core::{CavernGrid, HEIGHT};

use super::CavernSeed;

/// Highest row the open band may start at.
pub const MIN_TOP: usize = 2;
/// Row below the lowest open cell the band may reach (exclusive bound).
pub const MAX_BOTTOM: usize = 18;
/// Minimum height of the open band.
pub const MIN_GAP: usize = 4;

const _: () = assert!(MIN_TOP + MIN_GAP <= MAX_BOTTOM && MAX_BOTTOM <= HEIGHT);

/// One step of the carve boundary random walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum WalkStep {
    Increase,
    Decrease,
}

impl WalkStep {
    #[must_use]
    pub const fn delta(self) -> isize {
        match self {
            Self::Increase => 1,
            Self::Decrease => -1,
        }
    }
}

/// Source of random walk steps for [`CavernGenerator`].
///
/// The generator asks for two steps per column: first for `top`, then for
/// `bottom`. Tests plug in scripted sources; [`RandomWalk`] is the default.
pub trait WalkSource {
    fn next_step(&mut self) -> WalkStep;
}

/// Fair coin walk backed by a seedable PCG generator.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    rng: Pcg32,
}

impl Default for RandomWalk {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomWalk {
    /// Creates a walk with a random seed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(rand::rng().random())
    }

    #[must_use]
    pub fn with_seed(seed: CavernSeed) -> Self {
        Self {
            rng: Pcg32::from_seed(seed.to_bytes()),
        }
    }
}

impl WalkSource for RandomWalk {
    fn next_step(&mut self) -> WalkStep {
        if self.rng.random_bool(0.5) {
            WalkStep::Increase
        } else {
            WalkStep::Decrease
        }
    }
}

/// Boundaries of the open band in the most recently generated column.
///
/// Cells `top..bottom` are open. A value of this type always satisfies
/// `top >= MIN_TOP`, `bottom <= MAX_BOTTOM` and `bottom - top >= MIN_GAP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarveState {
    top: usize,
    bottom: usize,
}

impl Default for CarveState {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl CarveState {
    /// Widest possible band, the state of a fresh generator.
    pub const INITIAL: Self = Self {
        top: MIN_TOP,
        bottom: MAX_BOTTOM,
    };

    /// Creates a state from arbitrary boundaries, clamped into the valid range.
    #[must_use]
    pub fn new(top: usize, bottom: usize) -> Self {
        Self::clamped(
            isize::try_from(top).unwrap_or(isize::MAX),
            isize::try_from(bottom).unwrap_or(isize::MAX),
        )
    }

    /// Clamps a walked pair of boundaries.
    ///
    /// `bottom` is bounded by `MAX_BOTTOM` before `top` is clamped against it,
    /// so `top` can never end up closer than `MIN_GAP` to the final bottom.
    /// `top` is then clamped first and `bottom` is widened from the clamped top.
    #[expect(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn clamped(top: isize, bottom: isize) -> Self {
        const MIN_TOP_I: isize = MIN_TOP as isize;
        const MAX_BOTTOM_I: isize = MAX_BOTTOM as isize;
        const MIN_GAP_I: isize = MIN_GAP as isize;

        let bottom = bottom.min(MAX_BOTTOM_I);
        let top = MIN_TOP_I.max(top.min(bottom - MIN_GAP_I));
        let bottom = MAX_BOTTOM_I.min(bottom.max(top + MIN_GAP_I));
        Self {
            top: top as usize,
            bottom: bottom as usize,
        }
    }

    #[must_use]
    pub const fn top(self) -> usize {
        self.top
    }

    #[must_use]
    pub const fn bottom(self) -> usize {
        self.bottom
    }

    #[must_use]
    pub const fn gap(self) -> usize {
        self.bottom - self.top
    }

    /// Applies one walk step to each boundary and clamps the result.
    #[must_use]
    #[expect(clippy::cast_possible_wrap)]
    pub fn walked(self, top_step: WalkStep, bottom_step: WalkStep) -> Self {
        Self::clamped(
            self.top as isize + top_step.delta(),
            self.bottom as isize + bottom_step.delta(),
        )
    }
}

/// Procedural cavern generator.
///
/// Owns the rolling [`CavernGrid`]. Every [`advance`](Self::advance) recycles
/// the oldest column to the right edge and carves it with the next state of a
/// clamped random walk, so the band drifts by at most one row per column.
///
/// # Example
///
/// ```
/// use cavern_engine::{CavernGenerator, CavernSeed, MIN_GAP, WIDTH};
///
/// let mut generator = CavernGenerator::with_seed(CavernSeed::from_u128(1));
/// generator.advance();
///
/// let carve = generator.carve_state();
/// assert!(carve.gap() >= MIN_GAP);
/// let newest = generator.grid().column(WIDTH - 1);
/// assert!(!newest.is_blocked(carve.top()));
/// assert!(newest.is_blocked(carve.bottom()));
/// ```
#[derive(Debug, Clone)]
pub struct CavernGenerator<W = RandomWalk> {
    grid: CavernGrid,
    carve: CarveState,
    walk: W,
}

impl Default for CavernGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CavernGenerator {
    /// Creates a generator with a random seed and an all-open grid.
    #[must_use]
    pub fn new() -> Self {
        Self::with_walk(RandomWalk::new())
    }

    /// Like [`Self::new`], but with a fixed seed.
    #[must_use]
    pub fn with_seed(seed: CavernSeed) -> Self {
        Self::with_walk(RandomWalk::with_seed(seed))
    }
}

impl<W> CavernGenerator<W>
where
    W: WalkSource,
{
    #[must_use]
    pub fn with_walk(walk: W) -> Self {
        Self::with_state(walk, CarveState::INITIAL)
    }

    #[must_use]
    pub fn with_state(walk: W, carve: CarveState) -> Self {
        Self {
            grid: CavernGrid::INITIAL,
            carve,
            walk,
        }
    }

    #[must_use]
    pub fn grid(&self) -> &CavernGrid {
        &self.grid
    }

    #[must_use]
    pub fn carve_state(&self) -> CarveState {
        self.carve
    }

    /// Scrolls the cavern by one column.
    pub fn advance(&mut self) {
        let top_step = self.walk.next_step();
        let bottom_step = self.walk.next_step();
        self.carve = self.carve.walked(top_step, bottom_step);

        let column = self.grid.recycle_oldest();
        column.block_all();
        column.open_rows(self.carve.top..self.carve.bottom);
    }

    /// Opens every cell of the grid.
    ///
    /// The carve state is kept, so generation continues from the current band.
    pub fn clear(&mut self) {
        self.grid.clear();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;

    use crate::core::{Column, WIDTH};

    use super::*;

    /// Replays a fixed list of steps, then keeps decreasing.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedWalk(pub(crate) VecDeque<WalkStep>);

    impl ScriptedWalk {
        pub(crate) fn new<I>(steps: I) -> Self
        where
            I: IntoIterator<Item = WalkStep>,
        {
            Self(steps.into_iter().collect())
        }
    }

    impl WalkSource for ScriptedWalk {
        fn next_step(&mut self) -> WalkStep {
            self.0.pop_front().unwrap_or(WalkStep::Decrease)
        }
    }

    use WalkStep::{Decrease, Increase};

    #[test]
    fn test_narrowing_step_from_initial_state() {
        let mut generator = CavernGenerator::with_walk(ScriptedWalk::new([Increase, Decrease]));
        generator.advance();

        let carve = generator.carve_state();
        assert!((2..=3).contains(&carve.top()));
        assert!((14..=18).contains(&carve.bottom()));
        assert!(carve.gap() >= MIN_GAP);
        assert_eq!(carve, CarveState::new(3, 17));
        assert_eq!(generator.grid().column(WIDTH - 1), Column::carved(3..17));
    }

    #[test]
    fn test_widening_step_is_clamped_at_limits() {
        let mut generator = CavernGenerator::with_walk(ScriptedWalk::new([Decrease, Increase]));
        generator.advance();
        assert_eq!(generator.carve_state(), CarveState::INITIAL);
    }

    #[test]
    fn test_top_is_clamped_against_bottom() {
        let state = CarveState::new(10, 14);
        assert_eq!(state.walked(Increase, Decrease), CarveState::new(9, 13));
        assert_eq!(state.walked(Increase, Decrease).gap(), MIN_GAP);
    }

    #[test]
    fn test_bottom_above_limit_cannot_squeeze_gap() {
        // top sits MIN_GAP above a bottom that walks past MAX_BOTTOM
        let state = CarveState::new(14, 18);
        let walked = state.walked(Increase, Increase);
        assert_eq!(walked, CarveState::new(14, 18));
        assert_eq!(walked.gap(), MIN_GAP);
    }

    #[test]
    fn test_new_clamps_arbitrary_input() {
        let state = CarveState::new(0, 100);
        assert_eq!(state, CarveState::INITIAL);
        let state = CarveState::new(17, 3);
        assert_eq!(state.top(), MIN_TOP);
        assert_eq!(state.bottom(), MIN_TOP + MIN_GAP);
    }

    #[test]
    fn test_band_drifts_down_under_constant_increase() {
        let mut generator = CavernGenerator::with_walk(ScriptedWalk::new([Increase; 200]));
        for _ in 0..100 {
            generator.advance();
        }
        assert_eq!(generator.carve_state(), CarveState::new(14, 18));
    }

    #[test]
    fn test_advance_recycles_oldest_column() {
        let mut generator = CavernGenerator::with_walk(ScriptedWalk::default());
        for _ in 0..WIDTH {
            generator.advance();
        }
        assert!(generator.grid().columns().all(|c| c != Column::OPEN));
        generator.clear();
        assert!(generator.grid().columns().all(|c| c == Column::OPEN));
        assert_eq!(generator.carve_state(), CarveState::new(2, 6));
    }

    #[test]
    fn test_seeded_generators_agree() {
        let seed = CavernSeed::from_u128(0xdead_beef);
        let mut a = CavernGenerator::with_seed(seed);
        let mut b = CavernGenerator::with_seed(seed);
        for _ in 0..200 {
            a.advance();
            b.advance();
            assert_eq!(a.carve_state(), b.carve_state());
        }
        assert_eq!(a.grid(), b.grid());
    }
}
