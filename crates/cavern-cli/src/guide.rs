use cavern_engine::{
    Action, CavernGrid, CavernSession, Column, HEIGHT, PLAYER_COLUMN, WIDTH, WalkSource,
};
use rand::Rng;
use rand_distr::{Bernoulli, Distribution as _};

/// Scripted pilot that steers toward the middle of the band ahead.
///
/// Each decision moves one row toward the centre of the nearest carved column
/// ahead of the player. With probability `noise` the decision is replaced by a random
/// action so the recorded flight also covers off-centre situations.
#[derive(Debug, Clone)]
pub(crate) struct GuidePilot {
    noise: Bernoulli,
}

impl GuidePilot {
    pub(crate) fn new(noise: f64) -> anyhow::Result<Self> {
        let noise = Bernoulli::new(noise)
            .map_err(|e| anyhow::anyhow!("Invalid guide noise {noise}: {e}"))?;
        Ok(Self { noise })
    }

    pub(crate) fn choose<W, R>(&self, session: &CavernSession<W>, rng: &mut R) -> Action
    where
        W: WalkSource,
        R: Rng + ?Sized,
    {
        if self.noise.sample(rng) {
            return Action::ALL[rng.random_range(0..Action::ALL.len())];
        }
        steer(session.grid(), session.player().row())
    }
}

/// Step from `row` toward the centre of the open band ahead.
///
/// Targets the first carved column after the player column. Fully open
/// columns are skipped; they only appear after a reset.
pub(crate) fn steer(grid: &CavernGrid, row: usize) -> Action {
    let column = (PLAYER_COLUMN + 1..WIDTH)
        .map(|x| grid.column(x))
        .find(|column| *column != Column::OPEN)
        .unwrap_or(Column::OPEN);
    let Some(top) = (0..HEIGHT).find(|&r| !column.is_blocked(r)) else {
        return Action::Stay;
    };
    let bottom = (0..HEIGHT).rev().find(|&r| !column.is_blocked(r)).unwrap_or(top);
    let centre = (top + bottom) / 2;
    match row.cmp(&centre) {
        std::cmp::Ordering::Less => Action::Down,
        std::cmp::Ordering::Equal => Action::Stay,
        std::cmp::Ordering::Greater => Action::Up,
    }
}
