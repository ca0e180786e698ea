//! Simulation logic built on the grid data structures.
//!
//! - [`CavernGenerator`] - Carves one new column per tick with a clamped random walk
//! - [`sample`] - Turns the grid and the player row into an [`Observation`]
//! - [`Player`] / [`Action`] - Vertical position and the moves that change it
//! - [`CavernSession`] - Tick clock, crash detection and restart
//!
//! # Tick Flow
//!
//! 1. [`CavernSession::tick`] scrolls the cavern by one column
//! 2. The driver samples an [`Observation`] and picks an [`Action`]
//! 3. [`CavernSession::move_player`] applies it, clamped to the grid
//! 4. The session switches to [`SessionState::Crashed`] when the player's
//!    cell is blocked
//!
//! # Example
//!
//! ```
//! use cavern_engine::{CavernSeed, CavernSession};
//!
//! let mut session = CavernSession::with_seed(CavernSeed::from_u128(42));
//! while session.state().is_flying() && session.ticks() < 100 {
//!     session.tick();
//!     let observation = session.sample();
//!     let step = if observation.immediate_top() < observation.immediate_bottom() {
//!         1
//!     } else {
//!         -1
//!     };
//!     session.move_player(step);
//! }
//! ```

pub use self::{action::*, generator::*, player::*, sampler::*, seed::*, session::*};

mod action;
mod generator;
mod player;
mod sampler;
mod seed;
mod session;
