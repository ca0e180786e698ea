//! Simulation core of the cavern: the rolling grid, its procedural generator,
//! the player and the observation sampler.
//!
//! - [`core`] holds the plain data structures ([`Column`], [`CavernGrid`]).
//! - [`engine`] drives them: [`CavernGenerator`] carves one column per tick,
//!   [`sample`] turns the grid into an [`Observation`], and [`CavernSession`]
//!   ties everything to a tick clock.

pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("invalid action label {label}, expected -1, 0 or 1")]
pub struct InvalidActionError {
    pub label: i32,
}
