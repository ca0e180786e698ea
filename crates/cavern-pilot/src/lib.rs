//! Recording, training and driving the cavern pilot.
//!
//! This crate sits between a tick driver (a window, a terminal UI or the
//! headless CLI) and the simulation and policy crates.
//!
//! # How a Flight Is Learned
//!
//! 1. **Record** - While recording, every tick and every manual move appends an
//!    `(observation, action)` pair to the [`TrainingSession`] buffer
//! 2. **Stop** - Toggling recording off hands the buffer to a training run
//! 3. **Train** - The run trains a private copy of the live network, by default
//!    on a background thread so the tick loop keeps going
//! 4. **Swap** - The trained network replaces the live weights in one step
//! 5. **Fly** - In [`ControlMode::Autopilot`] the [`Pilot`] asks the policy for
//!    an action on every tick
//!
//! # Architecture
//!
//! ```text
//! tick driver
//!     ↓ tick() / move_player() / toggle_recording()
//! Pilot ── CavernSession (grid, generator, player, clock)
//!     │
//!     ├── TrainingSession ── buffer ── background training ──┐
//!     │                                                      ↓ replace
//!     └── SharedPolicy ◀─────────────────────────────────────┘
//!            ↑ decide()
//! ```

pub use self::{config::*, pilot::*, training_session::*};

mod config;
mod pilot;
mod training_session;
