//! Trainable decision policy for the cavern pilot.
//!
//! The policy is a small fully connected network that maps an
//! [`Observation`](cavern_engine::Observation) to an [`Action`](cavern_engine::Action).
//! Everything is written as plain matrix arithmetic over `f64` slices so each
//! step of inference and training can be inspected.
//!
//! # Architecture
//!
//! ```text
//! input (5) ──W1 5x30 + b1──▶ tanh (30) ──W2 30x1 + b2──▶ tanh (1) ──▶ threshold ──▶ action
//! ```
//!
//! # Modules
//!
//! - [`network`] - Layers, forward pass and the architecture descriptor
//! - [`init`] - Nguyen-Widrow weight initialisation
//! - [`decision`] - Mapping of the raw network output to an action
//! - [`trainer`] - Full-batch backpropagation with momentum and L2 weight decay
//! - [`model`] - Versioned JSON model files
//! - [`shared`] - Live weights shared between inference and training
//!
//! # Example
//!
//! ```
//! use cavern_engine::{Action, Observation};
//! use cavern_policy::{
//!     network::PolicyNetwork,
//!     trainer::{self, TrainingParams, TrainingSet},
//! };
//! use std::sync::atomic::AtomicBool;
//!
//! let mut network = PolicyNetwork::cavern_pilot(&mut rand::rng());
//! let samples = [
//!     (Observation::new([0.1, 0.6, 0.1, 0.2, 0.3]), Action::Down),
//!     (Observation::new([0.6, 0.1, 0.3, 0.1, 0.7]), Action::Up),
//! ];
//! let set = TrainingSet::from_samples(&samples);
//! let params = TrainingParams { max_epochs: 50, ..TrainingParams::default() };
//! let report = trainer::train(&mut network, &set, &params, &AtomicBool::new(false)).unwrap();
//! assert_eq!(report.epochs, 50);
//!
//! let action = network.decide(samples[0].0.as_ref()).unwrap();
//! assert_ne!(action, Action::Stay);
//! ```

pub mod decision;
pub mod init;
pub mod model;
pub mod network;
pub mod shared;
pub mod trainer;

/// Input vector whose length does not match the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid input: expected {expected} values, got {actual}")]
pub struct InvalidInputError {
    pub expected: usize,
    pub actual: usize,
}
