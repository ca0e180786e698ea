//! Full-batch backpropagation with momentum and L2 weight decay.
//!
//! One epoch runs every sample through the network, sums the error gradients
//! over the whole batch and applies a single update per weight:
//!
//! ```text
//! g     = Σ δ·x − l2·w          (biases are not decayed)
//! Δw(t) = lr·g + momentum·Δw(t−1)
//! w     = w + Δw(t)
//! ```
//!
//! where `δ` is the back-propagated error term `(target − output)·f'(net)`.
//! The training error is the mean squared error over all samples, measured
//! during the epoch's forward passes, i.e. before that epoch's update.
//!
//! Training stops after `max_epochs`, when the error reaches the optional
//! `target_error`, when the optional timeout elapses, or when the cancel flag
//! is raised. Timeout and cancel keep the weights of the last completed epoch.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use cavern_engine::{Action, OBSERVATION_LEN, Observation};
use serde::{Deserialize, Serialize};

use crate::{InvalidInputError, network::PolicyNetwork};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub learning_rate: f64,
    pub momentum: f64,
    pub l2: f64,
    pub max_epochs: usize,
    /// Epochs between two progress events.
    pub report_interval: usize,
    /// Stop as soon as the epoch error is at or below this value.
    pub target_error: Option<f64>,
    pub timeout: Option<Duration>,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            momentum: 0.95,
            l2: 0.010,
            max_epochs: 10_000,
            report_interval: 10,
            target_error: None,
            timeout: None,
        }
    }
}

/// Row-major batch of inputs and targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    input_len: usize,
    target_len: usize,
    inputs: Vec<f64>,
    targets: Vec<f64>,
}

impl TrainingSet {
    #[must_use]
    pub fn new(input_len: usize, target_len: usize) -> Self {
        Self {
            input_len,
            target_len,
            inputs: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// Observation rows with the action labels as a single target column.
    #[must_use]
    pub fn from_samples(samples: &[(Observation, Action)]) -> Self {
        let mut set = Self::new(OBSERVATION_LEN, 1);
        set.inputs.reserve(samples.len() * OBSERVATION_LEN);
        set.targets.reserve(samples.len());
        for (observation, action) in samples {
            set.inputs.extend_from_slice(observation.values());
            set.targets.push(action.label());
        }
        set
    }

    pub fn push(&mut self, input: &[f64], target: &[f64]) -> Result<(), InvalidInputError> {
        if input.len() != self.input_len {
            return Err(InvalidInputError {
                expected: self.input_len,
                actual: input.len(),
            });
        }
        if target.len() != self.target_len {
            return Err(InvalidInputError {
                expected: self.target_len,
                actual: target.len(),
            });
        }
        self.inputs.extend_from_slice(input);
        self.targets.extend_from_slice(target);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len().checked_div(self.target_len).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    #[must_use]
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    #[must_use]
    pub fn target_len(&self) -> usize {
        self.target_len
    }

    /// Iterates `(input, target)` rows.
    pub fn rows(&self) -> impl Iterator<Item = (&[f64], &[f64])> {
        self.inputs
            .chunks_exact(self.input_len.max(1))
            .zip(self.targets.chunks_exact(self.target_len.max(1)))
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    derive_more::Display,
    derive_more::Error,
    derive_more::From,
    derive_more::IsVariant,
)]
pub enum TrainError {
    #[display("no data collected")]
    NoData,
    #[display("training set does not fit the network: {_0}")]
    Shape(InvalidInputError),
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    #[display("target error reached")]
    Converged,
    #[display("epoch limit reached")]
    MaxEpochs,
    #[display("cancelled")]
    Cancelled,
    #[display("timed out")]
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub samples: usize,
    /// Completed epochs.
    pub epochs: usize,
    /// Mean squared error of the trained network over the training set.
    pub final_error: f64,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
}

/// Mean squared error of `network` over `set`.
pub fn mean_squared_error(network: &PolicyNetwork, set: &TrainingSet) -> Result<f64, TrainError> {
    check_shape(network, set)?;
    let mut sum = 0.0;
    for (input, target) in set.rows() {
        let output = network.forward(input)?;
        sum += output
            .iter()
            .zip(target)
            .map(|(y, t)| (t - y) * (t - y))
            .sum::<f64>();
    }
    Ok(sum / value_count(set))
}

/// Trains `network` in place on `set`.
///
/// `cancel` is polled before every epoch.
pub fn train(
    network: &mut PolicyNetwork,
    set: &TrainingSet,
    params: &TrainingParams,
    cancel: &AtomicBool,
) -> Result<TrainingReport, TrainError> {
    if set.is_empty() {
        return Err(TrainError::NoData);
    }
    check_shape(network, set)?;

    let started = Instant::now();
    let mut backprop = Backprop::new(network);
    let mut epochs = 0;
    let mut stop_reason = StopReason::MaxEpochs;

    tracing::debug!(
        samples = set.len(),
        max_epochs = params.max_epochs,
        "training started"
    );
    while epochs < params.max_epochs {
        if cancel.load(Ordering::Relaxed) {
            stop_reason = StopReason::Cancelled;
            break;
        }
        if params.timeout.is_some_and(|t| started.elapsed() >= t) {
            stop_reason = StopReason::TimedOut;
            break;
        }

        let error = backprop.epoch(network, set, params);
        epochs += 1;

        if params.report_interval > 0 && epochs % params.report_interval == 0 {
            tracing::info!(epoch = epochs, error, "training progress");
        }
        if params.target_error.is_some_and(|target| error <= target) {
            stop_reason = StopReason::Converged;
            break;
        }
    }

    let report = TrainingReport {
        samples: set.len(),
        epochs,
        final_error: mean_squared_error(network, set)?,
        stop_reason,
        elapsed: started.elapsed(),
    };
    tracing::info!(
        samples = report.samples,
        epochs = report.epochs,
        final_error = report.final_error,
        stop_reason = %report.stop_reason,
        "training finished"
    );
    Ok(report)
}

fn check_shape(network: &PolicyNetwork, set: &TrainingSet) -> Result<(), InvalidInputError> {
    if set.input_len() != network.input_len() {
        return Err(InvalidInputError {
            expected: network.input_len(),
            actual: set.input_len(),
        });
    }
    if set.target_len() != network.output_len() {
        return Err(InvalidInputError {
            expected: network.output_len(),
            actual: set.target_len(),
        });
    }
    Ok(())
}

#[expect(clippy::cast_precision_loss)]
fn value_count(set: &TrainingSet) -> f64 {
    (set.len() * set.target_len()) as f64
}

/// Per-layer scratch buffers and momentum state.
struct Backprop {
    trace: Vec<Vec<f64>>,
    deltas: Vec<Vec<f64>>,
    weight_gradients: Vec<Vec<f64>>,
    bias_gradients: Vec<Vec<f64>>,
    weight_steps: Vec<Vec<f64>>,
    bias_steps: Vec<Vec<f64>>,
}

impl Backprop {
    fn new(network: &PolicyNetwork) -> Self {
        let weights = || {
            network
                .layers()
                .iter()
                .map(|layer| vec![0.0; layer.weights().len()])
                .collect::<Vec<_>>()
        };
        let biases = || {
            network
                .layers()
                .iter()
                .map(|layer| vec![0.0; layer.outputs()])
                .collect::<Vec<_>>()
        };
        Self {
            trace: Vec::new(),
            deltas: biases(),
            weight_gradients: weights(),
            bias_gradients: biases(),
            weight_steps: weights(),
            bias_steps: biases(),
        }
    }

    /// Runs one epoch and returns the error measured before the update.
    fn epoch(
        &mut self,
        network: &mut PolicyNetwork,
        set: &TrainingSet,
        params: &TrainingParams,
    ) -> f64 {
        for gradient in self.weight_gradients.iter_mut().chain(&mut self.bias_gradients) {
            gradient.fill(0.0);
        }

        let mut squared_error = 0.0;
        for (input, target) in set.rows() {
            squared_error += self.accumulate(network, input, target);
        }

        for (index, layer) in network.layers_mut().iter_mut().enumerate() {
            let gradients = &self.weight_gradients[index];
            let steps = &mut self.weight_steps[index];
            for ((w, g), step) in layer.weights_mut().iter_mut().zip(gradients).zip(steps) {
                let g = g - params.l2 * *w;
                *step = params.learning_rate * g + params.momentum * *step;
                *w += *step;
            }
            let gradients = &self.bias_gradients[index];
            let steps = &mut self.bias_steps[index];
            for ((b, g), step) in layer.biases_mut().iter_mut().zip(gradients).zip(steps) {
                *step = params.learning_rate * g + params.momentum * *step;
                *b += *step;
            }
        }

        squared_error / value_count(set)
    }

    /// Adds one sample's gradients and returns its squared error.
    fn accumulate(&mut self, network: &PolicyNetwork, input: &[f64], target: &[f64]) -> f64 {
        let layers = network.layers();
        let last = layers.len() - 1;
        network.forward_trace(input, &mut self.trace);

        let mut squared_error = 0.0;
        let activation = layers[last].activation();
        for ((delta, y), t) in self.deltas[last].iter_mut().zip(&self.trace[last + 1]).zip(target) {
            let error = t - y;
            squared_error += error * error;
            *delta = error * activation.derivative_from_output(*y);
        }

        for index in (0..last).rev() {
            let (head, tail) = self.deltas.split_at_mut(index + 1);
            let next_layer = &layers[index + 1];
            let next_deltas = &tail[0];
            let activation = layers[index].activation();
            for (unit, delta) in head[index].iter_mut().enumerate() {
                let back = next_deltas
                    .iter()
                    .enumerate()
                    .map(|(j, d)| next_layer.weight(j, unit) * d)
                    .sum::<f64>();
                *delta = back * activation.derivative_from_output(self.trace[index + 1][unit]);
            }
        }

        for (index, layer) in layers.iter().enumerate() {
            let layer_input = &self.trace[index];
            let deltas = &self.deltas[index];
            for ((row, delta), bias) in self.weight_gradients[index]
                .chunks_exact_mut(layer.inputs())
                .zip(deltas)
                .zip(&mut self.bias_gradients[index])
            {
                *bias += delta;
                for (g, x) in row.iter_mut().zip(layer_input) {
                    *g += delta * x;
                }
            }
        }

        squared_error
    }
}
