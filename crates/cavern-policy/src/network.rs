//! Feed-forward network layers and the forward pass.
//!
//! A [`PolicyNetwork`] is a chain of [`DenseLayer`]s. Each layer stores its
//! weight matrix row-major, one row per output unit, plus one bias per output
//! unit. The shape of the whole chain is described by an [`Architecture`],
//! which is also what model files carry so that a loaded network can be checked
//! before it replaces the live one.

use cavern_engine::{Action, OBSERVATION_LEN};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{InvalidInputError, decision, init};

/// Units in the hidden layer of the pilot network.
pub const HIDDEN_UNITS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Tanh,
}

impl Activation {
    #[inline]
    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Linear => x,
            Self::Tanh => x.tanh(),
        }
    }

    /// Derivative expressed through the activation's own output.
    #[inline]
    #[must_use]
    pub fn derivative_from_output(self, y: f64) -> f64 {
        match self {
            Self::Linear => 1.0,
            Self::Tanh => 1.0 - y * y,
        }
    }
}

/// Shape descriptor of a network.
///
/// `layer_sizes[0]` is the input width; every following entry is a dense layer
/// with the activation at the same position in `activations` (shifted by one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Architecture {
    pub layer_sizes: Vec<usize>,
    pub activations: Vec<Activation>,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ArchitectureError {
    #[display("network needs an input and at least one dense layer")]
    TooFewLayers,
    #[display("layer {index} has no units")]
    EmptyLayer { index: usize },
    #[display("expected {expected} activations, found {found}")]
    ActivationCount { expected: usize, found: usize },
    #[display("expected {expected} weight layers, found {found}")]
    LayerCount { expected: usize, found: usize },
    #[display("layer {layer} weights are {found_rows}x{found_cols}, expected {rows}x{cols}")]
    WeightShape {
        layer: usize,
        rows: usize,
        cols: usize,
        found_rows: usize,
        found_cols: usize,
    },
    #[display("layer {layer} has {found} biases, expected {expected}")]
    BiasCount {
        layer: usize,
        expected: usize,
        found: usize,
    },
    #[display("network maps {inputs} inputs to {outputs} outputs, expected {expected_inputs} to {expected_outputs}")]
    InterfaceMismatch {
        inputs: usize,
        outputs: usize,
        expected_inputs: usize,
        expected_outputs: usize,
    },
}

impl Architecture {
    /// 5 observation features -> 30 tanh units -> 1 tanh output.
    #[must_use]
    pub fn cavern_pilot() -> Self {
        Self {
            layer_sizes: vec![OBSERVATION_LEN, HIDDEN_UNITS, 1],
            activations: vec![Activation::Tanh, Activation::Tanh],
        }
    }

    pub fn validate(&self) -> Result<(), ArchitectureError> {
        if self.layer_sizes.len() < 2 {
            return Err(ArchitectureError::TooFewLayers);
        }
        if let Some(index) = self.layer_sizes.iter().position(|&size| size == 0) {
            return Err(ArchitectureError::EmptyLayer { index });
        }
        let expected = self.layer_sizes.len() - 1;
        if self.activations.len() != expected {
            return Err(ArchitectureError::ActivationCount {
                expected,
                found: self.activations.len(),
            });
        }
        Ok(())
    }
}

/// Fully connected layer: `output = activation(weights · input + biases)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    inputs: usize,
    outputs: usize,
    activation: Activation,
    weights: Vec<f64>,
    biases: Vec<f64>,
}

impl DenseLayer {
    #[must_use]
    pub fn zeros(inputs: usize, outputs: usize, activation: Activation) -> Self {
        Self {
            inputs,
            outputs,
            activation,
            weights: vec![0.0; inputs * outputs],
            biases: vec![0.0; outputs],
        }
    }

    /// Builds a layer from weight rows (one per output unit) and biases.
    pub fn from_rows(
        layer: usize,
        inputs: usize,
        activation: Activation,
        rows: &[Vec<f64>],
        biases: Vec<f64>,
    ) -> Result<Self, ArchitectureError> {
        let outputs = biases.len();
        if let Some(row) = rows.iter().find(|row| row.len() != inputs) {
            return Err(ArchitectureError::WeightShape {
                layer,
                rows: outputs,
                cols: inputs,
                found_rows: rows.len(),
                found_cols: row.len(),
            });
        }
        if rows.len() != outputs {
            return Err(ArchitectureError::BiasCount {
                layer,
                expected: rows.len(),
                found: outputs,
            });
        }
        Ok(Self {
            inputs,
            outputs,
            activation,
            weights: rows.concat(),
            biases,
        })
    }

    #[must_use]
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    #[must_use]
    pub fn outputs(&self) -> usize {
        self.outputs
    }

    #[must_use]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Row-major weight matrix, `outputs` rows of `inputs` values.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    #[must_use]
    pub fn biases(&self) -> &[f64] {
        &self.biases
    }

    pub fn biases_mut(&mut self) -> &mut [f64] {
        &mut self.biases
    }

    #[must_use]
    pub fn weight(&self, output: usize, input: usize) -> f64 {
        self.weights[output * self.inputs + input]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.weights.chunks_exact(self.inputs)
    }

    /// Writes this layer's activations for `input` into `output`.
    pub fn forward_into(&self, input: &[f64], output: &mut Vec<f64>) {
        debug_assert_eq!(input.len(), self.inputs);
        output.clear();
        output.extend(self.rows().zip(&self.biases).map(|(row, bias)| {
            let net = row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + bias;
            self.activation.apply(net)
        }));
    }
}

/// Feed-forward network made of dense layers.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyNetwork {
    layers: Vec<DenseLayer>,
}

impl PolicyNetwork {
    /// Network of the given shape with every weight and bias at zero.
    pub fn zeroed(architecture: &Architecture) -> Result<Self, ArchitectureError> {
        architecture.validate()?;
        let layers = architecture
            .layer_sizes
            .windows(2)
            .zip(&architecture.activations)
            .map(|(sizes, activation)| DenseLayer::zeros(sizes[0], sizes[1], *activation))
            .collect();
        Ok(Self { layers })
    }

    /// Randomly initialised network of the given shape.
    pub fn random<R>(architecture: &Architecture, rng: &mut R) -> Result<Self, ArchitectureError>
    where
        R: Rng + ?Sized,
    {
        let mut network = Self::zeroed(architecture)?;
        init::nguyen_widrow(&mut network, rng);
        Ok(network)
    }

    /// Randomly initialised 5 -> 30 -> 1 pilot network.
    #[must_use]
    pub fn cavern_pilot<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut network = Self {
            layers: vec![
                DenseLayer::zeros(OBSERVATION_LEN, HIDDEN_UNITS, Activation::Tanh),
                DenseLayer::zeros(HIDDEN_UNITS, 1, Activation::Tanh),
            ],
        };
        init::nguyen_widrow(&mut network, rng);
        network
    }

    /// Assembles a network from layers, checking that adjacent layers fit.
    pub fn from_layers(layers: Vec<DenseLayer>) -> Result<Self, ArchitectureError> {
        if layers.is_empty() {
            return Err(ArchitectureError::TooFewLayers);
        }
        for (index, pair) in layers.windows(2).enumerate() {
            if pair[0].outputs != pair[1].inputs {
                return Err(ArchitectureError::WeightShape {
                    layer: index + 1,
                    rows: pair[1].outputs,
                    cols: pair[0].outputs,
                    found_rows: pair[1].outputs,
                    found_cols: pair[1].inputs,
                });
            }
        }
        Ok(Self { layers })
    }

    #[must_use]
    pub fn architecture(&self) -> Architecture {
        let mut layer_sizes = vec![self.input_len()];
        layer_sizes.extend(self.layers.iter().map(DenseLayer::outputs));
        Architecture {
            layer_sizes,
            activations: self.layers.iter().map(DenseLayer::activation).collect(),
        }
    }

    #[must_use]
    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [DenseLayer] {
        &mut self.layers
    }

    #[must_use]
    pub fn input_len(&self) -> usize {
        self.layers[0].inputs
    }

    #[must_use]
    pub fn output_len(&self) -> usize {
        self.layers[self.layers.len() - 1].outputs
    }

    /// Checks that the network maps `inputs` values to `outputs` values.
    pub fn check_interface(&self, inputs: usize, outputs: usize) -> Result<(), ArchitectureError> {
        if self.input_len() == inputs && self.output_len() == outputs {
            return Ok(());
        }
        Err(ArchitectureError::InterfaceMismatch {
            inputs: self.input_len(),
            outputs: self.output_len(),
            expected_inputs: inputs,
            expected_outputs: outputs,
        })
    }

    fn check_input(&self, input: &[f64]) -> Result<(), InvalidInputError> {
        if input.len() == self.input_len() {
            Ok(())
        } else {
            Err(InvalidInputError {
                expected: self.input_len(),
                actual: input.len(),
            })
        }
    }

    /// Runs the forward pass and returns the output layer's activations.
    pub fn forward(&self, input: &[f64]) -> Result<Vec<f64>, InvalidInputError> {
        self.check_input(input)?;
        let mut current = input.to_vec();
        let mut next = Vec::new();
        for layer in &self.layers {
            layer.forward_into(&current, &mut next);
            std::mem::swap(&mut current, &mut next);
        }
        Ok(current)
    }

    /// Runs the forward pass keeping every layer's activations.
    ///
    /// `trace[0]` receives the input and `trace[i + 1]` the output of layer `i`.
    /// Buffers are reused between calls.
    pub(crate) fn forward_trace(&self, input: &[f64], trace: &mut Vec<Vec<f64>>) {
        trace.resize_with(self.layers.len() + 1, Vec::new);
        trace[0].clear();
        trace[0].extend_from_slice(input);
        for (index, layer) in self.layers.iter().enumerate() {
            let (done, rest) = trace.split_at_mut(index + 1);
            layer.forward_into(&done[index], &mut rest[0]);
        }
    }

    /// Picks an action for an observation vector.
    ///
    /// Fails when `observation` does not have exactly one value per input unit.
    pub fn decide(&self, observation: &[f64]) -> Result<Action, InvalidInputError> {
        let output = self.forward(observation)?;
        Ok(decision::action_from_output(output[0]))
    }
}
