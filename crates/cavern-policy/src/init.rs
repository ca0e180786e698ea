//! Nguyen-Widrow weight initialisation.
//!
//! Every weight and bias is drawn uniformly from `[-1, 1]`, then each unit's
//! incoming weight vector is rescaled to length `beta = 0.7 * outputs^(1 / inputs)`
//! and its bias redrawn from `[-beta, beta]`. This spreads the active regions of
//! the tanh units over the input range.

use rand::Rng;

use crate::network::PolicyNetwork;

const SCALE: f64 = 0.7;

/// Randomises `network` in place.
#[expect(clippy::cast_precision_loss)]
pub fn nguyen_widrow<R>(network: &mut PolicyNetwork, rng: &mut R)
where
    R: Rng + ?Sized,
{
    for layer in network.layers_mut() {
        let inputs = layer.inputs() as f64;
        let outputs = layer.outputs() as f64;
        let beta = SCALE * outputs.powf(inputs.recip());
        let width = layer.inputs();

        for row in layer.weights_mut().chunks_exact_mut(width) {
            for w in row.iter_mut() {
                *w = rng.random_range(-1.0..=1.0);
            }
            let norm = row.iter().map(|w| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                for w in row.iter_mut() {
                    *w *= beta / norm;
                }
            }
        }
        for bias in layer.biases_mut() {
            *bias = rng.random_range(-beta..=beta);
        }
    }
}
