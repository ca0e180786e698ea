use std::path::PathBuf;

use anyhow::Context;
use cavern_policy::network::DenseLayer;

use crate::util::{self, Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct InspectArg {
    /// Path to the model file (JSON format)
    model_path: PathBuf,
    /// Print the parsed model as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WeightStats {
    min: f64,
    max: f64,
    mean_abs: f64,
}

impl WeightStats {
    #[expect(clippy::cast_precision_loss)]
    fn of(values: &[f64]) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean_abs = values.iter().map(|v| v.abs()).sum::<f64>() / values.len().max(1) as f64;
        Self { min, max, mean_abs }
    }
}

pub(crate) fn run(arg: &InspectArg) -> anyhow::Result<()> {
    let InspectArg { model_path, json } = arg;

    if *json {
        let model = util::read_model_file(model_path)?;
        return Output::save_json(&model, None);
    }

    let (model, network) = util::read_pilot_network(model_path)
        .with_context(|| format!("Failed to inspect {}", model_path.display()))?;

    println!("Model: {}", model_path.display());
    println!("  Format version: {}", model.format_version);
    match model.trained_at {
        Some(trained_at) => println!("  Trained at: {trained_at}"),
        None => println!("  Trained at: -"),
    }
    println!("  Layer sizes: {:?}", model.architecture.layer_sizes);
    println!("  Activations: {:?}", model.architecture.activations);

    if let Some(training) = &model.training {
        println!("Training:");
        println!("  Samples: {}", training.samples);
        println!("  Epochs: {}", training.epochs);
        println!("  Final error: {:.6}", training.final_error);
        println!("  Stopped: {}", training.stop_reason);
        println!("  Elapsed: {:.2?}", training.elapsed);
    }

    println!("Weights:");
    for (i, layer) in network.layers().iter().enumerate() {
        print_layer(i, layer);
    }
    Ok(())
}

fn print_layer(index: usize, layer: &DenseLayer) {
    let weights = WeightStats::of(layer.weights());
    let biases = WeightStats::of(layer.biases());
    println!(
        "  #{index} {}x{} {:?}",
        layer.outputs(),
        layer.inputs(),
        layer.activation()
    );
    println!(
        "    Weights: min {:.3}, max {:.3}, mean |w| {:.3}",
        weights.min, weights.max, weights.mean_abs
    );
    println!(
        "    Biases:  min {:.3}, max {:.3}, mean |b| {:.3}",
        biases.min, biases.max, biases.mean_abs
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_stats() {
        let stats = WeightStats::of(&[-2.0, 1.0, 0.5, 0.5]);
        assert_eq!(
            stats,
            WeightStats {
                min: -2.0,
                max: 1.0,
                mean_abs: 1.0
            }
        );
    }
}
