use std::path::PathBuf;

use cavern_policy::trainer::TrainingParams;
use serde::{Deserialize, Serialize};

/// Where a training run executes.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum TrainingMode {
    /// On a worker thread; the tick loop keeps running.
    #[default]
    Background,
    /// Inside the toggle call.
    Blocking,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PilotConfig {
    pub training: TrainingParams,
    pub training_mode: TrainingMode,
    /// Model file written after every training run.
    pub model_path: Option<PathBuf>,
}
