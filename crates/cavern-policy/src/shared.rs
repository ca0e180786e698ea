use std::{
    path::Path,
    sync::{Arc, PoisonError, RwLock},
};

use cavern_engine::{Action, OBSERVATION_LEN};

use crate::{
    InvalidInputError,
    model::{LoadError, SaveError},
    network::PolicyNetwork,
};

/// Live policy weights shared between the tick loop and background training.
///
/// Readers take a snapshot (`Arc` clone) and run inference on it without
/// holding the lock. Writers replace the whole network at once, so a decision
/// is always made by one complete set of weights.
#[derive(Debug, Clone)]
pub struct SharedPolicy {
    inner: Arc<RwLock<Arc<PolicyNetwork>>>,
}

impl SharedPolicy {
    #[must_use]
    pub fn new(network: PolicyNetwork) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(network))),
        }
    }

    /// Current weights.
    #[must_use]
    pub fn snapshot(&self) -> Arc<PolicyNetwork> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Swaps in a new network and returns the previous one.
    pub fn replace(&self, network: PolicyNetwork) -> Arc<PolicyNetwork> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(network))
    }

    pub fn decide(&self, observation: &[f64]) -> Result<Action, InvalidInputError> {
        self.snapshot().decide(observation)
    }

    /// Loads a pilot network from `path` and swaps it in.
    ///
    /// The live weights are untouched unless the whole file loads and maps
    /// observations to a single output.
    pub fn load<P>(&self, path: P) -> Result<(), LoadError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let network = PolicyNetwork::load(path)?;
        network
            .check_interface(OBSERVATION_LEN, 1)
            .map_err(LoadError::Incompatible)?;
        self.replace(network);
        tracing::info!(path = %path.display(), "policy loaded");
        Ok(())
    }

    pub fn save<P>(&self, path: P) -> Result<(), SaveError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        self.snapshot().save(path)?;
        tracing::info!(path = %path.display(), "policy saved");
        Ok(())
    }
}
