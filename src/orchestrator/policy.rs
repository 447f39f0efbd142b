//! Weight policy and run options for orchestration calls.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::gateway::Attribution;

use super::types::EndpointMethod;

/// Per-call adjustments to method weights.
///
/// Deployment switches (which host we are on, whether an experiment is
/// active) are turned into this value by the caller and handed to every
/// `orchestrate` call, so selection never depends on ambient state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightPolicy {
    /// Method name -> weight replacing the method's own weight.
    #[serde(default)]
    pub overrides: HashMap<String, f64>,
    /// Method names that must not be tried at all.
    #[serde(default)]
    pub disabled: HashSet<String>,
}

impl WeightPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weight(mut self, method: impl Into<String>, weight: f64) -> Self {
        self.overrides.insert(method.into(), weight);
        self
    }

    pub fn disable(mut self, method: impl Into<String>) -> Self {
        self.disabled.insert(method.into());
        self
    }

    pub fn effective_weight(&self, method: &EndpointMethod) -> f64 {
        self.overrides
            .get(&method.name)
            .copied()
            .unwrap_or(method.weight)
    }

    pub fn is_enabled(&self, method: &EndpointMethod) -> bool {
        method.enabled && !self.disabled.contains(&method.name)
    }

    fn validate(&self) -> Result<(), PolicyError> {
        for (name, weight) in &self.overrides {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(PolicyError::InvalidWeight {
                    method: name.clone(),
                    weight: *weight,
                });
            }
        }
        let total: f64 = self.overrides.values().sum();
        if !total.is_finite() {
            return Err(PolicyError::WeightOverflow);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read weight policy: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse weight policy: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid weight {weight} for method {method}")]
    InvalidWeight { method: String, weight: f64 },
    #[error("weight overrides sum past the representable range")]
    WeightOverflow,
}

/// Load a JSON weight policy, e.g.
/// `{"overrides": {"TweetDetail": 5}, "disabled": ["TweetResultsByIds"]}`.
pub fn load_weight_policy(path: impl AsRef<Path>) -> Result<WeightPolicy, PolicyError> {
    let raw = std::fs::read_to_string(path)?;
    let policy: WeightPolicy = serde_json::from_str(&raw)?;
    policy.validate()?;
    Ok(policy)
}

/// Optional execution settings for one orchestration call.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Seed for primary-method selection; `None` draws from entropy.
    pub rng_seed: Option<u64>,
    /// Attribution stamped on every dispatch.
    pub attribution: Attribution,
}

impl RunOptions {
    pub fn new(caller: &'static str) -> Self {
        Self {
            rng_seed: None,
            attribution: Attribution::new(caller),
        }
    }

    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}
