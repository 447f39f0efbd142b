//! Request and result types for the endpoint orchestrator.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::gateway::{QueryDescriptor, Variables};

use super::error::OrchestratorError;

/// Pure predicate over a raw deserialized response.
///
/// Recognizable negative answers ("not found", "unavailable: Protected") are
/// valid; only unrecognized shapes should return `false`.
pub type Validator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

pub fn validator<F>(f: F) -> Validator
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

// =============================================================================
// METHODS
// =============================================================================

/// One concrete way to satisfy a logical request.
#[derive(Clone)]
pub struct EndpointMethod {
    pub name: String,
    pub descriptor: Arc<QueryDescriptor>,
    /// Preference among usable methods; `0` means never tried.
    pub weight: f64,
    /// Availability, independent of weight.
    pub enabled: bool,
    /// Layered over the request's variables; method keys win.
    pub variables_override: Variables,
    pub validator: Validator,
    /// Overrides the request and descriptor elevated flags when set.
    pub use_elevated: Option<bool>,
}

impl EndpointMethod {
    pub fn new(
        name: impl Into<String>,
        descriptor: Arc<QueryDescriptor>,
        weight: f64,
        validator: Validator,
    ) -> Self {
        Self {
            name: name.into(),
            descriptor,
            weight,
            enabled: true,
            variables_override: Variables::new(),
            validator,
            use_elevated: None,
        }
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        if let Value::Object(map) = variables {
            self.variables_override = map;
        }
        self
    }

    pub fn elevated(mut self, use_elevated: bool) -> Self {
        self.use_elevated = Some(use_elevated);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl fmt::Debug for EndpointMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointMethod")
            .field("name", &self.name)
            .field("query", &self.descriptor.query_name)
            .field("weight", &self.weight)
            .field("enabled", &self.enabled)
            .field("variables_override", &self.variables_override)
            .field("use_elevated", &self.use_elevated)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

/// How a request is satisfied: one fixed query, or a weighted method set.
#[derive(Clone)]
pub enum RequestPlan {
    Single {
        descriptor: Arc<QueryDescriptor>,
        validator: Validator,
    },
    Methods(Vec<EndpointMethod>),
}

impl fmt::Debug for RequestPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single { descriptor, .. } => f
                .debug_struct("Single")
                .field("query", &descriptor.query_name)
                .finish_non_exhaustive(),
            Self::Methods(methods) => f.debug_tuple("Methods").field(methods).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorRequest {
    /// Unique within one `orchestrate` call; addresses the outcome.
    pub key: String,
    /// Passed through to the outcome for the caller to branch on.
    pub required: bool,
    pub plan: RequestPlan,
    pub variables: Variables,
    pub use_elevated: Option<bool>,
}

impl OrchestratorRequest {
    pub fn single(
        key: impl Into<String>,
        descriptor: Arc<QueryDescriptor>,
        validator: Validator,
    ) -> Self {
        Self::with_plan(key, RequestPlan::Single { descriptor, validator })
    }

    pub fn methods(key: impl Into<String>, methods: Vec<EndpointMethod>) -> Self {
        Self::with_plan(key, RequestPlan::Methods(methods))
    }

    fn with_plan(key: impl Into<String>, plan: RequestPlan) -> Self {
        Self {
            key: key.into(),
            required: false,
            plan,
            variables: Variables::new(),
            use_elevated: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        if let Value::Object(map) = variables {
            self.variables = map;
        }
        self
    }

    pub fn elevated(mut self, use_elevated: bool) -> Self {
        self.use_elevated = Some(use_elevated);
        self
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// Final state of one key, atomically success or failure.
#[derive(Debug)]
pub struct KeyOutcome {
    pub success: bool,
    pub required: bool,
    pub data: Option<Value>,
    pub error: Option<OrchestratorError>,
    /// Method (or query) name that produced `data`.
    pub method: Option<String>,
    /// Number of dispatches issued for this key.
    pub attempts: usize,
}

impl KeyOutcome {
    pub(crate) fn success(required: bool, data: Value, method: String, attempts: usize) -> Self {
        Self {
            success: true,
            required,
            data: Some(data),
            error: None,
            method: Some(method),
            attempts,
        }
    }

    pub(crate) fn failure(required: bool, error: OrchestratorError, attempts: usize) -> Self {
        Self {
            success: false,
            required,
            data: None,
            error: Some(error),
            method: None,
            attempts,
        }
    }
}

/// One outcome per input request, keyed by request key.
#[derive(Debug, Default)]
pub struct OrchestratorResult {
    outcomes: HashMap<String, KeyOutcome>,
}

impl OrchestratorResult {
    pub(crate) fn insert(&mut self, key: String, outcome: KeyOutcome) {
        self.outcomes.insert(key, outcome);
    }

    pub fn get(&self, key: &str) -> Option<&KeyOutcome> {
        self.outcomes.get(key)
    }

    pub fn is_success(&self, key: &str) -> bool {
        self.outcomes.get(key).is_some_and(|o| o.success)
    }

    /// Move the data out of a successful key.
    pub fn take_data(&mut self, key: &str) -> Option<Value> {
        self.outcomes.get_mut(key).and_then(|o| o.data.take())
    }

    /// Remove and return the whole outcome for `key`.
    pub fn take(&mut self, key: &str) -> Option<KeyOutcome> {
        self.outcomes.remove(key)
    }

    /// Keys of required requests that failed, sorted.
    pub fn failed_required(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .outcomes
            .iter()
            .filter(|(_, o)| o.required && !o.success)
            .map(|(k, _)| k.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.outcomes.keys().map(|k| k.as_str())
    }
}
