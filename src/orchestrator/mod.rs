//! Endpoint orchestrator.
//!
//! Runs a batch of keyed requests against the dispatcher:
//! - Requests fan out concurrently and are joined without short-circuiting
//! - Within one request, the weighted primary goes first and fallbacks run
//!   strictly one after another
//! - Every key gets exactly one outcome; nothing escapes as an error

pub mod error;
pub mod policy;
pub mod selector;
pub mod types;

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::gateway::{
    merge_into, Attribution, DispatchError, QueryDescriptor, QueryDispatcher, Variables,
};

pub use error::OrchestratorError;
pub use policy::{load_weight_policy, PolicyError, RunOptions, WeightPolicy};
pub use selector::{select, AttemptOrder, Candidate, NoUsableMethod, Weighted};
pub use types::*;

/// A request with its attempt order already drawn.
struct Prepared {
    request: OrchestratorRequest,
    order: Result<AttemptOrder, OrchestratorError>,
}

pub struct Orchestrator<D: QueryDispatcher + ?Sized> {
    dispatcher: Arc<D>,
}

impl<D: QueryDispatcher + ?Sized> Clone for Orchestrator<D> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<D: QueryDispatcher + ?Sized> Orchestrator<D> {
    pub fn new(dispatcher: Arc<D>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<D> {
        &self.dispatcher
    }

    /// Execute every request and return one outcome per key.
    ///
    /// Requests with a duplicate key are dropped with a warning; the first
    /// occurrence wins.
    pub async fn orchestrate(
        &self,
        requests: Vec<OrchestratorRequest>,
        policy: &WeightPolicy,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> OrchestratorResult {
        let mut rng = match options.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // Draw every primary up front so the fan-out shares no mutable state.
        let mut seen = HashSet::new();
        let mut prepared = Vec::with_capacity(requests.len());
        for request in requests {
            if !seen.insert(request.key.clone()) {
                tracing::warn!(key = %request.key, "Duplicate orchestrator key ignored");
                continue;
            }
            let order = match &request.plan {
                RequestPlan::Single { .. } => Ok(vec![0]),
                RequestPlan::Methods(methods) if methods.is_empty() => {
                    Err(OrchestratorError::EmptyPlan {
                        key: request.key.clone(),
                    })
                }
                RequestPlan::Methods(methods) => {
                    let candidates: Vec<Candidate> = methods
                        .iter()
                        .map(|m| Candidate {
                            weight: policy.effective_weight(m),
                            enabled: policy.is_enabled(m),
                        })
                        .collect();
                    select(&candidates, &mut rng).map_err(|NoUsableMethod| {
                        OrchestratorError::NoUsableMethod {
                            key: request.key.clone(),
                        }
                    })
                }
            };
            prepared.push(Prepared { request, order });
        }

        let outcomes = join_all(prepared.into_iter().map(|p| async move {
            let key = p.request.key.clone();
            let outcome = self.execute(p, &options.attribution, cancel).await;
            (key, outcome)
        }))
        .await;

        let mut result = OrchestratorResult::default();
        for (key, outcome) in outcomes {
            if !outcome.success {
                tracing::debug!(
                    key = %key,
                    required = outcome.required,
                    error = ?outcome.error.as_ref().map(|e| e.code()),
                    "Orchestrator key failed"
                );
            }
            result.insert(key, outcome);
        }
        result
    }

    async fn execute(
        &self,
        prepared: Prepared,
        attribution: &Attribution,
        cancel: &CancellationToken,
    ) -> KeyOutcome {
        let Prepared { request, order } = prepared;
        let order = match order {
            Ok(order) => order,
            Err(err) => return KeyOutcome::failure(request.required, err, 0),
        };

        match &request.plan {
            RequestPlan::Single {
                descriptor,
                validator,
            } => {
                let elevated = request
                    .use_elevated
                    .unwrap_or(descriptor.requires_elevated);
                match self
                    .dispatch_once(descriptor, &request.variables, elevated, attribution, cancel)
                    .await
                {
                    Ok(data) if validator(&data) => KeyOutcome::success(
                        request.required,
                        data,
                        descriptor.query_name.clone(),
                        1,
                    ),
                    Ok(_) => KeyOutcome::failure(
                        request.required,
                        OrchestratorError::ValidationFailed {
                            key: request.key.clone(),
                            query: descriptor.query_name.clone(),
                        },
                        1,
                    ),
                    Err(err) => KeyOutcome::failure(request.required, err.into(), 1),
                }
            }
            RequestPlan::Methods(methods) => {
                self.execute_chain(&request, methods, &order, attribution, cancel)
                    .await
            }
        }
    }

    async fn execute_chain(
        &self,
        request: &OrchestratorRequest,
        methods: &[EndpointMethod],
        order: &[usize],
        attribution: &Attribution,
        cancel: &CancellationToken,
    ) -> KeyOutcome {
        let mut last_error: Option<DispatchError> = None;
        let mut attempts = 0;

        for (position, &idx) in order.iter().enumerate() {
            let method = &methods[idx];
            let mut variables = request.variables.clone();
            merge_into(&mut variables, &method.variables_override);
            let elevated = method
                .use_elevated
                .or(request.use_elevated)
                .unwrap_or(method.descriptor.requires_elevated);

            attempts += 1;
            let outcome = self
                .dispatch_once(&method.descriptor, &variables, elevated, attribution, cancel)
                .await;

            match outcome {
                Ok(data) if (method.validator)(&data) => {
                    tracing::debug!(
                        key = %request.key,
                        method = %method.name,
                        fallback = position > 0,
                        "Method succeeded"
                    );
                    return KeyOutcome::success(
                        request.required,
                        data,
                        method.name.clone(),
                        attempts,
                    );
                }
                Ok(_) => {
                    tracing::warn!(
                        key = %request.key,
                        method = %method.name,
                        "Method response rejected by validator, trying fallbacks"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        key = %request.key,
                        method = %method.name,
                        error = %err,
                        interrupted = err.is_interrupted(),
                        "Method failed, trying fallbacks"
                    );
                    last_error = Some(err);
                }
            }
        }

        KeyOutcome::failure(
            request.required,
            OrchestratorError::AllMethodsFailed {
                key: request.key.clone(),
                attempts,
                last_error: last_error.map(Box::new),
            },
            attempts,
        )
    }

    async fn dispatch_once(
        &self,
        descriptor: &QueryDescriptor,
        variables: &Variables,
        elevated: bool,
        attribution: &Attribution,
        cancel: &CancellationToken,
    ) -> Result<Value, DispatchError> {
        if cancel.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DispatchError::Cancelled),
            result = self.dispatcher.dispatch(descriptor, variables, elevated, attribution) => result,
        }
    }
}
