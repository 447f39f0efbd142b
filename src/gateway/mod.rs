//! Query gateway: puts one named remote query on the wire.
//!
//! The gateway owns the dispatch contract: merge descriptor defaults with
//! call-supplied variables, pick the guest or elevated route, bound the call
//! in time, record usage. It never retries; retry and fallback policy lives in
//! the orchestrator.

pub mod error;
pub mod graphql;
pub mod types;
pub mod usage;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use graphql::{GraphqlAdapter, QueryTransport};
use usage::UsageSink as UsageSinkTrait;

pub use error::{DispatchError, ErrorContext};
pub use types::*;
pub use usage::{CallStatus, DispatchRecord, NoopUsageSink, StderrUsageSink, UsageSink};

#[async_trait::async_trait]
pub trait QueryDispatcher: Send + Sync {
    /// Execute `descriptor` once with `variables` layered over its defaults.
    async fn dispatch(
        &self,
        descriptor: &QueryDescriptor,
        variables: &Variables,
        elevated: bool,
        attribution: &Attribution,
    ) -> Result<Value, DispatchError>;
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Upper bound for a single dispatch, on top of the client timeout.
    pub dispatch_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout: Duration::from_secs(20),
        }
    }
}

pub struct QueryGateway<U: UsageSinkTrait, T: QueryTransport = GraphqlAdapter> {
    transport: T,
    usage_sink: Arc<U>,
    config: GatewayConfig,
}

#[async_trait::async_trait]
impl<U: UsageSinkTrait, T: QueryTransport> QueryDispatcher for QueryGateway<U, T> {
    async fn dispatch(
        &self,
        descriptor: &QueryDescriptor,
        variables: &Variables,
        elevated: bool,
        attribution: &Attribution,
    ) -> Result<Value, DispatchError> {
        QueryGateway::dispatch(self, descriptor, variables, elevated, attribution).await
    }
}

impl<U: UsageSinkTrait> QueryGateway<U, GraphqlAdapter> {
    pub fn from_env(usage_sink: Arc<U>) -> Result<Self, DispatchError> {
        let transport = GraphqlAdapter::from_env()?;
        Ok(Self {
            transport,
            usage_sink,
            config: GatewayConfig::default(),
        })
    }
}

impl<U: UsageSinkTrait, T: QueryTransport> QueryGateway<U, T> {
    pub fn with_config(transport: T, usage_sink: Arc<U>, config: GatewayConfig) -> Self {
        Self {
            transport,
            usage_sink,
            config,
        }
    }

    pub async fn dispatch(
        &self,
        descriptor: &QueryDescriptor,
        variables: &Variables,
        elevated: bool,
        attribution: &Attribution,
    ) -> Result<Value, DispatchError> {
        let merged = descriptor.merged_variables(variables);
        let started = std::time::Instant::now();

        let result = tokio::time::timeout(
            self.config.dispatch_timeout,
            self.transport.send(descriptor, &merged, elevated),
        )
        .await
        .unwrap_or(Err(DispatchError::Timeout(self.config.dispatch_timeout)));

        let record = DispatchRecord::new(
            descriptor.query_name.as_str(),
            descriptor.query_id.as_str(),
            attribution.caller,
        )
        .elevated(elevated)
        .request(attribution.request_id);

        match result {
            Ok(resp) => {
                let record = record
                    .http_status(Some(resp.http_status))
                    .latency(resp.latency.as_millis() as i64);
                self.usage_sink.record(record).await;
                Ok(resp.body)
            }
            Err(err) => {
                tracing::debug!(
                    query = %descriptor.query_name,
                    elevated,
                    error = %err,
                    "Dispatch failed"
                );
                let record = record
                    .http_status(err.http_status())
                    .latency(started.elapsed().as_millis() as i64)
                    .error(err.code());
                self.usage_sink.record(record).await;
                Err(err)
            }
        }
    }
}
