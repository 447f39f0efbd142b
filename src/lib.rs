#![forbid(unsafe_code)]

//! # threadweave
//!
//! Resilient status and thread fetching over an unstable GraphQL backend.
//!
//! Several upstream queries can answer the same question, each with its own
//! reliability and cost. The orchestrator picks one by weighted draw, falls
//! back through the rest when a response fails or does not validate, and
//! always returns one outcome per requested key. On top of that, the thread
//! reconstructor walks a conversation from a focal status: replies forward by
//! the same author, parents backward regardless of author, pulling more pages
//! through cursors as it goes.

pub mod config;
pub mod gateway;
pub mod orchestrator;
pub mod provider;
pub mod thread;

pub use config::{ClientConfig, ConfigError};
pub use gateway::{
    Attribution, DispatchError, QueryDescriptor, QueryDispatcher, QueryGateway, UsageSink,
};
pub use orchestrator::{
    load_weight_policy, EndpointMethod, Orchestrator, OrchestratorError, OrchestratorRequest,
    OrchestratorResult, RunOptions, WeightPolicy,
};
pub use provider::twitter::{BasicStatusBuilder, FetchPolicy, TwitterThreads};
pub use thread::{
    build_bucket, compare_ids, Bucket, Item, ReconstructError, Status, StatusBuilder, Thread,
    ThreadReconstructor,
};
