//! Twitter/X GraphQL provider.
//!
//! - `about`: account-origin enrichment of thread authors
//! - `queries`: query descriptors
//! - `results`: response classification and validators
//! - `conversation`: method families, page fetching, thread construction
//! - `status`: basic raw-status to canonical-status conversion

pub mod about;
pub mod conversation;
pub mod queries;
pub mod results;
pub mod status;

pub use conversation::{single_status_methods, DetailPageFetcher, FetchPolicy, TwitterThreads};
pub use results::{classify, classify_any, ProviderResult, ResultShape};
pub use status::BasicStatusBuilder;
