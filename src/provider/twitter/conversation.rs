//! Status and thread fetching on top of the orchestrator.
//!
//! - `single_status_methods`: the weighted method family for one status
//! - `DetailPageFetcher`: conversation pages for the reconstructor
//! - `TwitterThreads::construct_thread`: the full flow with response codes
//! - `TwitterThreads::attach_about_account`: optional author enrichment

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::gateway::QueryDispatcher;
use crate::orchestrator::{
    EndpointMethod, Orchestrator, OrchestratorRequest, RunOptions, Validator, WeightPolicy,
};
use crate::thread::{
    build_bucket, AboutAccount, BuildOutcome, Bucket, Cursor, FetchError, Item, PageFetcher,
    ReconstructConfig, Status, StatusBuilder, Thread, ThreadReconstructor,
};

use super::about::{apply_about_accounts, parse_about_account, screen_names};
use super::queries::{
    ABOUT_ACCOUNT, TWEET_DETAIL, TWEET_RESULTS_BY_IDS, TWEET_RESULTS_BY_REST_IDS,
    TWEET_RESULT_BY_ID, TWEET_RESULT_BY_REST_ID,
};
use super::results::{
    about_account_validator, classify_any, detail_instructions, first_page_validator,
    is_detail_response, page_validator, status_validator, ProviderResult, ResultShape,
};

const STATUS_KEY: &str = "status";
const PAGE_KEY: &str = "page";

/// Deployment facts that shape the single-status method family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchPolicy {
    /// The caller wants the surrounding thread, so a conversation page is
    /// worth more than a bare status.
    pub process_thread: bool,
    /// Requests arrive on an API host rather than an embed host.
    pub api_host: bool,
    /// An elevated (pre-authenticated) route is configured.
    pub elevated_available: bool,
}

/// Weighted ways to fetch one status.
///
/// Weights are relative; `0` keeps a method out of both primary selection and
/// fallback.
pub fn single_status_methods(id: &str, policy: &FetchPolicy) -> Vec<EndpointMethod> {
    let threading = policy.process_thread;
    vec![
        EndpointMethod::new(
            "TweetDetail",
            TWEET_DETAIL.clone(),
            if threading { 1000.0 } else { 10.0 },
            page_validator(),
        )
        .with_variables(json!({ "focalTweetId": id })),
        EndpointMethod::new(
            "TweetResultByRestId",
            TWEET_RESULT_BY_REST_ID.clone(),
            if threading { 0.0 } else { 50.0 },
            status_validator(ResultShape::ByRestId),
        )
        .with_variables(json!({ "tweetId": id })),
        EndpointMethod::new(
            "TweetResultsByIds",
            TWEET_RESULTS_BY_IDS.clone(),
            if threading || policy.api_host { 0.0 } else { 500.0 },
            status_validator(ResultShape::ByIds),
        )
        .with_variables(json!({ "rest_ids": [id] })),
        EndpointMethod::new(
            "TweetResultsByRestIds",
            TWEET_RESULTS_BY_REST_IDS.clone(),
            if threading { 0.0 } else { 500.0 },
            status_validator(ResultShape::ByRestIds),
        )
        .with_variables(json!({ "tweetIds": [id] })),
    ]
}

// =============================================================================
// PAGES
// =============================================================================

/// Fetches conversation pages with a single fixed query; no fallback.
pub struct DetailPageFetcher<D: QueryDispatcher + ?Sized> {
    orchestrator: Orchestrator<D>,
    options: RunOptions,
}

impl<D: QueryDispatcher + ?Sized> DetailPageFetcher<D> {
    pub fn new(orchestrator: Orchestrator<D>, options: RunOptions) -> Self {
        Self {
            orchestrator,
            options,
        }
    }

    /// One conversation page around `focal_id`, raw.
    pub async fn fetch_raw(
        &self,
        focal_id: &str,
        cursor: Option<&str>,
        validator: Validator,
        cancel: &CancellationToken,
    ) -> Result<Value, FetchError> {
        let request = OrchestratorRequest::single(PAGE_KEY, TWEET_DETAIL.clone(), validator)
            .required()
            .with_variables(json!({ "focalTweetId": focal_id, "cursor": cursor }));

        let mut result = self
            .orchestrator
            .orchestrate(vec![request], &WeightPolicy::default(), &self.options, cancel)
            .await;

        let outcome = result.take(PAGE_KEY).ok_or(FetchError::Empty)?;
        match (outcome.data, outcome.error) {
            (Some(data), _) => Ok(data),
            (None, Some(err)) => Err(FetchError::Orchestration(err)),
            (None, None) => Err(FetchError::Empty),
        }
    }
}

#[async_trait]
impl<D: QueryDispatcher + ?Sized> PageFetcher for DetailPageFetcher<D> {
    async fn fetch_page(
        &self,
        focal_id: &str,
        cursor: &Cursor,
        cancel: &CancellationToken,
    ) -> Result<Bucket, FetchError> {
        let data = self
            .fetch_raw(focal_id, Some(&cursor.value), page_validator(), cancel)
            .await?;
        let instructions = detail_instructions(&data)
            .ok_or_else(|| FetchError::MalformedPage("missing timeline instructions".into()))?;
        Ok(build_bucket(instructions))
    }
}

// =============================================================================
// THREADS
// =============================================================================

/// Fetches statuses and assembles threads.
pub struct TwitterThreads<D: QueryDispatcher + ?Sized, B: StatusBuilder + ?Sized> {
    orchestrator: Orchestrator<D>,
    pages: Arc<DetailPageFetcher<D>>,
    builder: Arc<B>,
    weights: WeightPolicy,
    options: RunOptions,
    api_host: bool,
    elevated_available: bool,
    about_account: bool,
    reconstruct: ReconstructConfig,
}

impl<D: QueryDispatcher + ?Sized, B: StatusBuilder + ?Sized> TwitterThreads<D, B> {
    pub fn new(dispatcher: Arc<D>, builder: Arc<B>) -> Self {
        let orchestrator = Orchestrator::new(dispatcher);
        let options = RunOptions::new("threadweave");
        Self {
            pages: Arc::new(DetailPageFetcher::new(orchestrator.clone(), options.clone())),
            orchestrator,
            builder,
            weights: WeightPolicy::default(),
            options,
            api_host: false,
            elevated_available: false,
            about_account: true,
            reconstruct: ReconstructConfig::default(),
        }
    }

    pub fn with_weights(mut self, weights: WeightPolicy) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.pages = Arc::new(DetailPageFetcher::new(
            self.orchestrator.clone(),
            options.clone(),
        ));
        self.options = options;
        self
    }

    pub fn api_host(mut self, api_host: bool) -> Self {
        self.api_host = api_host;
        self
    }

    pub fn elevated_available(mut self, available: bool) -> Self {
        self.elevated_available = available;
        self
    }

    /// Look up account-origin details for thread authors (default on).
    /// Only runs when an elevated route is available.
    pub fn about_account(mut self, enabled: bool) -> Self {
        self.about_account = enabled;
        self
    }

    pub fn with_reconstruct_config(mut self, config: ReconstructConfig) -> Self {
        self.reconstruct = config;
        self
    }

    fn policy(&self, process_thread: bool) -> FetchPolicy {
        FetchPolicy {
            process_thread,
            api_host: self.api_host,
            elevated_available: self.elevated_available,
        }
    }

    /// Fetch one status through whichever method the selector picks.
    ///
    /// Without an elevated route only the guest by-rest-id query is tried.
    /// Returns the raw body of the winning method, or `None` if every
    /// attempt failed.
    pub async fn fetch_single_status(
        &self,
        id: &str,
        process_thread: bool,
        cancel: &CancellationToken,
    ) -> Option<Value> {
        let policy = self.policy(process_thread);
        let request = match policy.elevated_available {
            true => OrchestratorRequest::methods(STATUS_KEY, single_status_methods(id, &policy)),
            false => OrchestratorRequest::single(
                STATUS_KEY,
                TWEET_RESULT_BY_REST_ID.clone(),
                status_validator(ResultShape::ByRestId),
            )
            .with_variables(json!({ "tweetId": id })),
        };
        let request = request.required();

        let mut result = self
            .orchestrator
            .orchestrate(vec![request], &self.weights, &self.options, cancel)
            .await;

        let outcome = result.take(STATUS_KEY)?;
        if let Some(err) = &outcome.error {
            tracing::warn!(id = %id, error = %err, code = err.code(), "Status fetch failed");
        } else {
            tracing::debug!(
                id = %id,
                method = ?outcome.method,
                attempts = outcome.attempts,
                "Status fetched"
            );
        }
        outcome.data
    }

    /// Fetch one status by id on the elevated app route, raw.
    ///
    /// A single fixed query with no fallback; `None` if it failed.
    pub async fn fetch_by_id(&self, id: &str, cancel: &CancellationToken) -> Option<Value> {
        let request = OrchestratorRequest::single(
            STATUS_KEY,
            TWEET_RESULT_BY_ID.clone(),
            status_validator(ResultShape::ById),
        )
        .required()
        .elevated(true)
        .with_variables(json!({ "rest_id": id }));

        let mut result = self
            .orchestrator
            .orchestrate(vec![request], &self.weights, &self.options, cancel)
            .await;

        let outcome = result.take(STATUS_KEY)?;
        if let Some(err) = &outcome.error {
            tracing::warn!(id = %id, error = %err, code = err.code(), "Status fetch by id failed");
        }
        outcome.data
    }

    /// Fetch `id` and, when `process_thread` is set, the thread around it.
    ///
    /// The returned code is 200 on success, 401 for a protected status and
    /// 404 otherwise. A successful thread is then enriched with account
    /// details where the elevated route allows it.
    pub async fn construct_thread(
        &self,
        id: &str,
        process_thread: bool,
        cancel: &CancellationToken,
    ) -> Thread {
        let mut thread = self.assemble_thread(id, process_thread, cancel).await;
        if thread.code == 200 && self.elevated_available && self.about_account {
            self.attach_about_account(&mut thread, cancel).await;
        }
        thread
    }

    /// Enrich every author in `thread` with account-origin details.
    ///
    /// Sends one optional lookup per distinct screen name in a single
    /// orchestration. Authors whose lookup failed are left as they were.
    pub async fn attach_about_account(&self, thread: &mut Thread, cancel: &CancellationToken) {
        let names = screen_names(thread);
        if names.is_empty() {
            return;
        }

        let requests = names
            .iter()
            .map(|(key, screen_name)| {
                let validator = about_account_validator();
                OrchestratorRequest::single(key.clone(), ABOUT_ACCOUNT.clone(), validator)
                    .with_variables(json!({ "screenName": screen_name }))
            })
            .collect();
        let mut result = self
            .orchestrator
            .orchestrate(requests, &WeightPolicy::default(), &self.options, cancel)
            .await;

        let found: HashMap<String, AboutAccount> = names
            .keys()
            .filter_map(|key| {
                let data = result.take_data(key)?;
                Some((key.clone(), parse_about_account(&data)?))
            })
            .collect();
        let merged = apply_about_accounts(thread, &found);
        tracing::debug!(
            requested = names.len(),
            found = found.len(),
            merged,
            "About-account lookup finished"
        );
    }

    async fn assemble_thread(
        &self,
        id: &str,
        process_thread: bool,
        cancel: &CancellationToken,
    ) -> Thread {
        let Some(mut response) = self.fetch_single_status(id, process_thread, cancel).await else {
            return Thread::not_found();
        };

        if !is_detail_response(&response) {
            let status = match self.status_from_single(&response).await {
                Ok(status) => status,
                Err(failed) => return failed,
            };
            if !process_thread || !self.elevated_available {
                return Thread::single(status);
            }

            tracing::debug!(id = %id, "Escalating to conversation page for thread");
            match self
                .pages
                .fetch_raw(id, None, first_page_validator(id), cancel)
                .await
            {
                Ok(page) if is_detail_response(&page) => response = page,
                Ok(_) => return Thread::single(status),
                Err(e) => {
                    tracing::warn!(
                        id = %id,
                        error = %e,
                        "Conversation page unavailable, returning single status"
                    );
                    return Thread::single(status);
                }
            }
        }

        let bucket = detail_instructions(&response)
            .map(build_bucket)
            .unwrap_or_default();
        let Some(focal) = bucket.find(id).cloned() else {
            tracing::debug!(id = %id, "Focal status missing from conversation page");
            return Thread::not_found();
        };
        let status = match self.build_focal(&focal).await {
            Ok(status) => status,
            Err(failed) => return failed,
        };
        if !process_thread {
            return Thread::single(status);
        }

        let reconstructor = ThreadReconstructor::with_config(
            self.pages.clone(),
            self.builder.clone(),
            self.reconstruct.clone(),
        );
        let reconstruction = reconstructor
            .reconstruct(id, bucket, status.author.as_ref(), cancel)
            .await;
        match reconstruction {
            Ok(reconstruction) => Thread::with_thread(status, reconstruction.statuses),
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "Thread reconstruction failed");
                Thread::not_found()
            }
        }
    }

    async fn status_from_single(&self, response: &Value) -> Result<Status, Thread> {
        match classify_any(response) {
            Some(ProviderResult::Found(raw)) => match Item::from_status(&raw) {
                Some(item) => self.build_focal(&item).await,
                None => Err(Thread::not_found()),
            },
            Some(result) if result.is_protected() => Err(Thread::unauthorized()),
            Some(ProviderResult::Unavailable { reason }) => {
                tracing::debug!(reason = %reason, "Status unavailable");
                Err(Thread::not_found())
            }
            _ => Err(Thread::not_found()),
        }
    }

    async fn build_focal(&self, item: &Item) -> Result<Status, Thread> {
        match self.builder.build(item, None).await {
            BuildOutcome::Built(status) => Ok(status),
            BuildOutcome::Unauthorized => Err(Thread::unauthorized()),
            BuildOutcome::NotFound => Err(Thread::not_found()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method_weights(methods: &[EndpointMethod]) -> Vec<(&str, f64)> {
        methods.iter().map(|m| (m.name.as_str(), m.weight)).collect()
    }

    #[test]
    fn guest_weights_prefer_batch_queries() {
        let policy = FetchPolicy {
            elevated_available: true,
            ..FetchPolicy::default()
        };
        let methods = single_status_methods("1", &policy);
        assert_eq!(
            method_weights(&methods),
            vec![
                ("TweetDetail", 10.0),
                ("TweetResultByRestId", 50.0),
                ("TweetResultsByIds", 500.0),
                ("TweetResultsByRestIds", 500.0),
            ]
        );
        assert_eq!(methods[2].variables_override["rest_ids"], json!(["1"]));
    }

    #[test]
    fn threading_leaves_only_the_conversation_page() {
        let policy = FetchPolicy {
            process_thread: true,
            elevated_available: true,
            ..FetchPolicy::default()
        };
        let methods = single_status_methods("1", &policy);
        let usable: Vec<&str> = methods
            .iter()
            .filter(|m| m.weight > 0.0)
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(usable, vec!["TweetDetail"]);
    }

    #[test]
    fn api_host_drops_by_ids() {
        let policy = FetchPolicy {
            api_host: true,
            elevated_available: true,
            ..FetchPolicy::default()
        };
        let methods = single_status_methods("1", &policy);
        assert_eq!(methods[2].weight, 0.0);
        assert_eq!(methods[3].weight, 500.0);
    }
}
