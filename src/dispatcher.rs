//! Batch dispatch orchestration.
//!
//! The [`BatchDispatcher`] drives one batch end to end: structural
//! validation, matcher sweep and context building per descriptor, concurrent
//! handler invocation, and result extraction. Per-item conditions (route
//! misses, policy exclusions, handler faults) are absorbed into their result
//! slots; only structural conditions abort the whole call.
//!
//! # Concurrency
//!
//! Matched invocations are spawned as independent tasks and joined as a
//! barrier: every invocation completes before extraction starts, and the
//! result list preserves input order by index, not completion order.
//!
//! # Fault policy
//!
//! A handler that returns an error, panics, or is cancelled yields an
//! [`InvocationOutcome`] other than `Completed`. Such slots are standardized
//! to a 500 placeholder response with empty body; they never abort the
//! batch. This is a deliberate departure from letting one sub-request's
//! failure take down the whole call.

use crate::{
    config::BatchOptions,
    context::{Principal, SyntheticRequest, SyntheticResponse, build_request},
    error::{BatchError, DispatchResult},
    extractor::extract_result,
    logging::log_batch_dispatch,
    matcher::{MatchOutcome, RouteMatcher, TemplateCache},
    route::RouteEntry,
    router::Router,
    types::{HttpMethod, SubRequest, SubRequestResult},
};
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// Typed outcome of one handler invocation.
///
/// Handled explicitly by the dispatcher rather than being swallowed by task
/// plumbing.
#[derive(Debug)]
pub enum InvocationOutcome {
    /// The handler ran to completion and populated the response.
    Completed(SyntheticResponse),
    /// The handler returned an error or panicked.
    Faulted(BatchError),
    /// The invocation task was cancelled before completion.
    Cancelled,
}

/// One descriptor's pending resolution after the matcher sweep.
enum Pending {
    /// Matched: invoke the route's handler with the built request.
    Invoke {
        route: Arc<RouteEntry>,
        request: SyntheticRequest,
    },
    /// Ignored or unresolved: resolves immediately to a synthetic 404.
    NotFound,
}

/// An issued invocation awaiting fan-in.
enum Issued {
    Spawned(JoinHandle<DispatchResult<SyntheticResponse>>),
    Immediate(SyntheticResponse),
}

/// Orchestrates batch dispatch against a router collaborator.
///
/// # Example
/// ```rust,ignore
/// let dispatcher = BatchDispatcher::new(Arc::new(table), BatchOptions::default());
/// let results = dispatcher.run(&descriptors, None).await?;
/// assert_eq!(results.len(), descriptors.len());
/// ```
pub struct BatchDispatcher {
    router: Arc<dyn Router>,
    matcher: RouteMatcher,
    options: BatchOptions,
}

impl BatchDispatcher {
    /// Create a dispatcher with a fresh template cache.
    pub fn new(router: Arc<dyn Router>, options: BatchOptions) -> Self {
        Self::with_cache(router, options, Arc::new(TemplateCache::new()))
    }

    /// Create a dispatcher backed by an existing template cache.
    ///
    /// Lets callers share one cache across dispatchers, or pre-seed and
    /// inspect it in tests.
    pub fn with_cache(
        router: Arc<dyn Router>,
        options: BatchOptions,
        cache: Arc<TemplateCache>,
    ) -> Self {
        Self {
            router,
            matcher: RouteMatcher::new(cache),
            options,
        }
    }

    /// The options this dispatcher was built with.
    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// The template cache backing the route matcher.
    pub fn template_cache(&self) -> &Arc<TemplateCache> {
        self.matcher.cache()
    }

    /// Dispatch one batch of descriptors.
    ///
    /// Returns one result per descriptor, in descriptor order; unmatched and
    /// policy-excluded descriptors occupy their slot with a 404 result.
    /// Fails wholesale, with no results at all, only on structural validation
    /// errors: an unknown HTTP method or an undecodable declared-base64 body
    /// in any descriptor.
    pub async fn run(
        &self,
        descriptors: &[SubRequest],
        principal: Option<&Principal>,
    ) -> DispatchResult<Vec<SubRequestResult>> {
        let batch_id = Uuid::new_v4();
        let start = std::time::Instant::now();

        // Step 1: structural validation. Unknown verbs fail the whole call.
        for descriptor in descriptors {
            if HttpMethod::parse(&descriptor.method).is_none() {
                warn!(
                    batch_id = %batch_id,
                    method = %descriptor.method,
                    "Batch validation failed: unknown HTTP method"
                );
                return Err(BatchError::unknown_method(&descriptor.method));
            }
        }

        debug!(
            batch_id = %batch_id,
            batch_size = descriptors.len(),
            "Dispatching batch"
        );

        // Step 2: matcher sweep and context building, in input order. The
        // table snapshot is read-only for the duration of the batch. A body
        // decode failure anywhere invalidates the entire batch.
        let table = self.router.route_table();
        let mut pendings = Vec::with_capacity(descriptors.len());
        let mut matched = 0usize;

        for descriptor in descriptors {
            match self.matcher.resolve(&table, descriptor) {
                MatchOutcome::Matched { route, params } => {
                    let request =
                        build_request(&route, descriptor, params, &self.options, principal)?;
                    matched += 1;
                    pendings.push(Pending::Invoke { route, request });
                }
                MatchOutcome::Ignored | MatchOutcome::NoMatch => {
                    pendings.push(Pending::NotFound);
                }
            }
        }

        // Step 3: fan out every matched invocation as its own task, then
        // join all of them. Index correlation keeps input order.
        let issued: Vec<Issued> = pendings
            .into_iter()
            .map(|pending| match pending {
                Pending::Invoke { route, request } => {
                    Issued::Spawned(tokio::spawn(self.router.invoke(route, request)))
                }
                Pending::NotFound => Issued::Immediate(SyntheticResponse::not_found()),
            })
            .collect();

        let outcomes = join_all(issued.into_iter().map(resolve_invocation)).await;

        // Step 4: extraction, same order.
        let mut faulted = 0usize;
        let results = outcomes
            .into_iter()
            .map(|outcome| {
                let response = match outcome {
                    InvocationOutcome::Completed(response) => response,
                    InvocationOutcome::Faulted(error) => {
                        faulted += 1;
                        warn!(
                            batch_id = %batch_id,
                            error = %error,
                            "Sub-request invocation faulted; slot standardized to 500"
                        );
                        SyntheticResponse::internal_error()
                    }
                    InvocationOutcome::Cancelled => {
                        faulted += 1;
                        warn!(
                            batch_id = %batch_id,
                            "Sub-request invocation cancelled; slot standardized to 500"
                        );
                        SyntheticResponse::internal_error()
                    }
                };
                extract_result(&response)
            })
            .collect::<Vec<_>>();

        log_batch_dispatch(
            &batch_id.to_string(),
            descriptors.len(),
            matched,
            descriptors.len() - matched,
            faulted,
            start.elapsed().as_millis() as u64,
        );

        Ok(results)
    }
}

/// Await one issued invocation and classify its outcome.
async fn resolve_invocation(issued: Issued) -> InvocationOutcome {
    match issued {
        Issued::Immediate(response) => InvocationOutcome::Completed(response),
        Issued::Spawned(handle) => match handle.await {
            Ok(Ok(response)) => InvocationOutcome::Completed(response),
            Ok(Err(error)) => InvocationOutcome::Faulted(error),
            Err(join_error) if join_error.is_cancelled() => InvocationOutcome::Cancelled,
            Err(join_error) => InvocationOutcome::Faulted(
                BatchError::handler_fault("Handler invocation panicked")
                    .with_cause(join_error.to_string()),
            ),
        },
    }
}
