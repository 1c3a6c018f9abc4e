//! Route table entries and batch dispatch policy.
//!
//! A [`RouteEntry`] pairs a path template with its declared methods, its
//! handler, and a [`DispatchPolicy`] resolved once at registration time.
//! Policy resolution mirrors attribute semantics: a route (or its owning
//! group) may be marked ignored for batch dispatch, and a route-level allow
//! marker overrides an exclusion inherited from its group.

use crate::{
    context::{SyntheticRequest, SyntheticResponse},
    error::DispatchResult,
    types::HttpMethod,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Whether a route participates in batch dispatch.
///
/// Computed once when the route is registered; matched-but-excluded routes
/// resolve to a 404 result for the addressing descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPolicy {
    /// The route may be addressed by batch sub-requests.
    #[default]
    Allowed,
    /// The route is hidden from batch sub-requests.
    Excluded,
}

/// Boxed route handler for type erasure.
pub(crate) type BoxedRouteHandler = Arc<
    dyn Fn(SyntheticRequest) -> Pin<Box<dyn Future<Output = DispatchResult<SyntheticResponse>> + Send>>
        + Send
        + Sync,
>;

/// Trait for route handler functions.
///
/// Automatically implemented for async functions with the signature:
/// `async fn(SyntheticRequest) -> DispatchResult<SyntheticResponse>`
pub trait RouteHandler: Clone + Send + Sync + 'static {
    /// The future type returned by the handler
    type Future: Future<Output = DispatchResult<SyntheticResponse>> + Send;

    /// Call the handler with the synthetic request
    fn call(&self, request: SyntheticRequest) -> Self::Future;
}

impl<F, Fut> RouteHandler for F
where
    F: Fn(SyntheticRequest) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = DispatchResult<SyntheticResponse>> + Send + 'static,
{
    type Future = Fut;

    fn call(&self, request: SyntheticRequest) -> Self::Future {
        (self)(request)
    }
}

/// Convert a handler into a boxed handler for storage
pub(crate) fn into_boxed<H: RouteHandler>(handler: H) -> BoxedRouteHandler {
    Arc::new(move |request| {
        let handler = handler.clone();
        Box::pin(async move { handler.call(request).await })
    })
}

/// One entry of the route table.
///
/// # Example
/// ```rust,ignore
/// let entry = RouteEntry::new("api/values/{id}", get_value)
///     .with_method(HttpMethod::Get)
///     .ignore_for_batch();
/// ```
#[derive(Clone)]
pub struct RouteEntry {
    template: String,
    methods: Vec<HttpMethod>,
    ignore_tag: bool,
    allow_tag: bool,
    policy: DispatchPolicy,
    handler: BoxedRouteHandler,
}

impl RouteEntry {
    /// Create an entry for the given path template and handler.
    ///
    /// With no declared method the route is treated as GET-only by the
    /// matcher.
    pub fn new<H: RouteHandler>(template: impl Into<String>, handler: H) -> Self {
        Self {
            template: template.into(),
            methods: Vec::new(),
            ignore_tag: false,
            allow_tag: false,
            policy: DispatchPolicy::Allowed,
            handler: into_boxed(handler),
        }
    }

    /// Declare an HTTP method for this route.
    #[must_use = "This method returns a new RouteEntry and does not modify self"]
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// Declare several HTTP methods for this route.
    #[must_use = "This method returns a new RouteEntry and does not modify self"]
    pub fn with_methods(mut self, methods: impl IntoIterator<Item = HttpMethod>) -> Self {
        self.methods.extend(methods);
        self
    }

    /// Mark this route as excluded from batch dispatch.
    #[must_use = "This method returns a new RouteEntry and does not modify self"]
    pub fn ignore_for_batch(mut self) -> Self {
        self.ignore_tag = true;
        self
    }

    /// Mark this route as explicitly allowed for batch dispatch.
    ///
    /// Overrides an exclusion inherited from the route's owning group.
    #[must_use = "This method returns a new RouteEntry and does not modify self"]
    pub fn allow_for_batch(mut self) -> Self {
        self.allow_tag = true;
        self
    }

    /// Resolve the effective policy from this entry's tags and its owning
    /// group. Called once at registration.
    pub(crate) fn resolve_policy(&mut self, group_excluded: bool) {
        let excluded = self.ignore_tag || group_excluded;
        self.policy = if excluded && !self.allow_tag {
            DispatchPolicy::Excluded
        } else {
            DispatchPolicy::Allowed
        };
    }

    /// Prefix the template with a group path. Called once at registration.
    pub(crate) fn apply_prefix(&mut self, prefix: &str) {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            return;
        }
        let suffix = self.template.trim_start_matches('/');
        self.template = if suffix.is_empty() {
            prefix.to_string()
        } else {
            format!("{}/{}", prefix, suffix)
        };
    }

    /// The route's path template text.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The route's declared methods; empty means GET-only.
    pub fn methods(&self) -> &[HttpMethod] {
        &self.methods
    }

    /// The resolved batch dispatch policy.
    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// Clone the boxed handler for invocation.
    pub(crate) fn handler(&self) -> BoxedRouteHandler {
        self.handler.clone()
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("template", &self.template)
            .field("methods", &self.methods)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
