//! The router collaborator and the in-crate route table.
//!
//! The dispatcher only ever talks to the [`Router`] trait: an ordered route
//! table snapshot plus handler invocation against a synthetic context. The
//! hosting server's own routing machinery can implement it directly;
//! [`RouteTable`] is the in-crate implementation used by the endpoint facade
//! and the test suite.

use crate::{
    context::{SyntheticRequest, SyntheticResponse},
    error::DispatchResult,
    route::RouteEntry,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::trace;

/// Collaborator interface required from the hosting server's router.
///
/// `route_table` returns an ordered snapshot; the dispatcher treats it as
/// read-only for the duration of one batch. `invoke` executes the handler
/// pipeline for one matched route against one synthetic request and resolves
/// with the populated response; the implementation is the sole writer of the
/// response side.
pub trait Router: Send + Sync {
    /// Snapshot the route table in registration order.
    fn route_table(&self) -> Vec<Arc<RouteEntry>>;

    /// Invoke the route's handler pipeline with the given request.
    ///
    /// The returned future must be `'static` so the dispatcher can run it as
    /// an independent task.
    fn invoke(
        &self,
        route: Arc<RouteEntry>,
        request: SyntheticRequest,
    ) -> Pin<Box<dyn Future<Output = DispatchResult<SyntheticResponse>> + Send + 'static>>;
}

/// A group of routes registered under a shared path prefix.
///
/// Exclusion marked on the group is inherited by every contained route; a
/// route-level allow marker overrides it.
///
/// # Example
/// ```rust,ignore
/// let table = RouteTable::new().group(
///     RouteGroup::new("admin")
///         .ignore_for_batch()
///         .route(RouteEntry::new("status", status_handler).allow_for_batch())
///         .route(RouteEntry::new("users/{id}", user_handler)),
/// );
/// ```
#[derive(Debug)]
pub struct RouteGroup {
    prefix: String,
    excluded: bool,
    routes: Vec<RouteEntry>,
}

impl RouteGroup {
    /// Create a group with the given path prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            excluded: false,
            routes: Vec::new(),
        }
    }

    /// Exclude every route in this group from batch dispatch.
    #[must_use = "This method returns a new RouteGroup and does not modify self"]
    pub fn ignore_for_batch(mut self) -> Self {
        self.excluded = true;
        self
    }

    /// Add a route to the group.
    #[must_use = "This method returns a new RouteGroup and does not modify self"]
    pub fn route(mut self, entry: RouteEntry) -> Self {
        self.routes.push(entry);
        self
    }
}

/// An ordered route table with builder-style registration.
///
/// Policy and template prefixes are resolved once at registration, so
/// matching never re-derives them.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<RouteEntry>>,
}

impl RouteTable {
    /// Create an empty route table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single route.
    #[must_use = "This method returns a new RouteTable and does not modify self"]
    pub fn route(mut self, mut entry: RouteEntry) -> Self {
        entry.resolve_policy(false);
        trace!(
            template = %entry.template(),
            policy = ?entry.policy(),
            "Route registered"
        );
        self.routes.push(Arc::new(entry));
        self
    }

    /// Register a group of routes under its prefix.
    #[must_use = "This method returns a new RouteTable and does not modify self"]
    pub fn group(mut self, group: RouteGroup) -> Self {
        for mut entry in group.routes {
            entry.apply_prefix(&group.prefix);
            entry.resolve_policy(group.excluded);
            trace!(
                template = %entry.template(),
                policy = ?entry.policy(),
                "Route registered"
            );
            self.routes.push(Arc::new(entry));
        }
        self
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Router for RouteTable {
    fn route_table(&self) -> Vec<Arc<RouteEntry>> {
        self.routes.clone()
    }

    fn invoke(
        &self,
        route: Arc<RouteEntry>,
        request: SyntheticRequest,
    ) -> Pin<Box<dyn Future<Output = DispatchResult<SyntheticResponse>> + Send + 'static>> {
        let handler = route.handler();
        Box::pin(async move { handler(request).await })
    }
}
