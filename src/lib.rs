#![warn(missing_docs)]
//! # Batch Request Dispatch
//!
//! In-process batch dispatch for HTTP-style services: one call carries many
//! logical sub-requests, each addressed to an existing route of the same
//! server, and comes back with one synthesized response per sub-request.
//!
//! There is no socket round-trip anywhere. Each sub-request is matched
//! against the live route table, materialized as a synthetic request
//! context, pushed through the same handler pipeline a direct call would
//! use, and read back into a wire-safe result.
//!
//! ## Architecture
//!
//! ```text
//! descriptors ──► BatchDispatcher
//!                     │ 1. validate methods (fail-closed)
//!                     │ 2. per descriptor, in order
//!                     ▼
//!                RouteMatcher ──── TemplateCache (concurrent, memoized)
//!                     │ Matched { route, params } / Ignored / NoMatch
//!                     ▼
//!                build_request ──► SyntheticRequest
//!                     │
//!                     ▼
//!                Router::invoke (fan-out, join barrier)
//!                     │ InvocationOutcome
//!                     ▼
//!                extract_result ──► SubRequestResult (ordered)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use batch_request::prelude::*;
//! use std::sync::Arc;
//!
//! async fn get_value(request: SyntheticRequest) -> DispatchResult<SyntheticResponse> {
//!     let id = request.param("id").unwrap_or("0");
//!     SyntheticResponse::json(200, &serde_json::json!({ "id": id }))
//! }
//!
//! let table = RouteTable::new()
//!     .route(RouteEntry::new("api/values/{id}", get_value).with_method(HttpMethod::Get))
//!     .group(
//!         RouteGroup::new("admin")
//!             .ignore_for_batch()
//!             .route(RouteEntry::new("health", health_handler).allow_for_batch()),
//!     );
//!
//! let endpoint = BatchEndpoint::new(BatchDispatcher::new(
//!     Arc::new(table),
//!     BatchOptions::default(),
//! ));
//!
//! let reply = endpoint
//!     .handle(vec![SubRequest::get("/api/values/5")], None)
//!     .await;
//! ```
//!
//! ## Error Handling
//!
//! Structural problems (an unknown HTTP verb, or a body declared as base64
//! that does not decode) fail the whole batch with no results. Everything
//! else is absorbed per slot: route misses and policy exclusions become 404
//! results, handler faults become 500 placeholders, and the result list
//! always has exactly one entry per descriptor, in descriptor order.
//!
//! ## Configuration
//!
//! ```rust,ignore
//! use batch_request::BatchOptions;
//! use url::Url;
//!
//! let options = BatchOptions::new()
//!     .with_request_host(Url::parse("https://internal.example")?)
//!     .with_default_protocol("InternalBatch")
//!     .with_endpoint_enabled(true);
//! ```

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod matcher;
pub mod route;
pub mod router;
pub mod types;

pub use config::{BatchOptions, DEFAULT_PROTOCOL, DEFAULT_REQUEST_HOST, OptionsValidationError};
pub use context::{Principal, SyntheticRequest, SyntheticResponse, build_request};
pub use dispatcher::{BatchDispatcher, InvocationOutcome};
pub use endpoint::{BatchEndpoint, EndpointReply};
pub use error::{BatchError, BatchErrorCode, DispatchResult};
pub use extractor::extract_result;
pub use matcher::{MatchOutcome, PathTemplate, RouteMatcher, RouteParams, TemplateCache};
pub use route::{DispatchPolicy, RouteEntry, RouteHandler};
pub use router::{RouteGroup, RouteTable, Router};
pub use types::{HttpMethod, SubRequest, SubRequestResult};

/// Commonly used types, re-exported for one-line imports.
pub mod prelude {
    pub use crate::{
        BatchDispatcher,
        BatchEndpoint,
        BatchError,
        BatchErrorCode,
        BatchOptions,
        DispatchPolicy,
        DispatchResult,
        EndpointReply,
        HttpMethod,
        InvocationOutcome,
        MatchOutcome,
        Principal,
        RouteEntry,
        RouteGroup,
        RouteHandler,
        RouteMatcher,
        RouteTable,
        Router,
        SubRequest,
        SubRequestResult,
        SyntheticRequest,
        SyntheticResponse,
        TemplateCache,
    };
}
