//! Framework-agnostic batch endpoint facade.
//!
//! The hosting server mounts this wherever it exposes the batch route
//! (conventionally `POST /api/batch`) and maps [`EndpointReply`] onto its own
//! response type. JSON (de)serialization of the wire arrays is the host's
//! concern; the facade only decides between the three endpoint outcomes.

use crate::{
    context::Principal,
    dispatcher::BatchDispatcher,
    types::{SubRequest, SubRequestResult},
};
use tracing::debug;

/// Outcome of one batch endpoint call.
#[derive(Debug)]
pub enum EndpointReply {
    /// Dispatch succeeded: the ordered result list, one per descriptor.
    Ok(Vec<SubRequestResult>),
    /// Structural validation failed: no results at all.
    BadRequest,
    /// The endpoint is administratively disabled.
    Disabled,
}

impl EndpointReply {
    /// The HTTP status code the host should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Ok(_) => 200,
            Self::BadRequest => 400,
            Self::Disabled => 404,
        }
    }
}

/// The batch endpoint: an enablement gate in front of the dispatcher.
pub struct BatchEndpoint {
    dispatcher: BatchDispatcher,
}

impl BatchEndpoint {
    /// Create an endpoint around the given dispatcher.
    pub fn new(dispatcher: BatchDispatcher) -> Self {
        Self { dispatcher }
    }

    /// The dispatcher behind this endpoint.
    pub fn dispatcher(&self) -> &BatchDispatcher {
        &self.dispatcher
    }

    /// Handle one batch call.
    ///
    /// Answers `Disabled` when the endpoint is switched off in options,
    /// `BadRequest` when dispatch fails structural validation, and `Ok` with
    /// the ordered results otherwise.
    pub async fn handle(
        &self,
        descriptors: Vec<SubRequest>,
        principal: Option<&Principal>,
    ) -> EndpointReply {
        if !self.dispatcher.options().endpoint_enabled {
            debug!("Batch endpoint is disabled; answering not found");
            return EndpointReply::Disabled;
        }

        match self.dispatcher.run(&descriptors, principal).await {
            Ok(results) => EndpointReply::Ok(results),
            Err(error) => {
                debug!(error = %error, "Batch call rejected");
                EndpointReply::BadRequest
            }
        }
    }
}
