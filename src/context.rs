//! Synthetic request/response contexts.
//!
//! A [`SyntheticRequest`] emulates a real inbound HTTP request without a
//! network round-trip. It is built once per matched descriptor by
//! [`build_request`] and immutable afterwards. The response side lives in a
//! separate [`SyntheticResponse`] written only by the router that invokes the
//! handler; the split makes the ownership transfer between the two sides
//! explicit.

use crate::{
    config::BatchOptions,
    error::{BatchError, DispatchResult},
    matcher::RouteParams,
    route::RouteEntry,
    types::{HttpMethod, SubRequest},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// An authenticated principal carried over from the outer request.
///
/// Sub-requests share the outer call's identity; there is no per-slot
/// authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// The principal's name.
    pub name: String,
    /// Roles granted to the principal.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Principal {
    /// Create a principal with the given name and no roles.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
        }
    }

    /// Attach roles to the principal.
    #[must_use = "This method returns a new Principal and does not modify self"]
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = String>) -> Self {
        self.roles.extend(roles);
        self
    }
}

/// The request side of a synthetic context, immutable once built.
///
/// Construction goes through [`build_request`]; handlers only ever read.
#[derive(Debug, Clone)]
pub struct SyntheticRequest {
    method: HttpMethod,
    scheme: String,
    host: String,
    path: String,
    query: String,
    content_type: Option<String>,
    protocol: String,
    body: Vec<u8>,
    template: String,
    params: RouteParams,
    principal: Option<Principal>,
}

impl SyntheticRequest {
    /// The request method.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The URI scheme ("http" or "https").
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Whether the composed URI uses https.
    pub fn is_https(&self) -> bool {
        self.scheme == "https"
    }

    /// The host (and port, when non-default) of the composed URI.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The absolute path of the request.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query string, without the leading `?`. Empty when absent.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The query string parsed into decoded key/value pairs.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// The declared content type of the request body, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The protocol label from configuration.
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// The request body bytes. Empty when the descriptor carried no body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The template of the route this request was matched against.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// All route parameters extracted by the matcher.
    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    /// One route parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// The principal carried over from the outer request, if any.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// The absolute URI of the request, for logging and handlers that
    /// inspect it.
    pub fn uri(&self) -> String {
        if self.query.is_empty() {
            format!("{}://{}{}", self.scheme, self.host, self.path)
        } else {
            format!("{}://{}{}?{}", self.scheme, self.host, self.path, self.query)
        }
    }
}

/// The response side of a synthetic context.
///
/// The router invoking the handler is the sole writer; the dispatcher reads
/// it back through the result extractor once the invocation completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticResponse {
    status_code: u16,
    content_type: Option<String>,
    body: Vec<u8>,
}

impl SyntheticResponse {
    /// An empty 200 response with a writable body buffer.
    pub fn new() -> Self {
        Self {
            status_code: 200,
            content_type: None,
            body: Vec::new(),
        }
    }

    /// The synthetic 404 used for unmatched and policy-excluded slots.
    pub fn not_found() -> Self {
        Self {
            status_code: 404,
            content_type: None,
            body: Vec::new(),
        }
    }

    /// The standardized 500 placeholder for faulted or cancelled
    /// invocations.
    pub fn internal_error() -> Self {
        Self {
            status_code: 500,
            content_type: None,
            body: Vec::new(),
        }
    }

    /// A text response with the given status, content type, and body.
    pub fn text(status_code: u16, content_type: impl Into<String>, body: impl AsRef<str>) -> Self {
        Self {
            status_code,
            content_type: Some(content_type.into()),
            body: body.as_ref().as_bytes().to_vec(),
        }
    }

    /// A JSON response serialized from the given value.
    pub fn json(status_code: u16, value: &impl Serialize) -> DispatchResult<Self> {
        let body = serde_json::to_vec(value)
            .map_err(|e| BatchError::internal("Failed to serialize response body").with_cause(e.to_string()))?;
        Ok(Self {
            status_code,
            content_type: Some("application/json; charset=utf-8".to_string()),
            body,
        })
    }

    /// Set the status code.
    pub fn set_status(&mut self, status_code: u16) {
        self.status_code = status_code;
    }

    /// Set the content type.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = Some(content_type.into());
    }

    /// Append bytes to the body buffer.
    pub fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    /// The response status code.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// The response content type, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The buffered response body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl Default for SyntheticResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the synthetic request for one matched descriptor.
///
/// Composes the absolute URI from the configured virtual host plus the
/// descriptor's path and query, decodes the body, and carries over the
/// ambient principal. A body declared as base64 that fails to decode yields
/// [`BatchError::invalid_base64`], which the dispatcher escalates to a
/// whole-batch validation failure.
pub fn build_request(
    route: &RouteEntry,
    descriptor: &SubRequest,
    params: RouteParams,
    options: &BatchOptions,
    principal: Option<&Principal>,
) -> DispatchResult<SyntheticRequest> {
    let method = HttpMethod::parse(&descriptor.method)
        .ok_or_else(|| BatchError::unknown_method(&descriptor.method))?;

    let mut uri = options.request_host.clone();
    uri.set_path(descriptor.path_part());
    uri.set_query(descriptor.query_part().filter(|q| !q.is_empty()));

    let host = match (uri.host_str(), uri.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };

    let body = match descriptor.body.as_deref() {
        Some(text) if descriptor.base64_encoded => BASE64
            .decode(text)
            .map_err(|_| BatchError::invalid_base64(text))?,
        Some(text) => text.as_bytes().to_vec(),
        None => Vec::new(),
    };

    trace!(
        method = %method,
        path = %uri.path(),
        template = %route.template(),
        body_len = body.len(),
        "Built synthetic request"
    );

    Ok(SyntheticRequest {
        method,
        scheme: uri.scheme().to_string(),
        host,
        path: uri.path().to_string(),
        query: uri.query().unwrap_or_default().to_string(),
        content_type: descriptor.content_type.clone(),
        protocol: options.default_protocol.clone(),
        body,
        template: route.template().to_string(),
        params,
        principal: principal.cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteEntry;
    use std::collections::HashMap;

    async fn noop_handler(_request: SyntheticRequest) -> DispatchResult<SyntheticResponse> {
        Ok(SyntheticResponse::new())
    }

    fn request_for(descriptor: &SubRequest) -> DispatchResult<SyntheticRequest> {
        let route = RouteEntry::new("api/values/{id}", noop_handler);
        build_request(
            &route,
            descriptor,
            HashMap::new(),
            &BatchOptions::default(),
            None,
        )
    }

    #[test]
    fn test_uri_composition_splits_path_and_query() {
        let descriptor = SubRequest::get("/api/values/5?page=2&limit=10");
        let request = request_for(&descriptor).unwrap();

        assert_eq!(request.scheme(), "https");
        assert!(request.is_https());
        assert_eq!(request.host(), "batchrequest");
        assert_eq!(request.path(), "/api/values/5");
        assert_eq!(request.query(), "page=2&limit=10");
        assert_eq!(
            request.query_pairs(),
            vec![
                ("page".to_string(), "2".to_string()),
                ("limit".to_string(), "10".to_string())
            ]
        );
        assert_eq!(request.uri(), "https://batchrequest/api/values/5?page=2&limit=10");
    }

    #[test]
    fn test_method_is_upper_cased() {
        let mut descriptor = SubRequest::get("/api/values/5");
        descriptor.method = "post".to_string();
        let request = request_for(&descriptor).unwrap();
        assert_eq!(request.method(), HttpMethod::Post);
        assert_eq!(request.method().as_str(), "POST");
    }

    #[test]
    fn test_text_body_is_utf8_bytes() {
        let descriptor = SubRequest::get("/api/values/5").with_body("hällo");
        let request = request_for(&descriptor).unwrap();
        assert_eq!(request.body(), "hällo".as_bytes());
    }

    #[test]
    fn test_base64_body_is_decoded() {
        let descriptor = SubRequest::get("/api/values/5").with_base64_body("aGVsbG8=");
        let request = request_for(&descriptor).unwrap();
        assert_eq!(request.body(), b"hello");
    }

    #[test]
    fn test_invalid_base64_is_distinguished() {
        let descriptor = SubRequest::get("/api/values/5").with_base64_body("not-base64!!");
        let error = request_for(&descriptor).unwrap_err();
        assert_eq!(error.code, crate::BatchErrorCode::InvalidBase64);
        assert_eq!(error.details.unwrap()["body"], "not-base64!!");
    }

    #[test]
    fn test_principal_carry_over() {
        let descriptor = SubRequest::get("/api/values/5");
        let route = RouteEntry::new("api/values/{id}", noop_handler);
        let principal = Principal::new("alice").with_roles(["admin".to_string()]);

        let request = build_request(
            &route,
            &descriptor,
            HashMap::new(),
            &BatchOptions::default(),
            Some(&principal),
        )
        .unwrap();

        assert_eq!(request.principal(), Some(&principal));

        let anonymous = request_for(&descriptor).unwrap();
        assert!(anonymous.principal().is_none());
    }

    #[test]
    fn test_protocol_label_from_options() {
        let descriptor = SubRequest::get("/api/values/5");
        let request = request_for(&descriptor).unwrap();
        assert_eq!(request.protocol(), "BatchRequest");
    }

    #[test]
    fn test_response_writer_accumulates() {
        let mut response = SyntheticResponse::new();
        assert_eq!(response.status_code(), 200);
        response.set_status(201);
        response.set_content_type("text/plain; charset=utf-8");
        response.write(b"hel");
        response.write(b"lo");

        assert_eq!(response.status_code(), 201);
        assert_eq!(response.content_type(), Some("text/plain; charset=utf-8"));
        assert_eq!(response.body(), b"hello");
    }

    #[test]
    fn test_json_response_sets_content_type() {
        let response = SyntheticResponse::json(200, &serde_json::json!({"id": 1})).unwrap();
        assert_eq!(
            response.content_type(),
            Some("application/json; charset=utf-8")
        );
        assert_eq!(response.body(), br#"{"id":1}"#);
    }
}
