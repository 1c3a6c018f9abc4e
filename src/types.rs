//! Wire types for batch dispatch
//!
//! These types form the serialized boundary of the batch endpoint: an array
//! of [`SubRequest`] descriptors in, an array of [`SubRequestResult`] values
//! out, same length and order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The HTTP verbs a sub-request may carry.
///
/// A descriptor whose method does not parse into one of these variants fails
/// the whole batch during dispatcher validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// DELETE
    Delete,
    /// GET
    Get,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
    /// PATCH
    Patch,
    /// POST
    Post,
    /// PUT
    Put,
}

impl HttpMethod {
    /// All supported verbs, in declaration order.
    pub const ALL: [HttpMethod; 7] = [
        Self::Delete,
        Self::Get,
        Self::Head,
        Self::Options,
        Self::Patch,
        Self::Post,
        Self::Put,
    ];

    /// Parse a method string case-insensitively.
    ///
    /// Returns `None` for anything that is not a supported verb.
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "DELETE" => Some(Self::Delete),
            "GET" => Some(Self::Get),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            "PATCH" => Some(Self::Patch),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            _ => None,
        }
    }

    /// The canonical upper-case representation of the verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Default method for descriptors that omit one.
fn default_method() -> String {
    HttpMethod::Get.as_str().to_string()
}

/// A single sub-request descriptor within a batch.
///
/// One descriptor addresses one existing route of the same server. Order is
/// significant: results come back in descriptor order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubRequest {
    /// The relative URI of the request (path plus optional `?query`).
    pub relative_uri: String,
    /// The HTTP method to execute for this URI. Defaults to GET.
    #[serde(default = "default_method")]
    pub method: String,
    /// The content type of the request body, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// The request body. Binary payloads are carried base64-encoded with
    /// [`SubRequest::base64_encoded`] set to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Whether [`SubRequest::body`] is base64 encoded.
    #[serde(default)]
    pub base64_encoded: bool,
}

impl SubRequest {
    /// Create a descriptor for the given method and relative URI.
    pub fn new(method: HttpMethod, relative_uri: impl Into<String>) -> Self {
        Self {
            relative_uri: relative_uri.into(),
            method: method.as_str().to_string(),
            content_type: None,
            body: None,
            base64_encoded: false,
        }
    }

    /// Shorthand for a GET descriptor.
    pub fn get(relative_uri: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, relative_uri)
    }

    /// Set the content type.
    #[must_use = "This method returns a new SubRequest and does not modify self"]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set a text body (UTF-8 bytes on the synthetic request).
    #[must_use = "This method returns a new SubRequest and does not modify self"]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.base64_encoded = false;
        self
    }

    /// Set a base64-encoded body (decoded bytes on the synthetic request).
    #[must_use = "This method returns a new SubRequest and does not modify self"]
    pub fn with_base64_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.base64_encoded = true;
        self
    }

    /// The path portion of the relative URI, before any query separator.
    pub fn path_part(&self) -> &str {
        match self.relative_uri.split_once('?') {
            Some((path, _)) => path,
            None => &self.relative_uri,
        }
    }

    /// The query portion of the relative URI after the first `?`, without
    /// the separator.
    pub fn query_part(&self) -> Option<&str> {
        self.relative_uri.split_once('?').map(|(_, query)| query)
    }
}

/// The synthesized outcome of one sub-request.
///
/// One result per input descriptor, in descriptor order. Unmatched and
/// policy-excluded descriptors produce a 404 result rather than being
/// omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubRequestResult {
    /// The status code of the synthesized response.
    pub status_code: u16,
    /// The content type of the synthesized response, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// The response body: text when a charset was declared, base64 otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Whether [`SubRequestResult::body`] is base64 encoded.
    pub base64_encoded: bool,
}
