//! Configuration for batch dispatch.
//!
//! This module provides the [`BatchOptions`] struct consumed by the core.
//!
//! # Example
//! ```rust,ignore
//! use batch_request::BatchOptions;
//! use url::Url;
//!
//! let options = BatchOptions::new()
//!     .with_request_host(Url::parse("https://internal.example").unwrap())
//!     .with_default_protocol("InternalBatch")
//!     .with_endpoint_enabled(false);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// The default host used to compose synthetic request URIs.
///
/// The host is never dialed; it only feeds URI composition for handlers that
/// inspect scheme or host.
pub const DEFAULT_REQUEST_HOST: &str = "https://batchrequest";

/// The default protocol label stamped on synthetic requests.
pub const DEFAULT_PROTOCOL: &str = "BatchRequest";

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OptionsValidationError {
    /// request_host must use the http or https scheme
    UnsupportedHostScheme(String),
    /// request_host must carry a host component
    MissingHost,
    /// default_protocol must not be empty
    EmptyProtocolLabel,
}

impl fmt::Display for OptionsValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedHostScheme(scheme) => {
                write!(f, "request_host scheme '{}' is not http or https", scheme)
            }
            Self::MissingHost => {
                write!(f, "request_host must carry a host component")
            }
            Self::EmptyProtocolLabel => {
                write!(f, "default_protocol must not be empty")
            }
        }
    }
}

impl std::error::Error for OptionsValidationError {}

/// Options consumed by the batch dispatch core.
///
/// All fields have defaults that allow dispatch to function out of the box.
///
/// # Fields
///
/// * `request_host` - The virtual host synthetic request URIs are composed
///   against. Never dialed. Default: `https://batchrequest`.
/// * `default_protocol` - The protocol label stamped on synthetic requests.
///   Default: `BatchRequest`.
/// * `endpoint_enabled` - Whether the batch endpoint accepts calls at all.
///   When false the endpoint facade answers not-found. Default: true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOptions {
    /// The virtual host used for composing synthetic request URIs.
    pub request_host: Url,
    /// The protocol label stamped on synthetic requests.
    pub default_protocol: String,
    /// Whether the batch endpoint is administratively enabled.
    pub endpoint_enabled: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            request_host: Url::parse(DEFAULT_REQUEST_HOST)
                .expect("default request host is a valid URL"),
            default_protocol: DEFAULT_PROTOCOL.to_string(),
            endpoint_enabled: true,
        }
    }
}

impl BatchOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the virtual request host.
    #[must_use = "This method returns a new BatchOptions and does not modify self"]
    pub fn with_request_host(mut self, host: Url) -> Self {
        self.request_host = host;
        self
    }

    /// Set the protocol label.
    #[must_use = "This method returns a new BatchOptions and does not modify self"]
    pub fn with_default_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.default_protocol = protocol.into();
        self
    }

    /// Enable or disable the batch endpoint.
    #[must_use = "This method returns a new BatchOptions and does not modify self"]
    pub fn with_endpoint_enabled(mut self, enabled: bool) -> Self {
        self.endpoint_enabled = enabled;
        self
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<(), OptionsValidationError> {
        match self.request_host.scheme() {
            "http" | "https" => {}
            other => {
                return Err(OptionsValidationError::UnsupportedHostScheme(
                    other.to_string(),
                ));
            }
        }
        if self.request_host.host_str().is_none() {
            return Err(OptionsValidationError::MissingHost);
        }
        if self.default_protocol.is_empty() {
            return Err(OptionsValidationError::EmptyProtocolLabel);
        }
        Ok(())
    }
}
