//! Result extraction from completed synthetic responses.
//!
//! Converts one completed [`SyntheticResponse`] into a wire-safe
//! [`SubRequestResult`]. Sub-responses may be arbitrary binary or text, so
//! the body is transported as text only when the response declared a charset;
//! base64 is the safe fallback for everything else.

use crate::{context::SyntheticResponse, types::SubRequestResult};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::trace;

const CONTENT_TYPE_SEPARATOR: char = ';';
const CHARSET_MARKER: &str = "charset=";

/// Convert a completed response into a result slot.
///
/// Rules:
/// - no body bytes or no content type: body is absent;
/// - a `charset=X` parameter in the content type: decode the buffered bytes
///   with that encoding, `base64_encoded = false`;
/// - body present but no recognized charset: base64-encode the raw bytes,
///   `base64_encoded = true`.
///
/// Status code and content type are copied verbatim.
pub fn extract_result(response: &SyntheticResponse) -> SubRequestResult {
    let mut body = None;
    let mut base64_encoded = false;

    if !response.body().is_empty() {
        if let Some(content_type) = response.content_type() {
            match charset_of(content_type).and_then(|label| {
                encoding_rs::Encoding::for_label(label.as_bytes())
            }) {
                Some(encoding) => {
                    let (text, _, _) = encoding.decode(response.body());
                    body = Some(text.into_owned());
                }
                None => {
                    body = Some(BASE64.encode(response.body()));
                    base64_encoded = true;
                }
            }
        }
    }

    trace!(
        status_code = response.status_code(),
        content_type = ?response.content_type(),
        base64_encoded,
        "Extracted sub-request result"
    );

    SubRequestResult {
        status_code: response.status_code(),
        content_type: response.content_type().map(str::to_string),
        body,
        base64_encoded,
    }
}

/// The charset parameter of a content type, if one is declared.
///
/// Parameter lookup is case-insensitive and tolerates whitespace around the
/// separator.
pub(crate) fn charset_of(content_type: &str) -> Option<&str> {
    content_type
        .split(CONTENT_TYPE_SEPARATOR)
        .map(str::trim)
        .find_map(|component| {
            let lowered = component.to_ascii_lowercase();
            lowered
                .starts_with(CHARSET_MARKER)
                .then(|| component[CHARSET_MARKER.len()..].trim())
        })
        .filter(|charset| !charset.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_of() {
        assert_eq!(charset_of("text/plain; charset=utf-8"), Some("utf-8"));
        assert_eq!(charset_of("text/plain;charset=utf-8"), Some("utf-8"));
        assert_eq!(charset_of("text/plain; Charset=UTF-8"), Some("UTF-8"));
        assert_eq!(charset_of("application/octet-stream"), None);
        assert_eq!(charset_of("text/plain; charset="), None);
        assert_eq!(charset_of(""), None);
    }

    #[test]
    fn test_text_body_with_charset_is_decoded() {
        let response = SyntheticResponse::text(200, "text/plain; charset=utf-8", "hello");
        let result = extract_result(&response);

        assert_eq!(result.status_code, 200);
        assert_eq!(result.content_type.as_deref(), Some("text/plain; charset=utf-8"));
        assert_eq!(result.body.as_deref(), Some("hello"));
        assert!(!result.base64_encoded);
    }

    #[test]
    fn test_body_without_charset_is_base64() {
        let mut response = SyntheticResponse::new();
        response.set_content_type("application/octet-stream");
        response.write(&[0x00, 0x01, 0xFE, 0xFF]);

        let result = extract_result(&response);
        assert_eq!(result.body.as_deref(), Some("AAH+/w=="));
        assert!(result.base64_encoded);
    }

    #[test]
    fn test_empty_body_yields_absent_body() {
        let mut response = SyntheticResponse::new();
        response.set_content_type("text/plain; charset=utf-8");

        let result = extract_result(&response);
        assert!(result.body.is_none());
        assert!(!result.base64_encoded);
    }

    #[test]
    fn test_body_without_content_type_yields_absent_body() {
        let mut response = SyntheticResponse::new();
        response.write(b"orphan bytes");

        let result = extract_result(&response);
        assert!(result.body.is_none());
        assert!(!result.base64_encoded);
        assert!(result.content_type.is_none());
    }

    #[test]
    fn test_unknown_charset_falls_back_to_base64() {
        let response = SyntheticResponse::text(200, "text/plain; charset=klingon", "hello");
        let result = extract_result(&response);

        assert_eq!(result.body.as_deref(), Some(BASE64.encode(b"hello").as_str()));
        assert!(result.base64_encoded);
    }

    #[test]
    fn test_non_utf8_charset_is_decoded() {
        // 0xE9 is 'é' in latin-1.
        let mut response = SyntheticResponse::new();
        response.set_content_type("text/plain; charset=iso-8859-1");
        response.write(&[0x63, 0x61, 0x66, 0xE9]);

        let result = extract_result(&response);
        assert_eq!(result.body.as_deref(), Some("café"));
        assert!(!result.base64_encoded);
    }

    #[test]
    fn test_status_and_content_type_copied_verbatim() {
        let response = SyntheticResponse::text(418, "text/plain; charset=utf-8", "teapot");
        let result = extract_result(&response);
        assert_eq!(result.status_code, 418);
        assert_eq!(result.content_type.as_deref(), Some("text/plain; charset=utf-8"));
    }
}
