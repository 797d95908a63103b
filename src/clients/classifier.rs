//! Response classification.
//!
//! A response is a failure when its status is 4xx/5xx or when its body is a
//! JSON error envelope: an object with an `errors` array or an `error`
//! string. Failures are split into the classes of [`FailureClass`].

use serde_json::Value;

use crate::clients::errors::{BusinessError, FailureClass};
use crate::clients::http_response::RawResponse;

/// Decodes a JSON error envelope.
///
/// Returns the envelope's messages, or `None` if the body is not an error
/// envelope. Non-string items of an `errors` array are rendered as JSON.
///
/// # Example
///
/// ```rust
/// use merchant_api::clients::decode_error_envelope;
///
/// assert_eq!(
///     decode_error_envelope(br#"{"errors":["a","b"]}"#),
///     Some(vec!["a".to_string(), "b".to_string()])
/// );
/// assert_eq!(decode_error_envelope(br#"{"error":"bad"}"#), Some(vec!["bad".to_string()]));
/// assert_eq!(decode_error_envelope(br#"{"ok":true}"#), None);
/// ```
#[must_use]
pub fn decode_error_envelope(body: &[u8]) -> Option<Vec<String>> {
    let text = std::str::from_utf8(body).ok()?.trim_start();
    if !text.starts_with('{') {
        return None;
    }

    let value: Value = serde_json::from_str(text).ok()?;
    let object = value.as_object()?;

    if let Some(Value::Array(items)) = object.get("errors") {
        return Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(message) => message.clone(),
                    other => other.to_string(),
                })
                .collect(),
        );
    }

    if let Some(Value::String(message)) = object.get("error") {
        return Some(vec![message.clone()]);
    }

    None
}

/// Classifies a completed response.
///
/// # Errors
///
/// Returns the [`FailureClass`] of a failed response:
/// - 401 → [`FailureClass::AuthExpiredRetry`]
/// - 429 → [`FailureClass::RateLimitedRetry`]
/// - any other 4xx/5xx, or a 2xx/3xx carrying an error envelope →
///   [`FailureClass::Terminal`]
pub fn classify(response: &RawResponse) -> Result<(), FailureClass> {
    let envelope = decode_error_envelope(&response.body);
    let status = response.status;

    if status < 400 && envelope.is_none() {
        return Ok(());
    }

    let error = BusinessError {
        status,
        messages: envelope.unwrap_or_else(|| vec![status_line(status)]),
        raw_response: response.text().into_owned(),
    };

    Err(match status {
        401 => FailureClass::AuthExpiredRetry(error),
        429 => FailureClass::RateLimitedRetry(error),
        _ => FailureClass::Terminal(error),
    })
}

fn status_line(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .map_or_else(
            || format!("HTTP {status}"),
            |reason| format!("HTTP {status} {reason}"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_array_is_decoded_in_order() {
        assert_eq!(
            decode_error_envelope(br#"{"errors":["a","b"]}"#),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_single_error_string_is_decoded() {
        assert_eq!(
            decode_error_envelope(br#"  {"error":"bad"}"#),
            Some(vec!["bad".to_string()])
        );
    }

    #[test]
    fn test_other_shapes_are_not_envelopes() {
        assert_eq!(decode_error_envelope(br#"{"ok":true}"#), None);
        assert_eq!(decode_error_envelope(br#"["error"]"#), None);
        assert_eq!(decode_error_envelope(br#"{"error":{"code":1}}"#), None);
        assert_eq!(decode_error_envelope(br#"{"errors":"flat"}"#), None);
        assert_eq!(decode_error_envelope(b"<html>error</html>"), None);
        assert_eq!(decode_error_envelope(b"{not json"), None);
    }

    #[test]
    fn test_structured_error_items_are_rendered_as_json() {
        let messages = decode_error_envelope(br#"{"errors":[{"field":"sku"},"plain"]}"#).unwrap();
        assert_eq!(messages, vec![r#"{"field":"sku"}"#.to_string(), "plain".to_string()]);
    }

    #[test]
    fn test_success_without_envelope() {
        assert_eq!(classify(&RawResponse::new(200, r#"{"ok":true}"#)), Ok(()));
        assert_eq!(classify(&RawResponse::new(204, "")), Ok(()));
    }

    #[test]
    fn test_status_401_is_auth_expired() {
        let result = classify(&RawResponse::new(401, r#"{"error":"token expired"}"#));
        match result {
            Err(FailureClass::AuthExpiredRetry(e)) => {
                assert_eq!(e.status, 401);
                assert_eq!(e.messages, vec!["token expired".to_string()]);
            }
            other => panic!("Expected AuthExpiredRetry, got {other:?}"),
        }
    }

    #[test]
    fn test_status_429_is_rate_limited() {
        let result = classify(&RawResponse::new(429, ""));
        match result {
            Err(FailureClass::RateLimitedRetry(e)) => {
                assert_eq!(e.messages, vec!["HTTP 429 Too Many Requests".to_string()]);
            }
            other => panic!("Expected RateLimitedRetry, got {other:?}"),
        }
    }

    #[test]
    fn test_other_errors_are_terminal() {
        let result = classify(&RawResponse::new(500, "oops"));
        match result {
            Err(FailureClass::Terminal(e)) => {
                assert_eq!(e.status, 500);
                assert_eq!(e.raw_response, "oops");
            }
            other => panic!("Expected Terminal, got {other:?}"),
        }
    }

    #[test]
    fn test_envelope_in_success_status_is_terminal() {
        let result = classify(&RawResponse::new(200, r#"{"errors":["sku unknown"]}"#));
        assert!(matches!(result, Err(FailureClass::Terminal(ref e)) if e.status == 200));
    }
}
