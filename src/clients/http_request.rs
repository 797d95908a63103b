//! Request types for the merchant API pipeline.
//!
//! A [`PendingRequest`] is the fully resolved call the transport performs:
//! method, absolute URL, final headers and optional JSON body. It lives for
//! one executor invocation plus its retry.

use std::collections::HashMap;
use std::fmt;

/// HTTP methods supported by the merchant API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method for retrieving resources.
    Get,
    /// HTTP POST method for creating resources.
    Post,
    /// HTTP PUT method for replacing resources.
    Put,
    /// HTTP PATCH method for partial updates.
    Patch,
    /// HTTP DELETE method for removing resources.
    Delete,
}

impl HttpMethod {
    /// Returns the method name as sent on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content type for request bodies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    /// JSON content type (`application/json`).
    Json,
    /// Plain text content type (`text/plain`), used by the auth test.
    PlainText,
}

impl DataType {
    /// Returns the MIME type string for this data type.
    #[must_use]
    pub const fn as_content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::PlainText => "text/plain",
        }
    }
}

/// A fully resolved request, ready for the transport.
///
/// # Example
///
/// ```rust
/// use merchant_api::clients::{HttpMethod, PendingRequest};
/// use serde_json::json;
///
/// let request = PendingRequest::new(HttpMethod::Post, "https://api.example.com/v1/returns")
///     .with_header("Content-Type", "application/json")
///     .with_body(json!({"order_id": 1}));
///
/// assert_eq!(request.header("content-type"), Some("application/json"));
/// assert!(request.body.is_some());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PendingRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The absolute URL.
    pub url: String,
    /// Final request headers.
    pub headers: HashMap<String, String>,
    /// The JSON body, if any.
    pub body: Option<serde_json::Value>,
}

impl PendingRequest {
    /// Creates a request without headers or body.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Replaces all headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Adds a single header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<serde_json::Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Looks a header up by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
