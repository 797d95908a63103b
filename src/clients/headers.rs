//! Per-request header composition.

use std::collections::HashMap;

use crate::auth::CredentialStore;
use crate::clients::http_request::DataType;
use crate::config::ClientConfig;

/// `Authorization` header name.
pub const AUTHORIZATION: &str = "Authorization";
/// `Content-Type` header name.
pub const CONTENT_TYPE: &str = "Content-Type";
/// `Accept` header name.
pub const ACCEPT: &str = "Accept";
/// `Accept-Language` header name.
pub const ACCEPT_LANGUAGE: &str = "Accept-Language";

/// Composes request headers from configuration and the current credentials.
///
/// Headers are rebuilt for every attempt so that a retry after
/// reauthentication carries the fresh token.
#[derive(Clone, Debug)]
pub struct HeaderBuilder {
    accept: String,
    accept_language: String,
}

impl HeaderBuilder {
    /// Creates a builder using the configured `Accept` and `Accept-Language`.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            accept: config.accept().to_string(),
            accept_language: config.accept_language().to_string(),
        }
    }

    /// Headers for a call that must not present a token (the login call).
    #[must_use]
    pub fn unauthenticated(&self, data_type: DataType) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            CONTENT_TYPE.to_string(),
            data_type.as_content_type().to_string(),
        );
        headers.insert(ACCEPT.to_string(), self.accept.clone());
        headers.insert(ACCEPT_LANGUAGE.to_string(), self.accept_language.clone());
        headers
    }

    /// Headers for an authenticated call.
    ///
    /// `Authorization` is omitted while the store holds no token.
    #[must_use]
    pub fn authenticated(
        &self,
        store: &CredentialStore,
        data_type: DataType,
    ) -> HashMap<String, String> {
        let mut headers = self.unauthenticated(data_type);
        let authorization = store.authorization_header_value();
        if !authorization.is_empty() {
            headers.insert(AUTHORIZATION.to_string(), authorization);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HostUrl, MerchantId, Password, Username};

    fn config() -> ClientConfig {
        ClientConfig::builder()
            .host(HostUrl::new("https://api.example.com").unwrap())
            .merchant_id(MerchantId::new("1").unwrap())
            .username(Username::new("user").unwrap())
            .password(Password::new("pass").unwrap())
            .accept("application/hal+json")
            .accept_language("de-DE")
            .build()
            .unwrap()
    }

    #[test]
    fn test_unauthenticated_headers() {
        let builder = HeaderBuilder::new(&config());
        let headers = builder.unauthenticated(DataType::Json);

        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/hal+json");
        assert_eq!(headers.get(ACCEPT_LANGUAGE).unwrap(), "de-DE");
        assert!(!headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn test_authenticated_headers_carry_token() {
        let config = config();
        let store = CredentialStore::new(&config);
        let builder = HeaderBuilder::new(&config);

        let headers = builder.authenticated(&store, DataType::Json);
        assert!(!headers.contains_key(AUTHORIZATION));

        store
            .set_authentication_data("abc", "Bearer", "2099-01-01T00:00:00Z")
            .unwrap();
        let headers = builder.authenticated(&store, DataType::PlainText);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain");
    }
}
