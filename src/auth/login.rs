//! Wire types of the login exchange.

use serde::{Deserialize, Serialize};

use crate::auth::AuthError;

/// Request body posted to the token endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub(crate) user: &'a str,
    pub(crate) pass: &'a str,
}

/// Response body of the token endpoint.
///
/// All fields are optional on the wire so that a missing one can be reported
/// by name; use [`LoginResponse::into_token_data`] to validate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    /// The bearer token.
    pub id_token: Option<String>,
    /// The token type, usually `Bearer`.
    pub token_type: Option<String>,
    /// Expiry instant, `yyyy-MM-dd'T'HH:mm:ss'Z'`.
    pub expires_on: Option<String>,
}

/// Token data extracted from a complete [`LoginResponse`].
#[derive(Clone, PartialEq, Eq)]
pub struct TokenData {
    /// The bearer token.
    pub token: String,
    /// The token type.
    pub token_type: String,
    /// Unparsed expiry text.
    pub expires_on: String,
}

impl std::fmt::Debug for TokenData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenData")
            .field("token", &"*****")
            .field("token_type", &self.token_type)
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

impl TokenData {
    /// Returns the `Authorization` value this token would produce.
    #[must_use]
    pub fn authorization_header_value(&self) -> String {
        format!("{} {}", self.token_type, self.token)
    }
}

impl LoginResponse {
    /// Decodes a login response body.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedLoginResponse`] if the body is not a JSON
    /// object.
    pub fn from_body(body: &[u8]) -> Result<Self, AuthError> {
        serde_json::from_slice(body).map_err(|e| AuthError::MalformedLoginResponse {
            reason: format!("body is not a JSON object: {e}"),
        })
    }

    /// Requires all three fields to be present.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedLoginResponse`] naming the first missing
    /// field.
    pub fn into_token_data(self) -> Result<TokenData, AuthError> {
        let missing = |field: &str| AuthError::MalformedLoginResponse {
            reason: format!("missing field '{field}'"),
        };
        Ok(TokenData {
            token: self.id_token.ok_or_else(|| missing("id_token"))?,
            token_type: self.token_type.ok_or_else(|| missing("token_type"))?,
            expires_on: self.expires_on.ok_or_else(|| missing("expires_on"))?,
        })
    }
}
