//! Credential store holding the current bearer token.
//!
//! The store keeps the login identity (merchant id, user, password, endpoint
//! URLs) fixed for its lifetime and the token state behind a lock. Every
//! mutation replaces the token, its type, its expiry and the derived
//! `Authorization` value together, so readers never see a mixed state.

use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::auth::login::TokenData;
use crate::auth::AuthError;
use crate::config::{ClientConfig, MerchantId, Password, Username};

/// Format of the `expires_on` field, e.g. `2099-01-01T00:00:00Z` (UTC).
pub const EXPIRY_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// The fixed login identity of a client.
#[derive(Clone, Debug)]
pub struct LoginIdentity {
    /// The merchant id.
    pub merchant_id: MerchantId,
    /// The login user.
    pub username: Username,
    /// The login password.
    pub password: Password,
    /// Absolute URL of the token endpoint.
    pub login_url: String,
    /// Absolute URL of the auth-test endpoint.
    pub auth_test_url: String,
}

#[derive(Clone, Default)]
struct TokenState {
    token: String,
    token_type: String,
    expires_at: Option<DateTime<Utc>>,
    auth_header_value: String,
}

/// Thread-safe holder of the current token.
///
/// # Example
///
/// ```rust
/// use merchant_api::{ClientConfig, CredentialStore, HostUrl, MerchantId, Password, Username};
///
/// let config = ClientConfig::builder()
///     .host(HostUrl::new("https://api.example.com").unwrap())
///     .merchant_id(MerchantId::new("4711").unwrap())
///     .username(Username::new("api-user").unwrap())
///     .password(Password::new("secret").unwrap())
///     .build()
///     .unwrap();
///
/// let store = CredentialStore::new(&config);
/// assert!(!store.is_authenticated());
///
/// store.set_authentication_data("abc", "Bearer", "2099-01-01T00:00:00Z").unwrap();
/// assert!(store.is_authenticated());
/// assert_eq!(store.authorization_header_value(), "Bearer abc");
/// ```
pub struct CredentialStore {
    identity: LoginIdentity,
    state: RwLock<TokenState>,
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("CredentialStore")
            .field("identity", &self.identity)
            .field("has_token", &!state.token.is_empty())
            .field("token_type", &state.token_type)
            .field("expires_at", &state.expires_at)
            .finish()
    }
}

impl CredentialStore {
    /// Creates an empty store for the configured identity.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            identity: LoginIdentity {
                merchant_id: config.merchant_id().clone(),
                username: config.username().clone(),
                password: config.password().clone(),
                login_url: config.login_url(),
                auth_test_url: config.auth_test_url(),
            },
            state: RwLock::new(TokenState::default()),
        }
    }

    /// Returns the fixed login identity.
    #[must_use]
    pub const fn identity(&self) -> &LoginIdentity {
        &self.identity
    }

    /// Returns `"<token_type> <token>"`, or an empty string without a token.
    #[must_use]
    pub fn authorization_header_value(&self) -> String {
        self.read().auth_header_value.clone()
    }

    /// Returns the current token type, empty without a token.
    #[must_use]
    pub fn token_type(&self) -> String {
        self.read().token_type.clone()
    }

    /// Returns the current expiry instant, if one is known.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.read().expires_at
    }

    /// Replaces the token, its type and its expiry.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentialsFormat`] if `token` or
    /// `token_type` is empty or `expires_at` does not match
    /// [`EXPIRY_FORMAT`]. The store is left untouched in that case.
    pub fn set_authentication_data(
        &self,
        token: &str,
        token_type: &str,
        expires_at: &str,
    ) -> Result<(), AuthError> {
        let expires_at = validate_token_fields(token, token_type, expires_at)?;

        *self.write() = TokenState {
            token: token.to_string(),
            token_type: token_type.to_string(),
            expires_at: Some(expires_at),
            auth_header_value: format!("{token_type} {token}"),
        };
        Ok(())
    }

    /// Applies the token data of a successful login.
    ///
    /// # Errors
    ///
    /// See [`set_authentication_data`](Self::set_authentication_data).
    pub fn apply_token_data(&self, data: &TokenData) -> Result<(), AuthError> {
        self.set_authentication_data(&data.token, &data.token_type, &data.expires_on)
    }

    /// Drops the token. Idempotent.
    pub fn clear_authentication_data(&self) {
        *self.write() = TokenState {
            expires_at: Some(Utc::now()),
            ..TokenState::default()
        };
    }

    /// Drops the token only if `rejected_header_value` is still the current
    /// `Authorization` value.
    ///
    /// Returns `true` if the token was dropped. A rejection reported for a
    /// token that has since been replaced leaves the fresh token alone.
    pub fn invalidate_token(&self, rejected_header_value: &str) -> bool {
        let mut state = self.write();
        if state.token.is_empty() || state.auth_header_value != rejected_header_value {
            return false;
        }
        *state = TokenState {
            expires_at: Some(Utc::now()),
            ..TokenState::default()
        };
        true
    }

    /// Returns `true` if a token is present and not yet expired.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.assert_authenticated().is_ok()
    }

    /// Checks that a usable token is present.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotAuthenticated`] if there is no token
    /// - [`AuthError::AuthExpired`] if the expiry has passed
    ///
    /// [`AuthError::AuthStateCorrupt`] is unreachable here: a token is only
    /// ever written together with `Some(expiry)`.
    pub fn assert_authenticated(&self) -> Result<(), AuthError> {
        let state = self.read();
        if state.token.is_empty() {
            return Err(AuthError::NotAuthenticated);
        }
        match state.expires_at {
            None => Err(AuthError::AuthStateCorrupt),
            Some(expired_at) if Utc::now() >= expired_at => {
                Err(AuthError::AuthExpired { expired_at })
            }
            Some(_) => Ok(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, TokenState> {
        // Writers replace the state in one assignment, so a poisoned lock
        // still guards a consistent value.
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TokenState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Checks token data before it is used, returning the parsed expiry.
pub(crate) fn validate_token_fields(
    token: &str,
    token_type: &str,
    expires_at: &str,
) -> Result<DateTime<Utc>, AuthError> {
    if token.is_empty() {
        return Err(AuthError::InvalidCredentialsFormat {
            reason: "token is empty".to_string(),
        });
    }
    if token_type.is_empty() {
        return Err(AuthError::InvalidCredentialsFormat {
            reason: "token type is empty".to_string(),
        });
    }
    parse_expiry(expires_at)
}

/// Parses an expiry in [`EXPIRY_FORMAT`] as UTC.
///
/// # Errors
///
/// Returns [`AuthError::InvalidCredentialsFormat`] if the text does not match.
pub fn parse_expiry(text: &str) -> Result<DateTime<Utc>, AuthError> {
    NaiveDateTime::parse_from_str(text.trim(), EXPIRY_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| AuthError::InvalidCredentialsFormat {
            reason: format!("unparsable expiry '{text}': {e}"),
        })
}

// Verify CredentialStore is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CredentialStore>();
};
