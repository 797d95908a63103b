//! Validated newtype wrappers for configuration values.
//!
//! Each wrapper validates its contents on construction, so a built
//! [`ClientConfig`](crate::ClientConfig) never carries an empty credential.

use crate::error::ConfigError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A validated merchant id.
///
/// # Example
///
/// ```rust
/// use merchant_api::MerchantId;
///
/// let id = MerchantId::new("4711").unwrap();
/// assert_eq!(id.as_ref(), "4711");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MerchantId(String);

impl MerchantId {
    /// Creates a new validated merchant id. Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyMerchantId`] if the id is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ConfigError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(ConfigError::EmptyMerchantId);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for MerchantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MerchantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for MerchantId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MerchantId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(de::Error::custom)
    }
}

/// A validated login user name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    /// Creates a new validated user name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyUsername`] if the name is empty.
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigError::EmptyUsername);
        }
        Ok(Self(name))
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated login password.
///
/// # Security
///
/// The `Debug` implementation masks the value, displaying only
/// `Password(*****)`.
///
/// ```rust
/// use merchant_api::Password;
///
/// let password = Password::new("hunter2").unwrap();
/// assert_eq!(format!("{:?}", password), "Password(*****)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Creates a new validated password.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyPassword`] if the password is empty.
    pub fn new(password: impl Into<String>) -> Result<Self, ConfigError> {
        let password = password.into();
        if password.is_empty() {
            return Err(ConfigError::EmptyPassword);
        }
        Ok(Self(password))
    }
}

impl AsRef<str> for Password {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(*****)")
    }
}

/// A validated API host URL, e.g. `https://api.example.com`.
///
/// Trailing slashes are stripped so that [`join`](Self::join) never produces
/// a double slash.
///
/// # Example
///
/// ```rust
/// use merchant_api::HostUrl;
///
/// let url = HostUrl::new("https://api.example.com/").unwrap();
/// assert_eq!(url.scheme(), "https");
/// assert_eq!(url.host_name(), Some("api.example.com"));
/// assert_eq!(url.join("/v1/orders"), "https://api.example.com/v1/orders");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostUrl(String);

impl HostUrl {
    /// Creates a new validated host URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHostUrl`] if the URL has no scheme or host.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into().trim().trim_end_matches('/').to_string();

        let valid = url.split_once("://").is_some_and(|(scheme, rest)| {
            !scheme.is_empty()
                && scheme.chars().all(|c| c.is_ascii_alphabetic())
                && !host_part(rest).is_empty()
        });
        if !valid {
            return Err(ConfigError::InvalidHostUrl { url });
        }

        Ok(Self(url))
    }

    /// Returns the URL scheme, e.g. `https`.
    #[must_use]
    pub fn scheme(&self) -> &str {
        self.0.split_once("://").map_or("", |(scheme, _)| scheme)
    }

    /// Returns the host without port or path.
    #[must_use]
    pub fn host_name(&self) -> Option<&str> {
        let (_, rest) = self.0.split_once("://")?;
        let host = host_part(rest);
        (!host.is_empty()).then_some(host)
    }

    /// Resolves `path` against this host.
    ///
    /// Absolute URLs (anything containing `://`) are returned unchanged.
    #[must_use]
    pub fn join(&self, path: &str) -> String {
        if path.contains("://") {
            return path.to_string();
        }
        match path.trim_start_matches('/') {
            "" => self.0.clone(),
            relative => format!("{}/{relative}", self.0),
        }
    }
}

fn host_part(authority_and_path: &str) -> &str {
    authority_and_path
        .split([':', '/', '?', '#'])
        .next()
        .unwrap_or_default()
}

impl AsRef<str> for HostUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
