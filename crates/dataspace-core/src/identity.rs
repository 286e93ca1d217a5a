//! Instance identity.
//!
//! Identity format: `host/token`
//!
//! - `host` names the dataspace the instance registers into (e.g. `ds1.pisys.eu`)
//! - `token` is a lowercase human-readable name picked once per process

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The address of one running instance inside a dataspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceIdentity {
    host: String,
    token: String,
}

impl InstanceIdentity {
    /// Build an identity from a dataspace host and a generated token.
    ///
    /// The token is lowercased; the host is kept as given.
    pub fn new(host: impl Into<String>, token: impl AsRef<str>) -> Result<Self, IdentityError> {
        let host = host.into();
        if host.is_empty() {
            return Err(IdentityError::EmptyHost);
        }
        if host.contains('/') {
            return Err(IdentityError::InvalidHost(host));
        }

        let token = token.as_ref().to_lowercase();
        if token.is_empty() {
            return Err(IdentityError::EmptyToken);
        }

        Ok(Self { host, token })
    }

    /// The dataspace host (e.g., "ds1.pisys.eu").
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The lowercase instance token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The full `host/token` URI sent in `register`.
    pub fn as_uri(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for InstanceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.host, self.token)
    }
}

impl FromStr for InstanceIdentity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, token) = s
            .split_once('/')
            .ok_or_else(|| IdentityError::MissingSlash(s.to_string()))?;

        Self::new(host, token)
    }
}

impl TryFrom<String> for InstanceIdentity {
    type Error = IdentityError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<InstanceIdentity> for String {
    fn from(id: InstanceIdentity) -> Self {
        id.to_string()
    }
}

/// Error building or parsing an instance identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("identity must contain '/' separator, got: {0}")]
    MissingSlash(String),
    #[error("dataspace host cannot be empty")]
    EmptyHost,
    #[error("dataspace host cannot contain '/': {0}")]
    InvalidHost(String),
    #[error("instance token cannot be empty")]
    EmptyToken,
}
