//! Spotify API credentials.

use std::fmt;

use thiserror::Error;

pub const CLIENT_ID_VAR: &str = "SPOTIFY_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "SPOTIFY_CLIENT_SECRET";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {0} is empty")]
    Empty(&'static str),
}

/// Client-credentials pair, loaded once at startup and shared read-only.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    client_id: String,
    client_secret: String,
}

impl ApiCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Read both values from the process environment, honoring a `.env` file.
    pub fn from_env() -> Result<Self, CredentialsError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CredentialsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str| match lookup(key) {
            None => Err(CredentialsError::Missing(key)),
            Some(v) if v.trim().is_empty() => Err(CredentialsError::Empty(key)),
            Some(v) => Ok(v.trim().to_string()),
        };
        Ok(Self::new(read(CLIENT_ID_VAR)?, read(CLIENT_SECRET_VAR)?))
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}
