//! Token verification against a configured key list.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Identity, IdentityToken, Result};

/// Verifies identity tokens.
///
/// Implementations must not retry or fall back: a missing or unrecognized
/// token is a hard failure for the call.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: Option<&IdentityToken>) -> Result<Identity>;
}

/// Named API keys loaded from TOML.
///
/// ```toml
/// [keys]
/// host = "secret-1"
/// ci = "secret-2"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyList {
    /// Key name (reported as the identity subject) to secret.
    #[serde(default)]
    pub keys: BTreeMap<String, String>,
}

impl KeyList {
    /// Load a key list from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse a key list from a TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Add a key, replacing any existing key with the same name.
    pub fn with_key(mut self, name: impl Into<String>, secret: impl Into<String>) -> Self {
        self.keys.insert(name.into(), secret.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Authenticator for KeyList {
    fn authenticate(&self, token: Option<&IdentityToken>) -> Result<Identity> {
        let token = token.ok_or(Error::Missing)?;

        let subject = self
            .keys
            .iter()
            .find(|(_, secret)| secret.as_str() == token.as_str())
            .map(|(name, _)| name.clone())
            .ok_or(Error::Invalid)?;

        debug!(%subject, "identity verified");
        Ok(Identity { subject })
    }
}
