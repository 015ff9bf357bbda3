//! Gateway configuration
//!
//! Read from a `.toml` or `.json` file; the extension picks the format.
//! Secrets (bearer tokens) are stored as references and resolved at startup.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::{Authenticator, BearerToken};
use crate::httpsig::{Ed25519Verifier, Verifier};
use crate::secret::SecretResolver;
use crate::{OcError, Result};

/// Environment variable naming the config file when `--config` is not given.
pub const ENV_OFFCHAIN_CONFIG: &str = "OFFCHAIN_CONFIG";

pub const DEFAULT_LISTEN: &str = "127.0.0.1:6333";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    pub public_read_endpoints: bool,
    pub bearer_tokens: Vec<BearerTokenConfig>,
    pub public_keys: Vec<PublicKeyConfig>,
    pub exchanges: Vec<ExchangeConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            public_read_endpoints: false,
            bearer_tokens: Vec::new(),
            public_keys: Vec::new(),
            exchanges: Vec::new(),
        }
    }
}

/// A bearer token entry. `token` is a secret reference, e.g. `env:READ_TOKEN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerTokenConfig {
    pub id: String,
    pub token: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    #[default]
    #[serde(alias = "ed255")]
    Ed25519,
}

/// A registered caller public key, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyConfig {
    #[serde(default)]
    pub algorithm: KeyAlgorithm,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub id: String,
    #[serde(default)]
    pub subaccounts: Vec<SubaccountConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubaccountConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ExchangeConfig {
    /// Finds a sub-account by id, then by alias.
    pub fn subaccount(&self, name: &str) -> Option<&SubaccountConfig> {
        self.subaccounts
            .iter()
            .find(|s| s.id == name)
            .or_else(|| {
                self.subaccounts
                    .iter()
                    .find(|s| s.alias.as_deref() == Some(name))
            })
    }
}

impl ServerConfig {
    /// Picks the config path: the explicit one, else `OFFCHAIN_CONFIG`.
    pub fn resolve_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path);
        }
        match std::env::var(ENV_OFFCHAIN_CONFIG) {
            Ok(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Err(OcError::config(format!(
                "config path is required (maybe set {})",
                ENV_OFFCHAIN_CONFIG
            ))),
        }
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;

        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&data)
                .map_err(|e| OcError::config(format!("TOML parsing: {}", e)))?,
            Some("json") => serde_json::from_str(&data)?,
            Some(ext) => {
                return Err(OcError::config(format!("unrecognized extension '{}'", ext)))
            }
            None => return Err(OcError::config("failed figuring out file extension")),
        };

        config.validate()?;
        tracing::info!(config = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut token_ids = HashSet::new();
        for bearer in &self.bearer_tokens {
            if bearer.id.is_empty() {
                return Err(OcError::config("bearer token id must not be empty"));
            }
            if !token_ids.insert(bearer.id.as_str()) {
                return Err(OcError::config(format!(
                    "duplicate bearer token id '{}'",
                    bearer.id
                )));
            }
        }

        let mut exchange_ids = HashSet::new();
        for exchange in &self.exchanges {
            if exchange.id.is_empty() {
                return Err(OcError::config("exchange id must not be empty"));
            }
            if !exchange_ids.insert(exchange.id.as_str()) {
                return Err(OcError::config(format!(
                    "duplicate exchange '{}'",
                    exchange.id
                )));
            }

            let mut names = HashSet::new();
            for sub in &exchange.subaccounts {
                let all_names = std::iter::once(sub.id.as_str()).chain(sub.alias.as_deref());
                for name in all_names {
                    if !names.insert(name) {
                        return Err(OcError::config(format!(
                            "duplicate sub-account '{}' on exchange '{}'",
                            name, exchange.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Parses every configured public key.
    pub fn verifiers(&self) -> Result<Vec<Arc<dyn Verifier>>> {
        self.public_keys
            .iter()
            .enumerate()
            .map(|(i, key)| match key.algorithm {
                KeyAlgorithm::Ed25519 => Ed25519Verifier::from_hex(&key.key)
                    .map(|v| Arc::new(v) as Arc<dyn Verifier>)
                    .map_err(|e| {
                        OcError::config(format!("failed to create ed25519 verifier {}: {}", i, e))
                    }),
            })
            .collect()
    }

    /// Resolves every bearer token reference.
    pub async fn resolve_bearer_tokens(&self, resolver: &dyn SecretResolver) -> Result<Vec<BearerToken>> {
        let mut tokens = Vec::with_capacity(self.bearer_tokens.len());
        for bearer in &self.bearer_tokens {
            let token = resolver.load(&bearer.token).await.map_err(|e| {
                OcError::config(format!("failed to load bearer token {}: {}", bearer.id, e))
            })?;
            if token.is_empty() {
                return Err(OcError::config(format!(
                    "bearer token {} resolved to an empty value",
                    bearer.id
                )));
            }
            tokens.push(BearerToken::new(&bearer.id, token));
        }
        Ok(tokens)
    }

    /// Builds the request authenticator, warning about unreachable routes.
    pub async fn build_authenticator(&self, resolver: &dyn SecretResolver) -> Result<Authenticator> {
        let bearer_tokens = self.resolve_bearer_tokens(resolver).await?;
        let verifiers = self.verifiers()?;

        if bearer_tokens.is_empty() && verifiers.is_empty() && !self.public_read_endpoints {
            tracing::warn!("no authentication means configured, read endpoints will be unreachable");
        }
        if verifiers.is_empty() {
            tracing::warn!("no public keys configured, write endpoints will be unreachable");
        }

        Ok(Authenticator::new(
            bearer_tokens,
            verifiers,
            self.public_read_endpoints,
        ))
    }
}
