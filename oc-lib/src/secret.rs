//! Secret references for keys and bearer tokens
//!
//! Secrets are never written into configuration directly. A config value names
//! where the secret lives as `<prefix>:<argument>`:
//! - `env:NAME` reads an environment variable
//! - `file:PATH` reads a file (a leading `~` is the home directory)
//! - `raw:VALUE` is the value itself, for tests and local setups
//!
//! Values are trimmed of surrounding whitespace.

use async_trait::async_trait;

use crate::{OcError, Result};

/// Backends recognised in references but not served by this resolver.
const EXTERNAL_BACKENDS: &[&str] = &["vault", "gcp", "gsm", "aws", "keyring"];

/// Resolves a secret reference to its value.
///
/// Called once per secret at startup; failures abort startup.
#[async_trait]
pub trait SecretResolver: Send + Sync {
    async fn load(&self, reference: &str) -> Result<String>;
}

/// Resolves `env:`, `file:` and `raw:` references.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSecretResolver;

#[async_trait]
impl SecretResolver for DefaultSecretResolver {
    async fn load(&self, reference: &str) -> Result<String> {
        let (prefix, rest) = reference.split_once(':').ok_or_else(|| {
            OcError::secret(
                "missing prefix; secret should be in '<prefix>:<argument>' format, \
                 where prefix is one of env, file, raw",
            )
        })?;
        // Arguments are comma separated; these backends take one.
        let argument = rest.split(',').next().unwrap_or_default();

        match prefix.to_ascii_lowercase().as_str() {
            "raw" => Ok(argument.trim().to_string()),
            "env" => {
                let value = std::env::var(argument)
                    .map_err(|_| OcError::secret(format!("{} not set", argument)))?;
                Ok(value.trim().to_string())
            }
            "file" => {
                let path = expand_home(argument);
                let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
                    OcError::secret(format!("failed to read {}: {}", path, e))
                })?;
                Ok(contents.trim().to_string())
            }
            backend if EXTERNAL_BACKENDS.contains(&backend) => Err(OcError::secret(format!(
                "secret backend '{}' is not supported by this build",
                backend
            ))),
            other => Err(OcError::secret(format!("unknown secret type '{}'", other))),
        }
    }
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) if !rest.is_empty() => format!("{}{}", home.display(), rest),
        _ => path.to_string(),
    }
}
