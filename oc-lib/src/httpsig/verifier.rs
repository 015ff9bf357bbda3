use ring::signature::{UnparsedPublicKey, ED25519};

use crate::{OcError, Result};

const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// Checks a raw signature against one known public key.
///
/// Implementations must return `false` rather than fail on malformed input so
/// that a list of verifiers can be tried in turn.
pub trait Verifier: Send + Sync {
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool;
}

/// Ed25519 verifier holding one public key.
#[derive(Debug)]
pub struct Ed25519Verifier {
    public_key: UnparsedPublicKey<Vec<u8>>,
}

impl Ed25519Verifier {
    pub fn new(public_key: &[u8]) -> Result<Self> {
        if public_key.len() != ED25519_PUBLIC_KEY_LEN {
            return Err(OcError::key(format!(
                "invalid public key length: expected {}, got {}",
                ED25519_PUBLIC_KEY_LEN,
                public_key.len()
            )));
        }
        Ok(Self {
            public_key: UnparsedPublicKey::new(&ED25519, public_key.to_vec()),
        })
    }

    /// Parses a hex public key, with or without a `0x` prefix.
    pub fn from_hex(key: &str) -> Result<Self> {
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let bytes = hex::decode(key).map_err(|e| OcError::key(format!("invalid hex: {}", e)))?;
        Self::new(&bytes)
    }
}

impl Verifier for Ed25519Verifier {
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        self.public_key.verify(message, signature).is_ok()
    }
}
