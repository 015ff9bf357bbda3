use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{Ed25519KeyPair, KeyPair};

use crate::{OcError, Result};

/// Produces raw signatures over signature-base bytes.
pub trait Signer: Send + Sync {
    fn sign(&self, message: &[u8]) -> Vec<u8>;

    /// Public half of the key, for out-of-band registration with the gateway.
    fn public_key(&self) -> Vec<u8>;
}

/// Ed25519 signer holding one private key for its lifetime.
pub struct Ed25519Signer {
    seed: [u8; 32],
    keypair: Ed25519KeyPair,
}

impl Ed25519Signer {
    pub fn from_seed(seed: [u8; 32]) -> Result<Self> {
        let keypair = Ed25519KeyPair::from_seed_unchecked(&seed)
            .map_err(|e| OcError::key(format!("invalid ed25519 seed: {}", e)))?;
        Ok(Self { seed, keypair })
    }

    /// Loads a hex-encoded 32-byte seed. Short values are left-padded with
    /// zeros; an optional `0x` prefix is accepted.
    pub fn from_hex_seed(secret: &str) -> Result<Self> {
        let secret = secret.trim();
        let secret = secret.strip_prefix("0x").unwrap_or(secret);
        let padded = format!("{:0>64}", secret);
        let bytes =
            hex::decode(&padded).map_err(|e| OcError::key(format!("invalid hex: {}", e)))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| OcError::key("ed25519 secret not length 32"))?;
        Self::from_seed(seed)
    }

    /// Creates a signer from a fresh random seed.
    pub fn generate() -> Result<Self> {
        let mut seed = [0u8; 32];
        SystemRandom::new()
            .fill(&mut seed)
            .map_err(|_| OcError::key("system random generator unavailable"))?;
        Self::from_seed(seed)
    }

    /// Hex seed, for exporting a freshly generated key into a secret store.
    pub fn seed_hex(&self) -> String {
        hex::encode(self.seed)
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.keypair.public_key().as_ref())
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.keypair.sign(message).as_ref().to_vec()
    }

    fn public_key(&self) -> Vec<u8> {
        self.keypair.public_key().as_ref().to_vec()
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}
