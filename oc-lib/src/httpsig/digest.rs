use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};

use super::{split_name, HttpSigError, MalformedHeader, HEADER_CONTENT_DIGEST};

const ALGORITHM_SHA256: &str = "sha-256";

/// Digest of a request body, carried in the `content-digest` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDigest {
    pub algorithm: String,
    pub digest: Vec<u8>,
}

impl ContentDigest {
    /// SHA-256 of the exact body bytes. An empty body hashes zero bytes.
    pub fn compute(body: &[u8]) -> Self {
        Self {
            algorithm: ALGORITHM_SHA256.to_string(),
            digest: Sha256::digest(body).to_vec(),
        }
    }

    pub fn base64(&self) -> String {
        BASE64.encode(&self.digest)
    }

    /// Renders `sha-256=:BASE64:`.
    pub fn to_header_value(&self) -> String {
        format!("{}=:{}:", self.algorithm, self.base64())
    }

    /// Parses a `content-digest` header value.
    pub fn parse(value: &str) -> Result<Self, HttpSigError> {
        let (algorithm, encoded) = split_name(HEADER_CONTENT_DIGEST, value)?;
        let digest = BASE64
            .decode(encoded.trim_matches(':'))
            .map_err(|_| HttpSigError::malformed(HEADER_CONTENT_DIGEST, MalformedHeader::InvalidBase64))?;
        Ok(Self { algorithm, digest })
    }

    /// Byte-for-byte comparison of the digest values.
    pub fn matches(&self, other: &ContentDigest) -> bool {
        self.digest == other.digest
    }
}
