use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::{split_name, HttpSigError, MalformedHeader, HEADER_SIGNATURE, SIGNATURE_NAME};

/// Raw signature bytes, carried in the `signature` header as `iam=:BASE64:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub signature: Vec<u8>,
}

impl Signature {
    pub fn new(signature: Vec<u8>) -> Self {
        Self {
            name: SIGNATURE_NAME.to_string(),
            signature,
        }
    }

    pub fn base64(&self) -> String {
        BASE64.encode(&self.signature)
    }

    pub fn to_header_value(&self) -> String {
        format!("{}=:{}:", self.name, self.base64())
    }

    pub fn parse(value: &str) -> Result<Self, HttpSigError> {
        let (name, encoded) = split_name(HEADER_SIGNATURE, value)?;
        let signature = BASE64
            .decode(encoded.trim_matches(':'))
            .map_err(|_| HttpSigError::malformed(HEADER_SIGNATURE, MalformedHeader::InvalidBase64))?;
        Ok(Self { name, signature })
    }
}
