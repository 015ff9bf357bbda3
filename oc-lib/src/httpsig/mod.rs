//! HTTP message signing for gateway requests.
//!
//! A signed request carries three headers:
//! - `content-digest`: `sha-256=:BASE64:` over the exact body bytes
//! - `signature-input`: `iam=(@method @path @query content-digest);created="1709000000"`
//! - `signature`: `iam=:BASE64:` holding the raw Ed25519 signature
//!
//! Both sides render the same signature base from the covered components:
//!
//! ```text
//! "@method": POST
//! "@path": /v1/exchanges/okx/withdrawal
//! "@query":
//! "content-digest": sha-256=:47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=:
//! "@signature-params": (@method @path @query content-digest);created="1709000000"
//! ```
//!
//! The signer declares which components it covered; the verifier rebuilds the
//! base from what it actually received and checks it against every configured
//! public key.

mod base;
mod digest;
mod params;
mod sign;
mod signature;
mod signer;
mod verifier;
mod verify;

pub use base::SignatureBase;
pub use digest::ContentDigest;
pub use params::SignatureParameters;
pub use sign::{RequestSigner, SignedHeaders};
pub use signature::Signature;
pub use signer::{Ed25519Signer, Signer};
pub use verifier::{Ed25519Verifier, Verifier};
pub use verify::{verify, verify_http_request, ObservedRequest};

pub const HEADER_CONTENT_DIGEST: &str = "content-digest";
pub const HEADER_SIGNATURE: &str = "signature";
pub const HEADER_SIGNATURE_INPUT: &str = "signature-input";

/// Label used for both `signature-input` and `signature`.
pub const SIGNATURE_NAME: &str = "iam";

/// Header a caller uses to scope a request to a sub-account.
pub const HEADER_SUB_ACCOUNT: &str = "sub-account";

pub const COMPONENT_METHOD: &str = "@method";
pub const COMPONENT_PATH: &str = "@path";
pub const COMPONENT_QUERY: &str = "@query";
pub const COMPONENT_SIGNATURE_PARAMS: &str = "@signature-params";

/// Ways a signing header can fail to parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedHeader {
    #[error("expected '='")]
    MissingEquals,

    #[error("invalid base64")]
    InvalidBase64,

    #[error("missing parentheses")]
    MissingParentheses,

    #[error("invalid key-value pair {0}")]
    InvalidKeyValuePair(String),

    /// A rendered value could not be carried in an HTTP header.
    #[error("value is not a valid header value")]
    InvalidHeaderValue,
}

/// Errors raised while signing or verifying a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpSigError {
    /// A required signing header is absent from the request.
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    /// A signing header is present but cannot be parsed.
    #[error("invalid {header} header ({kind})")]
    MalformedHeader {
        header: &'static str,
        kind: MalformedHeader,
    },

    /// A component the verifier requires was not covered by the signer.
    #[error("missing {0} in signature input")]
    MissingComponent(String),

    /// The body does not hash to the declared content digest.
    #[error("content-digest mismatch")]
    DigestMismatch,

    /// No configured verifier accepted the signature.
    #[error("signature invalid")]
    InvalidSignature,

    /// The signature base cannot render this component.
    #[error("unsupported component: {0}")]
    UnsupportedComponent(String),
}

impl HttpSigError {
    pub(crate) fn malformed(header: &'static str, kind: MalformedHeader) -> Self {
        Self::MalformedHeader { header, kind }
    }
}

/// Splits `name=value` at the first `=`.
fn split_name(header: &'static str, value: &str) -> Result<(String, String), HttpSigError> {
    value
        .split_once('=')
        .map(|(name, rest)| (name.to_string(), rest.to_string()))
        .ok_or_else(|| HttpSigError::malformed(header, MalformedHeader::MissingEquals))
}
