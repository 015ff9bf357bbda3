//! Endpoint authentication policy.
//!
//! Every gateway route belongs to a [`RouteClass`]. The [`Authenticator`]
//! decides, before any handler runs, whether a request carries a credential
//! that class accepts:
//!
//! - `Public`: nothing required.
//! - `ReadOrWrite`: a configured bearer token or a valid signature, unless the
//!   gateway exposes read endpoints publicly.
//! - `Write`: a valid signature only.
//!
//! A request scoped to a sub-account must have signed the `sub-account`
//! header, so a captured signature cannot be replayed against another one.

use std::fmt;
use std::sync::Arc;

use http::header::AUTHORIZATION;
use http::HeaderMap;
use ring::constant_time;
use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::httpsig::{
    self, HttpSigError, ObservedRequest, SignatureParameters, Verifier, HEADER_CONTENT_DIGEST,
    HEADER_SIGNATURE, HEADER_SIGNATURE_INPUT, HEADER_SUB_ACCOUNT,
};

/// Credential requirement of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Reference data, open to anyone.
    Public,
    /// Reads account state.
    ReadOrWrite,
    /// Moves funds.
    Write,
}

/// How a request was let through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// No credential was needed.
    Anonymous,
    /// A configured bearer token, identified by its config id.
    Bearer { id: String },
    /// A verified request signature.
    Signature(SignatureParameters),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no authorization header or http-signature")]
    MissingCredential,

    #[error("expected Bearer token in authorization header")]
    MalformedCredential,

    #[error("invalid bearer token")]
    InvalidBearerToken,

    #[error(transparent)]
    Signature(#[from] HttpSigError),
}

impl AuthError {
    /// Text safe to return to the caller.
    ///
    /// Digest and signature failures read the same so a caller cannot tell
    /// which check rejected the request.
    pub fn public_message(&self) -> String {
        match self {
            Self::Signature(HttpSigError::DigestMismatch)
            | Self::Signature(HttpSigError::InvalidSignature) => "invalid signature".to_string(),
            other => other.to_string(),
        }
    }
}

/// A static bearer token accepted on read routes.
#[derive(Clone)]
pub struct BearerToken {
    pub id: String,
    pub token: String,
}

impl BearerToken {
    pub fn new(id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Applies the route policy. Built once at startup and shared read-only.
pub struct Authenticator {
    bearer_tokens: Vec<BearerToken>,
    verifiers: Vec<Arc<dyn Verifier>>,
    public_read_endpoints: bool,
    clock: Box<dyn Clock>,
}

impl Authenticator {
    pub fn new(
        bearer_tokens: Vec<BearerToken>,
        verifiers: Vec<Arc<dyn Verifier>>,
        public_read_endpoints: bool,
    ) -> Self {
        Self {
            bearer_tokens,
            verifiers,
            public_read_endpoints,
            clock: Box::new(SystemClock),
        }
    }

    /// Replaces the clock used to report signature age in logs.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn public_read_endpoints(&self) -> bool {
        self.public_read_endpoints
    }

    pub fn verifier_count(&self) -> usize {
        self.verifiers.len()
    }

    pub fn bearer_token_count(&self) -> usize {
        self.bearer_tokens.len()
    }

    pub fn authenticate(
        &self,
        class: RouteClass,
        request: &ObservedRequest<'_>,
    ) -> Result<Credential, AuthError> {
        match class {
            RouteClass::Public => Ok(Credential::Anonymous),
            RouteClass::ReadOrWrite => self.authenticate_read(request),
            RouteClass::Write => self.authenticate_signature(request),
        }
    }

    fn authenticate_read(&self, request: &ObservedRequest<'_>) -> Result<Credential, AuthError> {
        if self.public_read_endpoints {
            return Ok(Credential::Anonymous);
        }

        match authorization(request.headers) {
            Authorization::Bearer(token) => self.authenticate_bearer(token),
            Authorization::OtherScheme => Err(AuthError::MalformedCredential),
            Authorization::Absent if has_signature_headers(request.headers) => {
                self.authenticate_signature(request)
            }
            Authorization::Absent => Err(AuthError::MissingCredential),
        }
    }

    fn authenticate_bearer(&self, token: &str) -> Result<Credential, AuthError> {
        let matches = |b: &&BearerToken| {
            constant_time::verify_slices_are_equal(b.token.as_bytes(), token.as_bytes()).is_ok()
        };
        match self.bearer_tokens.iter().find(matches) {
            Some(bearer) => {
                tracing::debug!(token_id = %bearer.id, "bearer token accepted");
                Ok(Credential::Bearer {
                    id: bearer.id.clone(),
                })
            }
            None => Err(AuthError::InvalidBearerToken),
        }
    }

    fn authenticate_signature(
        &self,
        request: &ObservedRequest<'_>,
    ) -> Result<Credential, AuthError> {
        let required: &[&str] = if sub_account_requested(request.headers, request.query) {
            &[HEADER_SUB_ACCOUNT]
        } else {
            &[]
        };

        let params = httpsig::verify(request, &self.verifiers, required)?;
        if let Some(created) = params.created() {
            // created is caller supplied and unbounded.
            let age = self.clock.now_unix().saturating_sub(created);
            tracing::debug!(created, age_secs = age, "signature verified");
        }
        Ok(Credential::Signature(params))
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("bearer_tokens", &self.bearer_tokens)
            .field("verifiers", &self.verifiers.len())
            .field("public_read_endpoints", &self.public_read_endpoints)
            .finish()
    }
}

enum Authorization<'a> {
    Absent,
    Bearer(&'a str),
    OtherScheme,
}

/// Reads `Authorization`. Anything other than exactly two space-separated
/// tokens counts as absent, so signature headers can still be tried.
fn authorization(headers: &HeaderMap) -> Authorization<'_> {
    let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return Authorization::Absent;
    };
    let parts: Vec<&str> = value.trim().split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] => Authorization::Bearer(token),
        [_, _] => Authorization::OtherScheme,
        _ => Authorization::Absent,
    }
}

fn has_signature_headers(headers: &HeaderMap) -> bool {
    [HEADER_SIGNATURE, HEADER_SIGNATURE_INPUT, HEADER_CONTENT_DIGEST]
        .iter()
        .all(|name| headers.get(*name).is_some_and(|v| !v.is_empty()))
}

/// True when the request names a sub-account, by header or by a non-empty
/// `sub-account` query parameter.
pub fn sub_account_requested(headers: &HeaderMap, query: &str) -> bool {
    if headers
        .get(HEADER_SUB_ACCOUNT)
        .is_some_and(|v| !v.is_empty())
    {
        return true;
    }
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .any(|(key, value)| key == HEADER_SUB_ACCOUNT && !value.is_empty())
}
