use std::sync::Arc;

use http::HeaderMap;

use super::{
    ContentDigest, HttpSigError, Signature, SignatureBase, SignatureParameters, Verifier,
    COMPONENT_METHOD, COMPONENT_PATH, COMPONENT_QUERY, HEADER_CONTENT_DIGEST, HEADER_SIGNATURE,
    HEADER_SIGNATURE_INPUT,
};

/// An incoming request as the server actually received it.
#[derive(Debug, Clone, Copy)]
pub struct ObservedRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub query: &'a str,
    pub headers: &'a HeaderMap,
    pub body: &'a [u8],
}

impl<'a> ObservedRequest<'a> {
    pub fn from_parts(parts: &'a http::request::Parts, body: &'a [u8]) -> Self {
        Self {
            method: parts.method.as_str(),
            path: parts.uri.path(),
            query: parts.uri.query().unwrap_or(""),
            headers: &parts.headers,
            body,
        }
    }
}

/// Verifies a signed request against a set of public keys.
///
/// `required` lists header names this route insists were signed, on top of
/// `@method`, `@path` and `@query`. Returns the parsed parameters so the
/// caller can audit `created`.
pub fn verify(
    request: &ObservedRequest<'_>,
    verifiers: &[Arc<dyn Verifier>],
    required: &[&str],
) -> Result<SignatureParameters, HttpSigError> {
    let digest_header = header(request.headers, HEADER_CONTENT_DIGEST)?;
    let signature_header = header(request.headers, HEADER_SIGNATURE)?;
    let input_header = header(request.headers, HEADER_SIGNATURE_INPUT)?;

    let declared_digest = ContentDigest::parse(digest_header)?;
    let signature = Signature::parse(signature_header)?;
    let params = SignatureParameters::parse(input_header)?;

    for component in [COMPONENT_METHOD, COMPONENT_PATH, COMPONENT_QUERY]
        .into_iter()
        .chain(required.iter().copied())
    {
        if !params.covers(component) {
            return Err(HttpSigError::MissingComponent(component.to_string()));
        }
    }

    // Tampered bodies stop here, before any key is tried.
    if !ContentDigest::compute(request.body).matches(&declared_digest) {
        return Err(HttpSigError::DigestMismatch);
    }

    let base = SignatureBase::new(
        &params,
        request.method,
        request.path,
        request.query,
        request.headers,
        &declared_digest,
    )
    .serialize()?;

    if verifiers
        .iter()
        .any(|v| v.verify(base.as_bytes(), &signature.signature))
    {
        Ok(params)
    } else {
        Err(HttpSigError::InvalidSignature)
    }
}

/// Verifies an `http::Request` whose body is already buffered.
pub fn verify_http_request<B: AsRef<[u8]>>(
    request: &http::Request<B>,
    verifiers: &[Arc<dyn Verifier>],
    required: &[&str],
) -> Result<SignatureParameters, HttpSigError> {
    let observed = ObservedRequest {
        method: request.method().as_str(),
        path: request.uri().path(),
        query: request.uri().query().unwrap_or(""),
        headers: request.headers(),
        body: request.body().as_ref(),
    };
    verify(&observed, verifiers, required)
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, HttpSigError> {
    match headers.get(name) {
        None => Err(HttpSigError::MissingHeader(name)),
        Some(value) if value.is_empty() => Err(HttpSigError::MissingHeader(name)),
        Some(value) => value.to_str().map_err(|_| {
            HttpSigError::malformed(name, super::MalformedHeader::InvalidHeaderValue)
        }),
    }
}
