use http::{HeaderMap, HeaderValue};

use super::{
    ContentDigest, HttpSigError, MalformedHeader, Signature, SignatureBase, SignatureParameters,
    Signer, HEADER_CONTENT_DIGEST, HEADER_SIGNATURE, HEADER_SIGNATURE_INPUT,
};
use crate::clock::{Clock, SystemClock};

/// Headers produced by signing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub content_digest: String,  // "sha-256=:BASE64:"
    pub signature_input: String, // "iam=(...);created=\"...\""
    pub signature: String,       // "iam=:BASE64:"
}

impl SignedHeaders {
    /// Inserts the three signing headers, replacing any earlier values.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), HttpSigError> {
        let pairs = [
            (HEADER_CONTENT_DIGEST, &self.content_digest),
            (HEADER_SIGNATURE_INPUT, &self.signature_input),
            (HEADER_SIGNATURE, &self.signature),
        ];
        for (name, value) in pairs {
            let value = HeaderValue::from_str(value)
                .map_err(|_| HttpSigError::malformed(name, MalformedHeader::InvalidHeaderValue))?;
            headers.insert(name, value);
        }
        Ok(())
    }
}

/// Client-side signing: one private key plus the clock that stamps `created`.
pub struct RequestSigner<S, C = SystemClock> {
    signer: S,
    clock: C,
}

impl<S: Signer> RequestSigner<S, SystemClock> {
    pub fn new(signer: S) -> Self {
        Self {
            signer,
            clock: SystemClock,
        }
    }
}

impl<S: Signer, C: Clock> RequestSigner<S, C> {
    pub fn with_clock(signer: S, clock: C) -> Self {
        Self { signer, clock }
    }

    /// Signs a request described by its parts.
    ///
    /// `extra_components` names headers to cover in addition to the standard
    /// components, e.g. `sub-account` when the call is scoped to one.
    pub fn sign_parts<E: AsRef<str>>(
        &self,
        method: &str,
        path: &str,
        query: &str,
        headers: &HeaderMap,
        body: &[u8],
        extra_components: &[E],
    ) -> Result<SignedHeaders, HttpSigError> {
        let created = self.clock.now_unix();
        let params = SignatureParameters::new(created, extra_components);
        let digest = ContentDigest::compute(body);

        let base = SignatureBase::new(&params, method, path, query, headers, &digest).serialize()?;
        let signature = Signature::new(self.signer.sign(base.as_bytes()));

        tracing::debug!(method, path, created, "signed request");

        Ok(SignedHeaders {
            content_digest: digest.to_header_value(),
            signature_input: params.to_header_value(),
            signature: signature.to_header_value(),
        })
    }

    /// Signs an outgoing request in place. The body is only borrowed, so the
    /// transport still sends it unchanged.
    pub fn sign<B: AsRef<[u8]>, E: AsRef<str>>(
        &self,
        request: &mut http::Request<B>,
        extra_components: &[E],
    ) -> Result<(), HttpSigError> {
        let signed = self.sign_parts(
            request.method().as_str(),
            request.uri().path(),
            request.uri().query().unwrap_or(""),
            request.headers(),
            request.body().as_ref(),
            extra_components,
        )?;
        signed.apply(request.headers_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::httpsig::Ed25519Signer;

    const NO_EXTRA: &[&str] = &[];
    const SEED: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

    fn fixed_signer(created: i64) -> RequestSigner<Ed25519Signer, FixedClock> {
        RequestSigner::with_clock(Ed25519Signer::from_hex_seed(SEED).unwrap(), FixedClock(created))
    }

    fn request(body: &str) -> http::Request<Vec<u8>> {
        http::Request::builder()
            .method("POST")
            .uri("https://gateway.local/v1/exchanges/okx/withdrawal?dry_run=true")
            .header("content-type", "application/json")
            .body(body.as_bytes().to_vec())
            .unwrap()
    }

    #[test]
    fn test_sign_attaches_three_headers() {
        let mut req = request("{\"amount\":\"1\"}");
        fixed_signer(1234567890).sign(&mut req, NO_EXTRA).unwrap();

        let headers = req.headers();
        assert_eq!(
            headers.get("content-digest").unwrap(),
            &ContentDigest::compute(b"{\"amount\":\"1\"}").to_header_value()
        );
        assert_eq!(
            headers.get("signature-input").unwrap(),
            "iam=(@method @path @query content-digest);created=\"1234567890\""
        );

        let sig = Signature::parse(headers.get("signature").unwrap().to_str().unwrap()).unwrap();
        assert_eq!(sig.name, "iam");
        assert_eq!(sig.signature.len(), 64);

        // Body is left in place for the transport.
        assert_eq!(req.body(), b"{\"amount\":\"1\"}");
    }

    #[test]
    fn test_sign_is_deterministic_for_same_instant() {
        let mut a = request("same");
        let mut b = request("same");
        fixed_signer(1700000000).sign(&mut a, NO_EXTRA).unwrap();
        fixed_signer(1700000000).sign(&mut b, NO_EXTRA).unwrap();
        assert_eq!(a.headers().get("signature"), b.headers().get("signature"));
    }

    #[test]
    fn test_sign_differs_only_in_created() {
        let mut a = request("same");
        let mut b = request("same");
        fixed_signer(1700000000).sign(&mut a, NO_EXTRA).unwrap();
        fixed_signer(1700000001).sign(&mut b, NO_EXTRA).unwrap();

        assert_eq!(a.headers().get("content-digest"), b.headers().get("content-digest"));
        assert_ne!(a.headers().get("signature-input"), b.headers().get("signature-input"));
        assert_ne!(a.headers().get("signature"), b.headers().get("signature"));
    }

    #[test]
    fn test_sign_with_extra_component() {
        let mut req = request("{}");
        req.headers_mut().insert("sub-account", "desk-a".parse().unwrap());
        fixed_signer(1).sign(&mut req, &["sub-account"]).unwrap();

        assert_eq!(
            req.headers().get("signature-input").unwrap(),
            "iam=(@method @path @query content-digest sub-account);created=\"1\""
        );
    }

    #[test]
    fn test_sign_parts_rejects_unsupported_component() {
        let err = fixed_signer(1)
            .sign_parts("GET", "/", "", &HeaderMap::new(), b"", &["@authority"])
            .unwrap_err();
        assert_eq!(err, HttpSigError::UnsupportedComponent("@authority".to_string()));
    }

    #[test]
    fn test_apply_rejects_unrepresentable_value() {
        let signed = SignedHeaders {
            content_digest: "sha-256=:x:".to_string(),
            signature_input: "iam=(bad\nname);".to_string(),
            signature: "iam=:x:".to_string(),
        };
        let err = signed.apply(&mut HeaderMap::new()).unwrap_err();
        assert_eq!(
            err,
            HttpSigError::malformed(HEADER_SIGNATURE_INPUT, MalformedHeader::InvalidHeaderValue)
        );
    }
}
