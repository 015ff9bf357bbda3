use http::HeaderMap;

use super::{
    ContentDigest, HttpSigError, SignatureParameters, COMPONENT_METHOD, COMPONENT_PATH,
    COMPONENT_QUERY, COMPONENT_SIGNATURE_PARAMS, HEADER_CONTENT_DIGEST,
};

/// The canonical text that is signed and verified.
///
/// Built from borrowed request parts; it exists only long enough to be
/// serialized.
#[derive(Debug)]
pub struct SignatureBase<'a> {
    pub params: &'a SignatureParameters,
    pub method: &'a str,
    pub path: &'a str,
    pub query: &'a str,
    pub headers: &'a HeaderMap,
    pub digest: &'a ContentDigest,
}

impl<'a> SignatureBase<'a> {
    pub fn new(
        params: &'a SignatureParameters,
        method: &'a str,
        path: &'a str,
        query: &'a str,
        headers: &'a HeaderMap,
        digest: &'a ContentDigest,
    ) -> Self {
        Self {
            params,
            method,
            path,
            query,
            headers,
            digest,
        }
    }

    /// Renders one `"<component>": <value>\n` line per covered component,
    /// then a final `"@signature-params"` line.
    ///
    /// A covered header that is absent from the request renders as an empty
    /// value.
    pub fn serialize(&self) -> Result<String, HttpSigError> {
        let mut base = String::new();

        for component in &self.params.components {
            let value = match component.as_str() {
                COMPONENT_METHOD => self.method.to_string(),
                COMPONENT_PATH => self.path.to_string(),
                COMPONENT_QUERY => self.query.to_string(),
                HEADER_CONTENT_DIGEST => self.digest.to_header_value(),
                other if other.starts_with('@') => {
                    return Err(HttpSigError::UnsupportedComponent(other.to_string()))
                }
                header => self.header_value(header),
            };
            base.push_str(&format!("\"{}\": {}\n", component, value));
        }

        base.push_str(&format!(
            "\"{}\": {}\n",
            COMPONENT_SIGNATURE_PARAMS,
            self.params.serialize()
        ));
        Ok(base)
    }

    fn header_value(&self, name: &str) -> String {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_EXTRA: &[&str] = &[];

    #[test]
    fn test_serialize_standard_components() {
        let params = SignatureParameters::new(1709000000, NO_EXTRA);
        let digest = ContentDigest::compute(b"");
        let headers = HeaderMap::new();
        let base = SignatureBase::new(
            &params,
            "POST",
            "/v1/exchanges/okx/withdrawal",
            "a=1",
            &headers,
            &digest,
        );

        let expected = "\"@method\": POST\n\
                        \"@path\": /v1/exchanges/okx/withdrawal\n\
                        \"@query\": a=1\n\
                        \"content-digest\": sha-256=:47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=:\n\
                        \"@signature-params\": (@method @path @query content-digest);created=\"1709000000\"\n";
        assert_eq!(base.serialize().unwrap(), expected);
    }

    #[test]
    fn test_serialize_literal_header() {
        let params = SignatureParameters::new(1, &["sub-account"]);
        let digest = ContentDigest::compute(b"{}");
        let mut headers = HeaderMap::new();
        headers.insert("sub-account", "desk-a".parse().unwrap());

        let rendered = SignatureBase::new(&params, "GET", "/x", "", &headers, &digest)
            .serialize()
            .unwrap();
        assert!(rendered.contains("\"@query\": \n"));
        assert!(rendered.contains("\"sub-account\": desk-a\n"));
        assert!(rendered.ends_with("\"@signature-params\": (@method @path @query content-digest sub-account);created=\"1\"\n"));
    }

    #[test]
    fn test_absent_header_renders_empty() {
        let params = SignatureParameters::new(1, &["sub-account"]);
        let digest = ContentDigest::compute(b"");
        let headers = HeaderMap::new();

        let rendered = SignatureBase::new(&params, "GET", "/x", "", &headers, &digest)
            .serialize()
            .unwrap();
        assert!(rendered.contains("\"sub-account\": \n"));
    }

    #[test]
    fn test_unsupported_pseudo_component() {
        let mut params = SignatureParameters::new(1, NO_EXTRA);
        params.components.push("@authority".to_string());
        let digest = ContentDigest::compute(b"");
        let headers = HeaderMap::new();

        let err = SignatureBase::new(&params, "GET", "/", "", &headers, &digest)
            .serialize()
            .unwrap_err();
        assert_eq!(err, HttpSigError::UnsupportedComponent("@authority".to_string()));
    }

    #[test]
    fn test_signature_params_is_not_a_loop_component() {
        let mut params = SignatureParameters::new(1, NO_EXTRA);
        params.components.push(COMPONENT_SIGNATURE_PARAMS.to_string());
        let digest = ContentDigest::compute(b"");
        let headers = HeaderMap::new();

        assert!(matches!(
            SignatureBase::new(&params, "GET", "/", "", &headers, &digest).serialize(),
            Err(HttpSigError::UnsupportedComponent(_))
        ));
    }

    #[test]
    fn test_component_order_follows_params() {
        let params = SignatureParameters {
            name: "iam".to_string(),
            components: vec!["content-digest".to_string(), "@method".to_string()],
            attributes: vec![],
        };
        let digest = ContentDigest::compute(b"");
        let headers = HeaderMap::new();

        let rendered = SignatureBase::new(&params, "PUT", "/", "", &headers, &digest)
            .serialize()
            .unwrap();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("\"content-digest\": "));
        assert_eq!(lines[1], "\"@method\": PUT");
        assert_eq!(lines[2], "\"@signature-params\": (content-digest @method);");
    }
}
