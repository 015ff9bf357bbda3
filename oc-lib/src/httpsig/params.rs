use super::{
    split_name, HttpSigError, MalformedHeader, COMPONENT_METHOD, COMPONENT_PATH, COMPONENT_QUERY,
    HEADER_CONTENT_DIGEST, HEADER_SIGNATURE_INPUT, SIGNATURE_NAME,
};

const ATTRIBUTE_CREATED: &str = "created";

/// Metadata describing what a signature covers, carried in `signature-input`.
///
/// `components` is the authoritative list of covered request components, in
/// signing order. `attributes` keeps the raw `key=value` pairs in order; values
/// keep their quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParameters {
    pub name: String,
    pub components: Vec<String>,
    pub attributes: Vec<(String, String)>,
}

impl SignatureParameters {
    /// Covers `@method @path @query content-digest` followed by each extra
    /// header name in the order given. Extra names are lowercased and
    /// duplicates are dropped.
    pub fn new<S: AsRef<str>>(created: i64, extra_components: &[S]) -> Self {
        let mut components: Vec<String> = [
            COMPONENT_METHOD,
            COMPONENT_PATH,
            COMPONENT_QUERY,
            HEADER_CONTENT_DIGEST,
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();

        for extra in extra_components {
            let extra = extra.as_ref().trim().to_ascii_lowercase();
            if !extra.is_empty() && !components.contains(&extra) {
                components.push(extra);
            }
        }

        Self {
            name: SIGNATURE_NAME.to_string(),
            components,
            attributes: vec![(ATTRIBUTE_CREATED.to_string(), format!("\"{}\"", created))],
        }
    }

    /// Renders `(<components>);<key>=<value>;...`.
    pub fn serialize(&self) -> String {
        let attributes: Vec<String> = self
            .attributes
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        format!("({});{}", self.components.join(" "), attributes.join(";"))
    }

    /// Renders the full `signature-input` header value, `iam=(...);...`.
    pub fn to_header_value(&self) -> String {
        format!("{}={}", self.name, self.serialize())
    }

    /// Parses a `signature-input` header value.
    pub fn parse(value: &str) -> Result<Self, HttpSigError> {
        let (name, rest) = split_name(HEADER_SIGNATURE_INPUT, value)?;

        let (open, close) = match (rest.find('('), rest.find(')')) {
            (Some(open), Some(close)) if open < close => (open, close),
            _ => {
                return Err(HttpSigError::malformed(
                    HEADER_SIGNATURE_INPUT,
                    MalformedHeader::MissingParentheses,
                ))
            }
        };

        let components = rest[open + 1..close]
            .split(' ')
            .map(str::to_string)
            .collect();

        let mut attributes = Vec::new();
        for part in rest[close + 1..].split(';') {
            if part.trim().is_empty() {
                continue;
            }
            let pair: Vec<&str> = part.split('=').collect();
            if pair.len() != 2 {
                return Err(HttpSigError::malformed(
                    HEADER_SIGNATURE_INPUT,
                    MalformedHeader::InvalidKeyValuePair(part.to_string()),
                ));
            }
            attributes.push((pair[0].to_string(), pair[1].to_string()));
        }

        Ok(Self {
            name,
            components,
            attributes,
        })
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The `created` attribute as unix seconds, if present and numeric.
    pub fn created(&self) -> Option<i64> {
        self.attribute(ATTRIBUTE_CREATED)?
            .trim_matches('"')
            .parse()
            .ok()
    }

    pub fn covers(&self, component: &str) -> bool {
        self.components.iter().any(|c| c == component)
    }
}
