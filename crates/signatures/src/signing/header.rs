use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use crate::error::SignatureError;

use super::FORGIVING_BASE64;

/// The only signature algorithm the protocol knows.
pub const ALGORITHM: &str = "ed25519";

/// Fields covered by every signature, in signing order.
pub const SIGNED_HEADERS: [&str; 4] = ["(request-target)", "host", "date", "digest"];

const SIGNATURE_MARKER: &str = "signature=";

/// Parameters of a `Signature` header.
///
/// Algorithm and header list are fixed for this protocol version, so only
/// the key id and the signature bytes vary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParameters {
    key_id: String,
    signature: Vec<u8>,
}

impl SignatureParameters {
    pub fn new(key_id: impl Into<String>, signature: Vec<u8>) -> Self {
        Self {
            key_id: key_id.into(),
            signature,
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn algorithm(&self) -> &'static str {
        ALGORITHM
    }

    pub fn signed_headers(&self) -> &'static [&'static str] {
        &SIGNED_HEADERS
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn signature_base64(&self) -> String {
        BASE64.encode(&self.signature)
    }

    /// Strict parse: every parameter is read and checked.
    ///
    /// Structural problems are `MalformedSignatureHeader`; a well-formed
    /// header asking for another algorithm or header list is
    /// `UnsupportedSignatureParameters`.
    pub fn parse(value: &str) -> Result<Self, SignatureError> {
        let params = tokenize(value)?;
        let get = |name: &str| {
            params
                .iter()
                .find(|(param, _)| *param == name)
                .map(|(_, value)| *value)
        };

        let key_id = get("keyId")
            .filter(|key_id| !key_id.is_empty())
            .ok_or_else(|| malformed("missing keyId"))?;

        let algorithm = get("algorithm").ok_or_else(|| malformed("missing algorithm"))?;
        if algorithm != ALGORITHM {
            return Err(SignatureError::UnsupportedSignatureParameters(format!(
                "algorithm {algorithm:?}"
            )));
        }

        let headers = get("headers").ok_or_else(|| malformed("missing headers"))?;
        if !headers.split_whitespace().eq(SIGNED_HEADERS) {
            return Err(SignatureError::UnsupportedSignatureParameters(format!(
                "headers {headers:?}"
            )));
        }

        let signature = get("signature")
            .filter(|signature| !signature.is_empty())
            .ok_or_else(|| malformed("missing signature"))?;
        let signature = FORGIVING_BASE64
            .decode(signature)
            .map_err(|e| malformed(&format!("signature is not base64: {e}")))?;

        Ok(Self::new(key_id, signature))
    }
}

impl fmt::Display for SignatureParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "keyId=\"{}\",algorithm=\"{}\",headers=\"{}\",signature=\"{}\"",
            self.key_id,
            ALGORITHM,
            SIGNED_HEADERS.join(" "),
            self.signature_base64()
        )
    }
}

/// Lenient parse: returns whatever follows the first `signature=` with all
/// double quotes and surrounding whitespace removed. Other parameters are not
/// looked at.
pub fn extract_signature(value: &str) -> Result<String, SignatureError> {
    let (_, rest) = value
        .split_once(SIGNATURE_MARKER)
        .ok_or_else(|| malformed("wrong format or missing signature"))?;

    let signature: String = rest.chars().filter(|c| *c != '"').collect();
    let signature = signature.trim();
    if signature.is_empty() {
        return Err(malformed("wrong format or missing signature"));
    }
    Ok(signature.to_string())
}

fn malformed(reason: &str) -> SignatureError {
    SignatureError::MalformedSignatureHeader(reason.to_string())
}

/// Splits `name=value, name="quoted, value"` into pairs.
fn tokenize(value: &str) -> Result<Vec<(&str, &str)>, SignatureError> {
    let mut params: Vec<(&str, &str)> = Vec::new();
    let mut rest = value.trim();

    while !rest.is_empty() {
        let (name, after) = rest
            .split_once('=')
            .ok_or_else(|| malformed(&format!("parameter without value near {rest:?}")))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(malformed("empty parameter name"));
        }

        let after = after.trim_start();
        let (param_value, remainder) = match after.strip_prefix('"') {
            Some(quoted) => {
                let end = quoted
                    .find('"')
                    .ok_or_else(|| malformed(&format!("unterminated value for {name}")))?;
                (&quoted[..end], &quoted[end + 1..])
            }
            None => match after.find(',') {
                Some(comma) => (after[..comma].trim_end(), &after[comma..]),
                None => (after.trim_end(), ""),
            },
        };

        if params.iter().any(|(seen, _)| *seen == name) {
            return Err(malformed(&format!("duplicate parameter {name}")));
        }
        params.push((name, param_value));

        let remainder = remainder.trim_start();
        rest = match remainder.strip_prefix(',') {
            Some(next) => next.trim_start(),
            None if remainder.is_empty() => "",
            None => return Err(malformed(&format!("expected ',' after {name}"))),
        };
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_ID: &str = "https://example.com/users/6a18f2c3";

    fn sample() -> SignatureParameters {
        SignatureParameters::new(KEY_ID, vec![1, 2, 3, 4, 5])
    }

    #[test]
    fn serializes_fixed_layout() {
        assert_eq!(
            sample().to_string(),
            "keyId=\"https://example.com/users/6a18f2c3\",algorithm=\"ed25519\",headers=\"(request-target) host date digest\",signature=\"AQIDBAU=\""
        );
    }

    #[test]
    fn strict_parse_reads_serialized_header() {
        let parsed = SignatureParameters::parse(&sample().to_string()).unwrap();
        assert_eq!(parsed, sample());
        assert_eq!(parsed.signed_headers(), SIGNED_HEADERS);
    }

    #[test]
    fn strict_parse_tolerates_spacing_and_quoted_commas() {
        let header = r#"keyId="https://example.com/a,b", algorithm=ed25519 , headers="(request-target) host date digest",signature="AQIDBAU=""#;
        let parsed = SignatureParameters::parse(header).unwrap();
        assert_eq!(parsed.key_id(), "https://example.com/a,b");
        assert_eq!(parsed.signature(), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn strict_parse_rejects_other_algorithm() {
        let header = r#"keyId="k",algorithm="rsa-sha256",headers="(request-target) host date digest",signature="AQ==""#;
        assert!(matches!(
            SignatureParameters::parse(header),
            Err(SignatureError::UnsupportedSignatureParameters(_))
        ));
    }

    #[test]
    fn strict_parse_rejects_other_header_list() {
        let header = r#"keyId="k",algorithm="ed25519",headers="(request-target) host date",signature="AQ==""#;
        assert!(matches!(
            SignatureParameters::parse(header),
            Err(SignatureError::UnsupportedSignatureParameters(_))
        ));
    }

    #[test]
    fn strict_parse_rejects_structural_problems() {
        for header in [
            r#"algorithm="ed25519",headers="(request-target) host date digest",signature="AQ==""#,
            r#"keyId="k",algorithm="ed25519",headers="(request-target) host date digest",signature="""#,
            r#"keyId="k",algorithm="ed25519",headers="(request-target) host date digest",signature="!!""#,
            r#"keyId="k",keyId="j",algorithm="ed25519",headers="(request-target) host date digest",signature="AQ==""#,
            r#"keyId="k,algorithm="ed25519""#,
            r#"keyId="k" algorithm="ed25519""#,
            "garbage",
        ] {
            assert!(
                matches!(
                    SignatureParameters::parse(header),
                    Err(SignatureError::MalformedSignatureHeader(_))
                ),
                "{header}"
            );
        }
    }

    #[test]
    fn lenient_extracts_signature_value() {
        assert_eq!(extract_signature(&sample().to_string()).unwrap(), "AQIDBAU=");
    }

    #[test]
    fn lenient_requires_marker() {
        assert!(matches!(
            extract_signature(r#"keyId="k",algorithm="ed25519""#),
            Err(SignatureError::MalformedSignatureHeader(_))
        ));
    }

    #[test]
    fn lenient_rejects_empty_value() {
        assert!(matches!(
            extract_signature(r#"signature="""#),
            Err(SignatureError::MalformedSignatureHeader(_))
        ));
        assert!(matches!(
            extract_signature("signature="),
            Err(SignatureError::MalformedSignatureHeader(_))
        ));
    }

    #[test]
    fn lenient_trims_surrounding_whitespace() {
        assert_eq!(extract_signature("signature=\"AQID\" ").unwrap(), "AQID");
        assert_eq!(extract_signature("signature= AQID\r\n").unwrap(), "AQID");
        assert!(matches!(
            extract_signature("signature=\"  \""),
            Err(SignatureError::MalformedSignatureHeader(_))
        ));
    }

    #[test]
    fn lenient_ignores_other_parameters() {
        let header = r#"keyId="whatever",algorithm="rsa",signature="AQ==""#;
        assert_eq!(extract_signature(header).unwrap(), "AQ==");
    }
}
