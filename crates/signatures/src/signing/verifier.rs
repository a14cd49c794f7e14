use base64::Engine;
use http::Request;
use http::header::DATE;

use crate::error::SignatureError;

use super::FORGIVING_BASE64;
use super::canonical::{CanonicalRequest, Verb};
use super::date::parse_date;
use super::ed25519::import_public_key;
use super::header::{SignatureParameters, extract_signature};
use super::key::VerifyingKeyHandle;
use super::request::{RequestComponents, SIGNATURE, header_value, request_url};

/// How strictly inbound requests are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifierOptions {
    /// Accept requests whose body is empty. Off by default: deployed peers
    /// reject empty-bodied requests and report `Body` as missing.
    pub allow_empty_body: bool,
    /// Parse and check every `Signature` parameter instead of only pulling
    /// out the signature value.
    pub strict_header: bool,
}

/// Verifies requests signed by one remote party.
pub struct Verifier {
    key: Box<dyn VerifyingKeyHandle>,
    options: VerifierOptions,
}

impl Verifier {
    pub fn new(key: impl VerifyingKeyHandle + 'static) -> Self {
        Self {
            key: Box::new(key),
            options: VerifierOptions::default(),
        }
    }

    /// Builds a verifier from a base64 SPKI Ed25519 public key.
    pub fn from_public_key(encoded: &str) -> Result<Self, SignatureError> {
        Ok(Self::new(import_public_key(encoded)?))
    }

    pub fn with_options(mut self, options: VerifierOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> VerifierOptions {
        self.options
    }

    /// Verifies a complete inbound request.
    ///
    /// Every missing field is reported at once, in the order `Signature`,
    /// `Date`, `URL`, `Body`. `Ok(false)` means the request is well formed
    /// but the signature does not match.
    pub fn validate_request<B: AsRef<[u8]>>(
        &self,
        request: &Request<B>,
    ) -> Result<bool, SignatureError> {
        let headers = request.headers();
        let signature = header_value(headers, &SIGNATURE).map_err(|_| {
            SignatureError::MalformedSignatureHeader("header is not visible ASCII".to_string())
        })?;
        let date = header_value(headers, &DATE)
            .map_err(|_| SignatureError::MalformedDate("<non-ASCII>".to_string()))?;
        let url = request_url(request);
        let body = request.body().as_ref();

        // http::Request always carries a method, so `Method` is never listed.
        let mut missing = Vec::new();
        if signature.is_none() {
            missing.push("Signature");
        }
        if date.is_none() {
            missing.push("Date");
        }
        if url.is_none() {
            missing.push("URL");
        }
        if body.is_empty() && !self.options.allow_empty_body {
            missing.push("Body");
        }
        let (Some(signature), Some(date), Some(url), true) = (signature, date, url, missing.is_empty())
        else {
            return Err(SignatureError::MissingHeaders(missing));
        };

        let signature = if self.options.strict_header {
            SignatureParameters::parse(signature)?.signature_base64()
        } else {
            extract_signature(signature)?
        };
        let date = parse_date(date)?;
        let method = Verb::try_from(request.method())?;

        self.validate_components(
            &signature,
            &RequestComponents::new()
                .method(method)
                .url(&url)
                .date(date)
                .body(body),
        )
    }

    /// Verifies a base64 signature against discrete request components.
    ///
    /// All four components are required; an empty body is fine.
    pub fn validate_components(
        &self,
        signature: &str,
        components: &RequestComponents<'_>,
    ) -> Result<bool, SignatureError> {
        let mut missing = Vec::new();
        if components.date.is_none() {
            missing.push("date");
        }
        if components.method.is_none() {
            missing.push("method");
        }
        if components.url.is_none() {
            missing.push("url");
        }
        if components.body.is_none() {
            missing.push("body");
        }
        let (Some(date), Some(method), Some(url), Some(body)) =
            (components.date, components.method, components.url, components.body)
        else {
            return Err(SignatureError::MissingRequiredParameters(missing));
        };

        let signature = FORGIVING_BASE64.decode(signature).map_err(|e| {
            SignatureError::MalformedSignatureHeader(format!("signature is not base64: {e}"))
        })?;

        let canonical = CanonicalRequest::from_url(method, url, date, body)?;
        let valid = self
            .key
            .verify(canonical.signed_string().as_bytes(), &signature);

        tracing::debug!(
            method = %canonical.method,
            host = %canonical.host,
            path = %canonical.path,
            valid,
            "Checked request signature"
        );

        Ok(valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use http::header::HOST;
    use std::sync::{Arc, Mutex};
    use url::Url;

    /// Records what it was asked to verify and answers with a fixed verdict.
    #[derive(Clone, Default)]
    struct RecordingKey {
        verdict: bool,
        seen: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    }

    impl VerifyingKeyHandle for RecordingKey {
        fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
            self.seen
                .lock()
                .unwrap()
                .push((String::from_utf8(data.to_vec()).unwrap(), signature.to_vec()));
            self.verdict
        }

        fn algorithm(&self) -> &str {
            "mock"
        }
    }

    fn verifier(verdict: bool) -> (Verifier, RecordingKey) {
        let key = RecordingKey {
            verdict,
            ..Default::default()
        };
        (Verifier::new(key.clone()), key)
    }

    #[test]
    fn components_feed_canonical_string_to_key() {
        let (verifier, key) = verifier(true);
        let url = Url::parse("https://example.com/users/abc").unwrap();
        let date = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();

        let valid = verifier
            .validate_components(
                "AQID",
                &RequestComponents::new()
                    .method(Verb::Get)
                    .url(&url)
                    .date(date)
                    .body(b""),
            )
            .unwrap();

        assert!(valid);
        let seen = key.seen.lock().unwrap();
        assert_eq!(
            seen[0].0,
            "(request-target): get /users/abc\nhost: example.com\ndate: 2021-01-01T00:00:00.000Z\ndigest: SHA-256=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=\n"
        );
        assert_eq!(seen[0].1, vec![1, 2, 3]);
    }

    #[test]
    fn mismatch_is_false_not_error() {
        let (verifier, _) = verifier(false);
        let url = Url::parse("https://example.com/inbox").unwrap();
        let valid = verifier
            .validate_components(
                "AQID",
                &RequestComponents::new()
                    .method(Verb::Post)
                    .url(&url)
                    .date(Utc::now())
                    .body(b"{}"),
            )
            .unwrap();
        assert!(!valid);
    }

    #[test]
    fn components_report_every_missing_parameter() {
        let (verifier, _) = verifier(true);
        let err = verifier
            .validate_components("AQID", &RequestComponents::new().method(Verb::Get))
            .unwrap_err();
        assert!(matches!(
            err,
            SignatureError::MissingRequiredParameters(names) if names == ["date", "url", "body"]
        ));
    }

    #[test]
    fn non_base64_signature_is_malformed() {
        let (verifier, key) = verifier(true);
        let url = Url::parse("https://example.com/inbox").unwrap();
        let err = verifier
            .validate_components(
                "%%%",
                &RequestComponents::new()
                    .method(Verb::Post)
                    .url(&url)
                    .date(Utc::now())
                    .body(b"{}"),
            )
            .unwrap_err();
        assert!(matches!(err, SignatureError::MalformedSignatureHeader(_)));
        assert!(key.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn request_missing_signature_date_and_body() {
        let (verifier, _) = verifier(true);
        let request = Request::builder()
            .method("POST")
            .uri("https://example.com/inbox")
            .body(Vec::new())
            .unwrap();
        let err = verifier.validate_request(&request).unwrap_err();
        assert!(matches!(
            err,
            SignatureError::MissingHeaders(names) if names == ["Signature", "Date", "Body"]
        ));
    }

    #[test]
    fn request_without_host_reports_url() {
        let (verifier, _) = verifier(true);
        let request = Request::builder()
            .method("POST")
            .uri("/inbox")
            .header(SIGNATURE, "signature=\"AQID\"")
            .header(DATE, "2021-01-01T00:00:00.000Z")
            .body(b"{}".to_vec())
            .unwrap();
        let err = verifier.validate_request(&request).unwrap_err();
        assert!(matches!(err, SignatureError::MissingHeaders(names) if names == ["URL"]));
    }

    #[test]
    fn empty_body_allowed_when_configured() {
        let (verifier, key) = verifier(true);
        let verifier = verifier.with_options(VerifierOptions {
            allow_empty_body: true,
            ..Default::default()
        });
        let request = Request::builder()
            .method("GET")
            .uri("/users/abc")
            .header(HOST, "example.com")
            .header(SIGNATURE, "keyId=\"k\",signature=\"AQID\"")
            .header(DATE, "Fri, 01 Jan 2021 00:00:00 GMT")
            .body(Vec::new())
            .unwrap();

        assert!(verifier.validate_request(&request).unwrap());
        let seen = key.seen.lock().unwrap();
        assert!(seen[0].0.contains("date: 2021-01-01T00:00:00.000Z\n"));
    }

    #[test]
    fn strict_header_rejects_foreign_algorithm() {
        let (verifier, key) = verifier(true);
        let verifier = verifier.with_options(VerifierOptions {
            strict_header: true,
            ..Default::default()
        });
        let request = Request::builder()
            .method("POST")
            .uri("https://example.com/inbox")
            .header(
                SIGNATURE,
                "keyId=\"k\",algorithm=\"hmac-sha256\",headers=\"(request-target) host date digest\",signature=\"AQID\"",
            )
            .header(DATE, "2021-01-01T00:00:00.000Z")
            .body(b"{}".to_vec())
            .unwrap();

        assert!(matches!(
            verifier.validate_request(&request),
            Err(SignatureError::UnsupportedSignatureParameters(_))
        ));
        assert!(key.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn unparsable_date_is_reported() {
        let (verifier, _) = verifier(true);
        let request = Request::builder()
            .method("POST")
            .uri("https://example.com/inbox")
            .header(SIGNATURE, "signature=\"AQID\"")
            .header(DATE, "tomorrow")
            .body(b"{}".to_vec())
            .unwrap();
        assert!(matches!(
            verifier.validate_request(&request),
            Err(SignatureError::MalformedDate(_))
        ));
    }

    #[test]
    fn unsupported_method_is_reported() {
        let (verifier, _) = verifier(true);
        let request = Request::builder()
            .method("TRACE")
            .uri("https://example.com/inbox")
            .header(SIGNATURE, "signature=\"AQID\"")
            .header(DATE, "2021-01-01T00:00:00.000Z")
            .body(b"{}".to_vec())
            .unwrap();
        assert!(matches!(
            verifier.validate_request(&request),
            Err(SignatureError::UnsupportedMethod(_))
        ));
    }
}
