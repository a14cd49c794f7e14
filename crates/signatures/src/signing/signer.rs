use chrono::Utc;
use http::header::{DATE, HeaderMap, HeaderValue};
use http::Request;

use crate::error::SignatureError;

use super::canonical::{CanonicalRequest, Verb};
use super::date::{format_date, parse_date};
use super::ed25519::import_private_key;
use super::header::SignatureParameters;
use super::key::SigningKeyHandle;
use super::request::{RequestComponents, SIGNATURE, header_value, request_url};

/// Headers produced by `Signer::sign_components`.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub headers: HeaderMap,
    /// The exact canonical string the signature covers.
    pub signed_string: String,
}

/// A signed copy of a request.
#[derive(Debug)]
pub struct SignedRequest<B> {
    pub request: Request<B>,
    pub signed_string: String,
}

/// Signs outbound requests on behalf of one local actor.
pub struct Signer {
    key: Box<dyn SigningKeyHandle>,
    key_id: String,
}

impl Signer {
    pub fn new(key: impl SigningKeyHandle + 'static, key_id: impl Into<String>) -> Self {
        Self {
            key: Box::new(key),
            key_id: key_id.into(),
        }
    }

    /// Builds a signer from a base64 PKCS#8 Ed25519 private key.
    pub fn from_private_key(encoded: &str, key_id: impl Into<String>) -> Result<Self, SignatureError> {
        Ok(Self::new(import_private_key(encoded)?, key_id))
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Signs a copy of `request`.
    ///
    /// An existing `Date` header is kept as the signing time (re-rendered in
    /// the canonical form); otherwise the current time is used. The copy
    /// carries the original headers plus `Date` and `Signature`.
    pub fn sign_request<B: AsRef<[u8]> + Clone>(
        &self,
        request: &Request<B>,
    ) -> Result<SignedRequest<B>, SignatureError> {
        let method = Verb::try_from(request.method())?;
        let url = request_url(request);
        let date = header_value(request.headers(), &DATE)
            .map_err(|_| SignatureError::MalformedDate("<non-ASCII>".to_string()))?
            .map(parse_date)
            .transpose()?;

        let mut components = RequestComponents::new()
            .method(method)
            .body(request.body().as_ref());
        if let Some(url) = url.as_ref() {
            components = components.url(url);
        }
        if let Some(date) = date {
            components = components.date(date);
        }

        let SignedHeaders {
            headers,
            signed_string,
        } = self.sign_components(&components, Some(request.headers().clone()))?;

        let mut signed = Request::new(request.body().clone());
        *signed.method_mut() = request.method().clone();
        *signed.uri_mut() = request.uri().clone();
        *signed.version_mut() = request.version();
        *signed.headers_mut() = headers;

        Ok(SignedRequest {
            request: signed,
            signed_string,
        })
    }

    /// Signs discrete components.
    ///
    /// `method` and `url` are required. `date` defaults to now and `body` to
    /// empty. `Date` and `Signature` are written into `headers`, or into a
    /// fresh map when none is given.
    pub fn sign_components(
        &self,
        components: &RequestComponents<'_>,
        headers: Option<HeaderMap>,
    ) -> Result<SignedHeaders, SignatureError> {
        let mut missing = Vec::new();
        if components.method.is_none() {
            missing.push("method");
        }
        if components.url.is_none() {
            missing.push("url");
        }
        let (Some(method), Some(url)) = (components.method, components.url) else {
            return Err(SignatureError::MissingRequiredParameters(missing));
        };

        let date = components.date.unwrap_or_else(Utc::now);
        let body = components.body.unwrap_or_default();

        let canonical = CanonicalRequest::from_url(method, url, date, body)?;
        let signed_string = canonical.signed_string();
        let signature = self.key.sign(signed_string.as_bytes())?;
        let parameters = SignatureParameters::new(self.key_id.as_str(), signature);

        let mut headers = headers.unwrap_or_default();
        headers.insert(DATE, HeaderValue::from_str(&format_date(&date))?);
        headers.insert(SIGNATURE, HeaderValue::from_str(&parameters.to_string())?);

        tracing::debug!(
            key_id = %self.key_id,
            method = %canonical.method,
            host = %canonical.host,
            path = %canonical.path,
            "Signed request"
        );

        Ok(SignedHeaders {
            headers,
            signed_string,
        })
    }
}
