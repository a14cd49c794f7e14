use chrono::{DateTime, Utc};
use http::header::{HOST, HeaderMap, HeaderName, ToStrError};
use http::Request;
use url::Url;

use super::canonical::Verb;

/// The `Signature` request header.
pub const SIGNATURE: HeaderName = HeaderName::from_static("signature");

/// Discrete inputs to `sign_components` / `validate_components`.
///
/// Every field is optional so that callers learn exactly which ones they
/// forgot. An empty body is present; only `None` counts as missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestComponents<'a> {
    pub method: Option<Verb>,
    pub url: Option<&'a Url>,
    pub date: Option<DateTime<Utc>>,
    pub body: Option<&'a [u8]>,
}

impl<'a> RequestComponents<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Verb) -> Self {
        self.method = Some(method);
        self
    }

    pub fn url(mut self, url: &'a Url) -> Self {
        self.url = Some(url);
        self
    }

    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn body(mut self, body: &'a [u8]) -> Self {
        self.body = Some(body);
        self
    }
}

/// Absolute URL of a request.
///
/// Absolute-form URIs are used as they are. Origin-form URIs, which is what
/// a server sees, are resolved against the `Host` header over https. `None`
/// when neither yields a URL.
pub fn request_url<B>(request: &Request<B>) -> Option<Url> {
    let uri = request.uri();
    if uri.scheme().is_some() && uri.authority().is_some() {
        return Url::parse(&uri.to_string()).ok();
    }

    let host = request
        .headers()
        .get(HOST)
        .and_then(|host| host.to_str().ok())
        .filter(|host| !host.is_empty())?;
    let path = uri.path_and_query().map_or("/", |path| path.as_str());
    Url::parse(&format!("https://{host}{path}")).ok()
}

/// Value of a header, `None` when absent or empty.
pub(crate) fn header_value<'h>(
    headers: &'h HeaderMap,
    name: &HeaderName,
) -> Result<Option<&'h str>, ToStrError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => Ok(Some(value.to_str()?).filter(|value| !value.is_empty())),
    }
}
