use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::SignatureError;

use super::date::format_date;
use super::digest::digest_base64;

/// HTTP methods a federation request may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Patch => "PATCH",
            Verb::Options => "OPTIONS",
            Verb::Head => "HEAD",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [Verb; 7] = [
            Verb::Get,
            Verb::Post,
            Verb::Put,
            Verb::Delete,
            Verb::Patch,
            Verb::Options,
            Verb::Head,
        ];
        ALL.into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| SignatureError::UnsupportedMethod(s.to_string()))
    }
}

impl TryFrom<&http::Method> for Verb {
    type Error = SignatureError;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

/// Renders the string that is actually signed.
///
/// The layout is the interoperability contract between peers and must stay
/// byte-for-byte stable: four `\n`-terminated lines, method lower-cased,
/// everything else verbatim.
pub fn canonical_string(method: &str, path: &str, host: &str, date: &str, digest: &str) -> String {
    format!(
        "(request-target): {} {}\nhost: {}\ndate: {}\ndigest: SHA-256={}\n",
        method.to_ascii_lowercase(),
        path,
        host,
        date,
        digest
    )
}

/// The signed view of a single request.
#[derive(Debug, Clone)]
pub struct CanonicalRequest<'a> {
    pub method: Verb,
    pub path: &'a str,
    pub host: String,
    pub date: DateTime<Utc>,
    pub body: &'a [u8],
}

impl<'a> CanonicalRequest<'a> {
    /// Takes path and host from a parsed URL. The host keeps an explicit
    /// non-default port, the path drops the query string.
    pub fn from_url(
        method: Verb,
        url: &'a Url,
        date: DateTime<Utc>,
        body: &'a [u8],
    ) -> Result<Self, SignatureError> {
        let host = url
            .host_str()
            .map(|host| match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            })
            .ok_or(SignatureError::MissingRequiredParameters(vec!["url"]))?;

        Ok(Self {
            method,
            path: url.path(),
            host,
            date,
            body,
        })
    }

    pub fn signed_string(&self) -> String {
        canonical_string(
            self.method.as_str(),
            self.path,
            &self.host,
            &format_date(&self.date),
            &digest_base64(self.body),
        )
    }
}
