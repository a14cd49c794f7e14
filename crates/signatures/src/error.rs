use axum::http::StatusCode;
use axum_core::response::{IntoResponse as AxumCoreIntoResponse, Response};

/// Structural failures of the signing protocol.
///
/// A signature that simply does not match is not represented here: the
/// verifier reports it as `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("Unsupported environment: {0}")]
    UnsupportedEnvironment(String),
    #[error("Malformed key: {0}")]
    MalformedKey(String),
    #[error("Headers are missing in request: {}", .0.join(", "))]
    MissingHeaders(Vec<&'static str>),
    #[error("Missing or empty required parameters: {}", .0.join(", "))]
    MissingRequiredParameters(Vec<&'static str>),
    #[error("Invalid Signature header: {0}")]
    MalformedSignatureHeader(String),
    #[error("Unsupported Signature parameters: {0}")]
    UnsupportedSignatureParameters(String),
    #[error("Invalid Date value: {0:?}")]
    MalformedDate(String),
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
    #[error(transparent)]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),
    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Trait implementation to convert this error into an axum http response
impl AxumCoreIntoResponse for SignatureError {
    fn into_response(self) -> Response {
        match self {
            bad_request_error @ (SignatureError::MissingHeaders(_)
            | SignatureError::MissingRequiredParameters(_)
            | SignatureError::MalformedSignatureHeader(_)
            | SignatureError::UnsupportedSignatureParameters(_)
            | SignatureError::MalformedDate(_)
            | SignatureError::UnsupportedMethod(_)) => {
                (StatusCode::BAD_REQUEST, bad_request_error.to_string()).into_response()
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something wrong happened.",
            )
                .into_response(),
        }
    }
}
