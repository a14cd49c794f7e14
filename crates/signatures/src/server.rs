use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::signing::Verifier;

/// Inbound bodies are buffered for hashing; anything larger is refused.
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<Verifier>,
}

impl AppState {
    pub fn new(verifier: Verifier) -> Self {
        Self {
            verifier: Arc::new(verifier),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(|| async move { (StatusCode::OK, "Ok").into_response() }))
        .route(
            "/inbox",
            post(inbox_handler).route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_signature,
            )),
        )
        .with_state(state)
}

pub async fn run(host: String, port: u16, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("binding {host}:{port}"))?;

    tracing::info!(address = %listener.local_addr()?, "Inbox listening");

    axum::serve(listener, router(state))
        .await
        .context("serving inbox")?;

    Ok(())
}

/// Rejects requests whose `Signature` does not verify.
///
/// Structural problems answer 400, a signature mismatch 401.
pub async fn require_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_SIZE).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, path = %parts.uri.path(), "Failed to buffer request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let buffered = axum::http::Request::from_parts(parts, bytes);
    match state.verifier.validate_request(&buffered) {
        Ok(true) => {
            let (parts, bytes) = buffered.into_parts();
            next.run(Request::from_parts(parts, Body::from(bytes))).await
        }
        Ok(false) => {
            tracing::warn!(path = %buffered.uri().path(), "Rejected request with invalid signature");
            (StatusCode::UNAUTHORIZED, "Invalid signature").into_response()
        }
        Err(err) => {
            tracing::warn!(error = %err, path = %buffered.uri().path(), "Rejected malformed signed request");
            err.into_response()
        }
    }
}

async fn inbox_handler(body: Bytes) -> impl IntoResponse {
    tracing::info!(bytes = body.len(), "Accepted signed delivery");
    (StatusCode::ACCEPTED, "Accepted")
}
