//! Prompt send endpoint.
//!
//! `POST /send` runs the caller's prompt through the admission pipeline.
//! Rejected prompts get `{"status": false}`; admitted requests are proxied
//! to the target model and the upstream response is streamed back as-is.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
    Extension, Json,
};
use futures::TryStreamExt;
use guardian_core::{PluginRequest, PluginResponse, SendRequest};
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::middleware::CallerIdentity;
use crate::state::AppState;

/// POST /send
pub async fn send(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    // Decoded from a borrow: the raw bytes are forwarded untouched.
    let send: SendRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(user_id = %caller.user_id, error = %e, "malformed send request");
        ApiError::BadRequest(e.to_string())
    })?;

    let target = state
        .targets
        .target_model(send.target_id)
        .await
        .map_err(|e| {
            error!(target_id = %send.target_id, error = %e, "error in resolving the target LLM");
            ApiError::Internal
        })?;

    let request = PluginRequest::from_send(caller.user_id, &send);

    let approved = state.prompts.process_prompt(&request).await.map_err(|e| {
        error!(user_id = %caller.user_id, error = %e, "prompt evaluation failed");
        ApiError::Internal
    })?;

    if !approved {
        info!(user_id = %caller.user_id, target = %target.name, "prompt rejected");
        return Ok(Json(PluginResponse {
            status: false,
            score: None,
        })
        .into_response());
    }

    let upstream = state
        .forwarder
        .forward(method, &headers, body, &target)
        .await
        .map_err(|e| {
            error!(target = %target.name, address = %target.address, error = %e, "failed to forward to target");
            ApiError::Internal
        })?;

    info!(
        user_id = %caller.user_id,
        target = %target.name,
        status = upstream.status().as_u16(),
        "prompt forwarded"
    );

    Ok(relay(upstream))
}

/// Copy status and headers, then stream the body. Errors after the head is
/// sent can only be logged.
fn relay(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let headers = upstream.headers().clone();

    let stream = upstream
        .bytes_stream()
        .inspect_err(|e| error!(error = %e, "target response stream failed"));

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
