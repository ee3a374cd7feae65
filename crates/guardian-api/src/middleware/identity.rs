//! Caller identity middleware.
//!
//! Guardian sits behind an auth layer that has already authenticated the
//! user. That layer names the user in `x-guardian-user`; when a shared
//! secret is configured it must also sign the claim:
//!
//! - `x-guardian-signature`: hex HMAC-SHA256 of `user_id|issued_at`
//! - `x-guardian-issued-at`: RFC 3339 issue time
//!
//! Without a shared secret the user header is trusted as-is.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use guardian_core::{TokenError, UserToken};
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub const USER_HEADER: &str = "x-guardian-user";
pub const SIGNATURE_HEADER: &str = "x-guardian-signature";
pub const ISSUED_AT_HEADER: &str = "x-guardian-issued-at";

/// Verified caller, added to request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: Uuid,
}

pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_caller(request.headers(), &state) {
        Ok(caller) => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

fn resolve_caller(headers: &HeaderMap, state: &AppState) -> Result<CallerIdentity, ApiError> {
    let user = header(headers, USER_HEADER);
    if user.is_empty() {
        return Err(ApiError::Unauthorized {
            code: "CALLER_IDENTITY_REQUIRED",
            message: format!("missing {} header", USER_HEADER),
        });
    }

    let user_id = Uuid::parse_str(user).map_err(|_| ApiError::Unauthorized {
        code: "INVALID_CALLER_IDENTITY",
        message: format!("{} is not a valid user id", USER_HEADER),
    })?;

    let Some(secret) = state.auth.shared_secret.as_deref().filter(|s| !s.is_empty()) else {
        return Ok(CallerIdentity { user_id });
    };

    let token = UserToken {
        user_id,
        signature: header(headers, SIGNATURE_HEADER).to_string(),
        issued_at: header(headers, ISSUED_AT_HEADER).to_string(),
    };

    token
        .validate(secret, Some(state.auth.token_ttl_secs))
        .map_err(|err| {
            warn!(user_id = %user_id, error = %err, "rejected caller token");
            let code = match err {
                TokenError::Expired(_) => "EXPIRED_CALLER_TOKEN",
                TokenError::Invalid(_) => "INVALID_CALLER_TOKEN",
            };
            ApiError::Unauthorized {
                code,
                message: err.to_string(),
            }
        })?;

    Ok(CallerIdentity { user_id })
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
