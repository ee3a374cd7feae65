//! Per-user request quota on `/send`.
//!
//! Each user may spend `request_limit` requests per `interval_secs`;
//! the budget refills continuously. Must run after
//! [`identity_middleware`](super::identity_middleware).

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::debug;
use uuid::Uuid;

use super::identity::CallerIdentity;
use crate::config::RateLimitConfig;
use crate::error::ApiError;
use crate::state::AppState;

pub type UserRateLimiter = DefaultKeyedRateLimiter<Uuid>;

/// `None` when rate limiting is disabled.
pub fn build_limiter(config: &RateLimitConfig) -> Option<Arc<UserRateLimiter>> {
    if !config.enabled {
        return None;
    }

    let burst = NonZeroU32::new(config.request_limit)?;
    let period = Duration::from_secs(config.interval_secs) / burst.get();
    let quota = Quota::with_period(period)?.allow_burst(burst);

    Some(Arc::new(RateLimiter::keyed(quota)))
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (Some(limiter), Some(caller)) = (
        state.rate_limiter.as_ref(),
        request.extensions().get::<CallerIdentity>().copied(),
    ) else {
        return next.run(request).await;
    };

    if limiter.check_key(&caller.user_id).is_err() {
        debug!(user_id = %caller.user_id, "rate limit exceeded");
        metrics::counter!("guardian_rate_limited_total").increment(1);
        return ApiError::TooManyRequests.into_response();
    }

    next.run(request).await
}
