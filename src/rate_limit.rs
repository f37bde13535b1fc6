/// Rate Limiting System
use crate::{
    api::middleware::extract_bearer_token,
    config::RateLimitConfig,
    context::AppContext,
    error::{AppError, AppResult},
};
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc};

type DirectLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;

fn non_zero(value: u32, fallback: NonZeroU32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(fallback)
}

/// Rate limiter manager
///
/// Anonymous traffic (login, registration, review links) gets a fifth of the
/// configured rate; bearer-token traffic gets the full rate.
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    limit: u32,
    authenticated: Arc<DirectLimiter>,
    anonymous: Arc<DirectLimiter>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let rps = non_zero(config.requests_per_second, NonZeroU32::MIN);
        let burst = non_zero(config.burst_size, rps);

        let auth_quota = Quota::per_second(rps).allow_burst(burst);
        let anon_quota = Quota::per_second(non_zero(rps.get() / 5, NonZeroU32::MIN))
            .allow_burst(non_zero(burst.get() / 5, NonZeroU32::MIN));

        Self {
            enabled: config.enabled,
            limit: burst.get(),
            authenticated: Arc::new(GovernorLimiter::direct(auth_quota)),
            anonymous: Arc::new(GovernorLimiter::direct(anon_quota)),
        }
    }

    fn check(limiter: &DirectLimiter) -> AppResult<()> {
        limiter
            .check()
            .map_err(|_| AppError::RateLimitExceeded {
                retry_after: std::time::Duration::from_secs(1),
            })
    }

    /// Check rate limit for a request carrying a bearer token
    pub fn check_authenticated(&self) -> AppResult<()> {
        if !self.enabled {
            return Ok(());
        }
        Self::check(&self.authenticated)
    }

    /// Check rate limit for an anonymous request
    pub fn check_anonymous(&self) -> AppResult<()> {
        if !self.enabled {
            return Ok(());
        }
        Self::check(&self.anonymous)
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Only a well-formed bearer header earns the full-rate bucket
    let has_bearer = extract_bearer_token(request.headers()).is_some();

    let result = if has_bearer {
        ctx.rate_limiter.check_authenticated()
    } else {
        ctx.rate_limiter.check_anonymous()
    };

    if let Err(e) = result {
        tracing::warn!(
            path = %request.uri().path(),
            authenticated = has_bearer,
            "rate limit exceeded"
        );
        return Err(e);
    }

    let mut response = next.run(request).await;
    response.headers_mut().insert(
        "X-RateLimit-Limit",
        HeaderValue::from(ctx.rate_limiter.limit),
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool, rps: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            enabled,
            requests_per_second: rps,
            burst_size: burst,
        }
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(&config(true, 50, 100));
        assert!(limiter.check_authenticated().is_ok());
        assert!(limiter.check_anonymous().is_ok());
    }

    #[test]
    fn test_burst_limit() {
        let limiter = RateLimiter::new(&config(true, 10, 5));

        for _ in 0..5 {
            assert!(limiter.check_authenticated().is_ok());
        }
        assert!(matches!(
            limiter.check_authenticated(),
            Err(AppError::RateLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_anonymous_gets_smaller_burst() {
        let limiter = RateLimiter::new(&config(true, 10, 10));

        assert!(limiter.check_anonymous().is_ok());
        assert!(limiter.check_anonymous().is_ok());
        assert!(limiter.check_anonymous().is_err());
    }

    #[test]
    fn test_disabled_limiter_never_refuses() {
        let limiter = RateLimiter::new(&config(false, 1, 1));
        for _ in 0..20 {
            assert!(limiter.check_anonymous().is_ok());
        }
    }
}
