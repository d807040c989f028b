use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::AsyncCommands;

use super::client_ip;
use crate::config::Config;
use crate::error::AppError;

/// Fixed-window request counter per client IP, stored in Redis.
#[derive(Clone)]
pub struct RateLimiter {
    redis: redis::Client,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(redis: redis::Client, window: Duration, max_requests: u32) -> Self {
        Self {
            redis,
            window,
            max_requests,
        }
    }

    /// `None` when `REDIS_URL` is not configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, redis::RedisError> {
        let Some(url) = config.redis_url.as_deref() else {
            return Ok(None);
        };
        Ok(Some(Self::new(
            redis::Client::open(url)?,
            config.rate_limit_window(),
            config.rate_limit_requests,
        )))
    }

    /// Increments the counter for `ip` and returns the new value.
    async fn hit(&self, ip: &str) -> redis::RedisResult<u32> {
        let key = format!("rate_limit:{}", ip);
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let count: u32 = conn.incr(&key, 1).await?;
        if count == 1 {
            let _: () = conn.expire(&key, self.window.as_secs() as i64).await?;
        }
        Ok(count)
    }

    pub async fn check(&self, ip: &str) -> Result<(), AppError> {
        match self.hit(ip).await {
            Ok(count) if count > self.max_requests => {
                tracing::warn!(ip, count, "Rate limit exceeded");
                Err(AppError::RateLimited(format!(
                    "Слишком много запросов, повторите через {} секунд",
                    self.window.as_secs()
                )))
            }
            Ok(_) => Ok(()),
            Err(e) => {
                // Redis being down must not take the API down with it
                tracing::warn!(ip, "Rate limiter unavailable, allowing request: {}", e);
                Ok(())
            }
        }
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(
        req.headers(),
        req.extensions().get::<ConnectInfo<SocketAddr>>(),
    );
    tracing::debug!(ip = %ip, "Checking rate limit");

    match limiter.check(&ip).await {
        Ok(()) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}
