//!
//! # Rate Limiting
//!
//! A fixed-window limiter keyed by the peer address of the connection, and
//! the actix-web middleware that applies it to state-changing requests.
//! Forwarding headers are client-controlled and are never used as the key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    Error,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::config::Config;
use crate::error::AppError;
use crate::log_context;
use crate::logger::Logger;

/// Windows are pruned once the table grows past this many clients, at most
/// once per window.
const PRUNE_THRESHOLD: usize = 10_000;

/// Key used when the connection has no peer address (e.g. a Unix socket).
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Allows at most `max` hits per key within each `window`.
#[derive(Debug)]
pub struct RateLimiter {
    max: u32,
    window: Duration,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    windows: HashMap<String, Window>,
    last_prune: Option<Instant>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            state: Mutex::new(State {
                windows: HashMap::new(),
                last_prune: None,
            }),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.rate_limit_max,
            Duration::from_millis(config.rate_limit_window_ms),
        )
    }

    /// Records a hit for `key` at `now`. Fails once the key has used up its
    /// allowance for the current window.
    pub fn check(&self, key: &str, now: Instant) -> Result<(), AppError> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let window = self.window;
        let prune_due = state
            .last_prune
            .map_or(true, |last| now.duration_since(last) >= window);
        if state.windows.len() > PRUNE_THRESHOLD && prune_due {
            state
                .windows
                .retain(|_, w| now.duration_since(w.started) < window);
            state.last_prune = Some(now);
        }

        let entry = state.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.max {
            return Err(AppError::rate_limited());
        }
        entry.count += 1;
        Ok(())
    }
}

/// Middleware applying a [`RateLimiter`] to every request that is not
/// `GET`, `HEAD` or `OPTIONS`. Rejected requests get a 429 response.
pub struct RateLimit {
    limiter: Arc<RateLimiter>,
    logger: Logger,
}

impl RateLimit {
    pub fn new(limiter: Arc<RateLimiter>, logger: Logger) -> Self {
        Self { limiter, logger }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service,
            limiter: Arc::clone(&self.limiter),
            logger: self.logger.clone(),
        }))
    }
}

/// The connection's peer IP. Ports are dropped so that one host shares a
/// single allowance across connections.
fn client_key(req: &ServiceRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

pub struct RateLimitMiddleware<S> {
    service: S,
    limiter: Arc<RateLimiter>,
    logger: Logger,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let exempt = [Method::GET, Method::HEAD, Method::OPTIONS].contains(req.method());

        if !exempt {
            let client = client_key(&req);

            if let Err(app_err) = self.limiter.check(&client, Instant::now()) {
                self.logger.warn(
                    "Rate limit exceeded",
                    Some(log_context! {
                        "client" => client,
                        "path" => req.path(),
                    }),
                );
                let response = req.error_response(app_err).map_into_right_body();
                return Box::pin(async move { Ok(response) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_max_per_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.check("10.0.0.1", start).is_ok());
        assert!(limiter.check("10.0.0.1", start).is_ok());
        match limiter.check("10.0.0.1", start) {
            Err(AppError::RateLimit(msg)) => assert_eq!(msg, "Too many requests"),
            other => panic!("expected rate limit error, got {:?}", other),
        }

        // Other clients have their own allowance.
        assert!(limiter.check("10.0.0.2", start).is_ok());
    }

    #[test]
    fn test_client_key_ignores_forwarding_headers() {
        use actix_web::test::TestRequest;

        let req = TestRequest::post()
            .peer_addr("203.0.113.7:40000".parse().unwrap())
            .insert_header(("X-Forwarded-For", "10.0.0.1"))
            .insert_header(("Forwarded", "for=10.0.0.2"))
            .to_srv_request();
        assert_eq!(client_key(&req), "203.0.113.7");

        let req = TestRequest::post().to_srv_request();
        assert_eq!(client_key(&req), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_prunes_expired_windows() {
        let limiter = RateLimiter::new(1, Duration::from_secs(1));
        let start = Instant::now();
        for i in 0..=PRUNE_THRESHOLD {
            limiter.check(&format!("client-{}", i), start).unwrap();
        }

        let later = start + Duration::from_secs(2);
        limiter.check("fresh", later).unwrap();
        let state = limiter.state.lock().unwrap();
        assert_eq!(state.windows.len(), 1);
        assert_eq!(state.last_prune, Some(later));
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_millis(500));
        let start = Instant::now();

        assert!(limiter.check("client", start).is_ok());
        assert!(limiter.check("client", start + Duration::from_millis(499)).is_err());
        assert!(limiter.check("client", start + Duration::from_millis(500)).is_ok());
    }
}
