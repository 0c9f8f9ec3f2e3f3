//! Fixed-window request limits, counted per client IP and per signed-in user.
//!
//! Each request is charged to every identity it carries; it is rejected as
//! soon as one of them has used up its bucket for the current window.

use crate::auth::{SESSION_COOKIE, parse_session_cookie_value};
use crate::config::RateLimitConfig;
use rocket::http::{Method, Status};
use rocket::request::{FromRequest, Outcome, Request};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{RefOr, Response as OpenApiResponse, Responses};
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Bucket {
    Read,
    Mutation,
    /// Login and registration, limited separately from everything else.
    Auth,
}

impl Bucket {
    fn for_method(method: Method) -> Self {
        if matches!(method, Method::Post | Method::Put | Method::Patch | Method::Delete) {
            Bucket::Mutation
        } else {
            Bucket::Read
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Identity {
    Ip(IpAddr),
    User(Uuid),
    /// Requests without a known peer address share one counter.
    Unknown,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u32,
}

impl Window {
    fn current(&mut self, now: Instant, length: Duration) -> &mut Self {
        if now.duration_since(self.started) >= length {
            self.started = now;
            self.hits = 0;
        }
        self
    }

    fn retry_after(&self, now: Instant, length: Duration) -> Duration {
        length.saturating_sub(now.duration_since(self.started))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct RateLimiterStats {
    pub tracked_windows: usize,
    pub window_seconds: u64,
}

#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    window: Duration,
    windows: Mutex<HashMap<(Identity, Bucket), Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let window = Duration::from_secs(config.window_seconds.max(1));
        Self {
            config,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn limit(&self, bucket: Bucket) -> u32 {
        match bucket {
            Bucket::Read => self.config.read_limit,
            Bucket::Mutation => self.config.mutation_limit,
            Bucket::Auth => self.config.auth_limit,
        }
    }

    /// Charges one request to every identity, or returns how long the
    /// caller has to wait. Rejected requests are not counted.
    async fn charge(&self, identities: &[Identity], bucket: Bucket) -> Result<(), Duration> {
        let now = Instant::now();
        let limit = self.limit(bucket);
        let mut windows = self.windows.lock().await;

        let wait = identities
            .iter()
            .filter_map(|identity| {
                let window = windows
                    .entry((*identity, bucket))
                    .or_insert(Window { started: now, hits: 0 })
                    .current(now, self.window);
                (window.hits >= limit).then(|| window.retry_after(now, self.window))
            })
            .max();

        if let Some(wait) = wait {
            return Err(wait);
        }

        for identity in identities {
            if let Some(window) = windows.get_mut(&(*identity, bucket)) {
                window.hits += 1;
            }
        }
        Ok(())
    }

    async fn purge_stale(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, window| now.duration_since(window.started) < self.window);
        before - windows.len()
    }

    pub async fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            tracked_windows: self.windows.lock().await.len(),
            window_seconds: self.window.as_secs(),
        }
    }

    pub fn spawn_cleanup_task(self: Arc<Self>) {
        let interval = Duration::from_secs(self.config.cleanup_interval_seconds.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let purged = self.purge_stale().await;
                if purged > 0 {
                    debug!(purged, "dropped stale rate limit windows");
                }
            }
        });
    }
}

/// Guard for regular routes: GETs draw from the read bucket, writes from the
/// mutation bucket.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RateLimit;

/// Guard for login and registration.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AuthRateLimit;

/// Seconds until the limited caller may retry, read by the 429 catcher.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RateLimitRetryAfter(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RateLimitError {
    TooManyRequests,
    MissingClientIp,
}

fn identities(request: &Request<'_>) -> Vec<Identity> {
    let mut identities = Vec::with_capacity(2);
    if let Some(ip) = request.client_ip() {
        identities.push(Identity::Ip(ip));
    }
    if let Some(cookie) = request.cookies().get_private(SESSION_COOKIE)
        && let Some((_, user_id)) = parse_session_cookie_value(cookie.value())
    {
        identities.push(Identity::User(user_id));
    }
    identities
}

async fn enforce(request: &Request<'_>, bucket: Bucket) -> Outcome<(), RateLimitError> {
    let Some(limiter) = request.rocket().state::<Arc<RateLimiter>>() else {
        return Outcome::Success(());
    };

    let mut identities = identities(request);
    if !identities.iter().any(|identity| matches!(identity, Identity::Ip(_))) {
        if limiter.config.require_client_ip {
            warn!(method = %request.method(), uri = %request.uri(), "rejecting request without client ip");
            return Outcome::Error((Status::BadRequest, RateLimitError::MissingClientIp));
        }
        identities.push(Identity::Unknown);
    }

    match limiter.charge(&identities, bucket).await {
        Ok(()) => Outcome::Success(()),
        Err(wait) => {
            let retry_after = wait.as_secs().max(1);
            request.local_cache(|| Some(RateLimitRetryAfter(retry_after)));
            warn!(?bucket, retry_after, method = %request.method(), uri = %request.uri(), "rate limit exceeded");
            Outcome::Error((Status::TooManyRequests, RateLimitError::TooManyRequests))
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RateLimit {
    type Error = RateLimitError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        enforce(request, Bucket::for_method(request.method())).await.map(|_| RateLimit)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthRateLimit {
    type Error = RateLimitError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        enforce(request, Bucket::Auth).await.map(|_| AuthRateLimit)
    }
}

fn limited_responses() -> rocket_okapi::Result<Responses> {
    let mut responses = Responses::default();
    responses.responses.insert(
        "429".to_string(),
        RefOr::Object(OpenApiResponse {
            description: "Too many requests, see the Retry-After header".to_string(),
            ..Default::default()
        }),
    );
    Ok(responses)
}

impl<'a> OpenApiFromRequest<'a> for RateLimit {
    fn from_request_input(_gen: &mut OpenApiGenerator, _name: String, _required: bool) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }

    fn get_responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        limited_responses()
    }
}

impl<'a> OpenApiFromRequest<'a> for AuthRateLimit {
    fn from_request_input(_gen: &mut OpenApiGenerator, _name: String, _required: bool) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }

    fn get_responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        limited_responses()
    }
}
