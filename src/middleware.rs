pub mod csrf;
pub mod rate_limit;

use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::{Data, Response};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

const MAX_REQUEST_ID_LEN: usize = 64;
const MAX_USER_AGENT_CHARS: usize = 512;

/// Headers set on every response.
const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("X-Content-Type-Options", "nosniff"),
    ("X-Frame-Options", "DENY"),
    ("Referrer-Policy", "strict-origin-when-cross-origin"),
    ("Permissions-Policy", "camera=(), microphone=(), geolocation=()"),
    ("Content-Security-Policy", "frame-ancestors 'none'"),
    ("Strict-Transport-Security", "max-age=31536000; includeSubDomains"),
];

/// Ties together the log lines, error body and `X-Request-Id` header of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Keeps an id forwarded by a proxy if it is short and plain ASCII,
    /// otherwise generates a fresh one.
    fn from_upstream(forwarded: Option<&str>) -> Self {
        forwarded
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
            .filter(|id| id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'))
            .map(|id| Self(id.to_string()))
            .unwrap_or_else(Self::generate)
    }

    /// Id assigned to `request` by [`RequestTracing`].
    pub fn of<'a>(request: &'a Request<'_>) -> Option<&'a RequestId> {
        request.local_cache(|| None::<RequestId>).as_ref()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequestId {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(RequestId::of(request).cloned().unwrap_or_else(RequestId::generate))
    }
}

struct ReceivedAt(Instant);

/// Tags each request with an id, logs it on the way in and out with its
/// latency, and stamps the security headers on the response.
pub struct RequestTracing;

#[rocket::async_trait]
impl Fairing for RequestTracing {
    fn info(&self) -> Info {
        Info {
            name: "Request Tracing",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        let request_id = RequestId::from_upstream(request.headers().get_one(REQUEST_ID_HEADER));
        info!(request_id = %request_id.0, method = %request.method(), uri = %request.uri(), "incoming request");

        request.local_cache(|| ReceivedAt(Instant::now()));
        request.local_cache(|| Some(request_id));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let request_id = RequestId::of(request).map_or("unknown", |id| id.0.as_str());
        let latency_ms = request.local_cache(|| ReceivedAt(Instant::now())).0.elapsed().as_millis() as u64;
        stamp_headers(response, request_id);

        let status = response.status();
        if status.class().is_client_error() || status.class().is_server_error() {
            warn!(request_id, method = %request.method(), uri = %request.uri(), status = status.code, latency_ms, "request completed with error");
        } else {
            info!(request_id, method = %request.method(), uri = %request.uri(), status = status.code, latency_ms, "request completed");
        }
    }
}

fn stamp_headers(response: &mut Response<'_>, request_id: &str) {
    response.set_header(Header::new(REQUEST_ID_HEADER, request_id.to_string()));
    for (name, value) in SECURITY_HEADERS {
        response.set_header(Header::new(*name, *value));
    }
    if !response.headers().contains("Cache-Control") {
        response.set_header(Header::new("Cache-Control", "no-store"));
    }
}

/// `User-Agent` as stored with sessions and audit records: trimmed, capped
/// in length, `None` when missing or blank.
pub struct UserAgent(pub Option<String>);

impl UserAgent {
    fn from_header(value: Option<&str>) -> Self {
        let agent = value
            .map(str::trim)
            .filter(|agent| !agent.is_empty())
            .map(|agent| agent.chars().take(MAX_USER_AGENT_CHARS).collect());
        Self(agent)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for UserAgent {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, ()> {
        Outcome::Success(UserAgent::from_header(request.headers().get_one("User-Agent")))
    }
}

/// Client address as Rocket resolves it, honouring the configured `ip_header`.
pub struct ClientIp(pub Option<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, ()> {
        Outcome::Success(ClientIp(request.client_ip().map(|ip| ip.to_string())))
    }
}

// Neither guard reads anything a client has to document.
macro_rules! undocumented_guard {
    ($($guard:ty),+) => {
        $(
            impl<'a> OpenApiFromRequest<'a> for $guard {
                fn from_request_input(_gen: &mut OpenApiGenerator, _name: String, _required: bool) -> rocket_okapi::Result<RequestHeaderInput> {
                    Ok(RequestHeaderInput::None)
                }
            }
        )+
    };
}

undocumented_guard!(UserAgent, ClientIp);
