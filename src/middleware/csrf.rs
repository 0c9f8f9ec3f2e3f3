//! Double-submit CSRF protection.
//!
//! `GET /csrf` sets a random token in a script-readable cookie and returns it
//! in the body; mutating requests must echo it in the `X-CSRF-Token` header.

use crate::config::CsrfConfig;
use rand::distr::{Alphanumeric, SampleString};
use rocket::http::{Cookie, CookieJar, Method, SameSite, Status};
use rocket::request::{FromRequest, Outcome, Request};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{Object, Parameter, ParameterValue, RefOr, Response as OpenApiResponse, Responses};
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use sha2::{Digest, Sha256};
use tracing::warn;

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "X-CSRF-Token";
const TOKEN_LENGTH: usize = 32;

pub fn generate_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), TOKEN_LENGTH)
}

pub fn build_csrf_cookie(token: String) -> Cookie<'static> {
    Cookie::build((CSRF_COOKIE, token))
        .path("/")
        .same_site(SameSite::Strict)
        .http_only(false)
        .build()
}

/// Issues a fresh token and stores it in the cookie jar.
pub fn issue_token(cookies: &CookieJar<'_>) -> String {
    let token = generate_token();
    cookies.add(build_csrf_cookie(token.clone()));
    token
}

/// Compares digests so the comparison does not depend on where the inputs
/// first differ.
pub(crate) fn tokens_match(cookie_token: &str, header_token: &str) -> bool {
    if cookie_token.is_empty() {
        return false;
    }

    let expected = Sha256::digest(cookie_token.as_bytes());
    let provided = Sha256::digest(header_token.as_bytes());
    expected.iter().zip(provided.iter()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

fn is_safe_method(method: Method) -> bool {
    matches!(method, Method::Get | Method::Head | Method::Options | Method::Trace)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CsrfError {
    MissingToken,
    TokenMismatch,
}

impl CsrfError {
    pub(crate) fn message(self) -> &'static str {
        match self {
            CsrfError::MissingToken => "CSRF token missing",
            CsrfError::TokenMismatch => "CSRF token invalid",
        }
    }
}

/// Guard for state-changing routes; rejects with 403 unless the header
/// matches the cookie.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CsrfProtected;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CsrfProtected {
    type Error = CsrfError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let enabled = request.rocket().state::<CsrfConfig>().is_none_or(|config| config.enabled);
        if !enabled || is_safe_method(request.method()) {
            return Outcome::Success(CsrfProtected);
        }

        let cookie_token = request.cookies().get(CSRF_COOKIE).map(|cookie| cookie.value().to_string());
        let header_token = request.headers().get_one(CSRF_HEADER);

        let result = match (cookie_token, header_token) {
            (Some(cookie_token), Some(header_token)) if tokens_match(&cookie_token, header_token) => Ok(()),
            (Some(_), Some(_)) => Err(CsrfError::TokenMismatch),
            _ => Err(CsrfError::MissingToken),
        };

        match result {
            Ok(()) => Outcome::Success(CsrfProtected),
            Err(error) => {
                warn!(
                    method = %request.method(),
                    uri = %request.uri(),
                    reason = ?error,
                    "csrf validation failed"
                );
                request.local_cache(|| Some(error));
                Outcome::Error((Status::Forbidden, error))
            }
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for CsrfProtected {
    fn from_request_input(_gen: &mut OpenApiGenerator, _name: String, _required: bool) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::Parameter(Parameter {
            name: CSRF_HEADER.to_string(),
            location: "header".to_string(),
            description: Some("Token returned by GET /csrf, matching the csrf_token cookie.".to_string()),
            required: true,
            deprecated: false,
            allow_empty_value: false,
            value: ParameterValue::Schema {
                style: None,
                explode: None,
                allow_reserved: false,
                schema: schemars::schema_for!(String).schema,
                example: None,
                examples: None,
            },
            extensions: Object::default(),
        }))
    }

    fn get_responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        let mut responses = Responses::default();
        responses.responses.insert(
            "403".to_string(),
            RefOr::Object(OpenApiResponse {
                description: "Forbidden - missing or invalid CSRF token".to_string(),
                ..Default::default()
            }),
        );
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::error::forbidden;
    use rocket::http::{Header, Status};
    use rocket::local::asynchronous::Client;
    use rocket::{catchers, get, post, routes};

    #[get("/token")]
    fn token(cookies: &CookieJar<'_>) -> String {
        issue_token(cookies)
    }

    #[post("/protected")]
    fn protected(_csrf: CsrfProtected) -> Status {
        Status::Ok
    }

    async fn client(enabled: bool) -> Client {
        let rocket = rocket::build()
            .manage(CsrfConfig { enabled })
            .mount("/", routes![token, protected])
            .register("/", catchers![forbidden]);
        Client::tracked(rocket).await.expect("valid rocket instance")
    }

    #[test]
    fn generated_tokens_are_random_alphanumerics() {
        let first = generate_token();
        assert_eq!(first.len(), TOKEN_LENGTH);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, generate_token());
    }

    #[test]
    fn token_comparison() {
        assert!(tokens_match("abc123", "abc123"));
        assert!(!tokens_match("abc123", "abc124"));
        assert!(!tokens_match("", ""));
    }

    #[rocket::async_test]
    async fn mutation_without_header_is_forbidden() {
        let client = client(true).await;
        client.get("/token").dispatch().await;

        let response = client.post("/protected").dispatch().await;
        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn mutation_with_matching_header_passes() {
        let client = client(true).await;
        let token = client.get("/token").dispatch().await.into_string().await.expect("token body");

        let response = client.post("/protected").header(Header::new(CSRF_HEADER, token)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
    }

    #[rocket::async_test]
    async fn mismatched_header_is_forbidden() {
        let client = client(true).await;
        client.get("/token").dispatch().await;

        let response = client.post("/protected").header(Header::new(CSRF_HEADER, "forged")).dispatch().await;
        assert_eq!(response.status(), Status::Forbidden);
        let body = response.into_string().await.expect("error body");
        assert!(body.contains("CSRF token invalid"));
    }

    #[rocket::async_test]
    async fn disabled_protection_allows_everything() {
        let client = client(false).await;
        let response = client.post("/protected").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
    }
}
