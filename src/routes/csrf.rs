use crate::middleware::csrf::{CSRF_HEADER, issue_token};
use crate::middleware::rate_limit::RateLimit;
use rocket::get;
use rocket::http::CookieJar;
use rocket::serde::Serialize;
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use schemars::JsonSchema;

#[derive(Serialize, Debug, JsonSchema)]
pub struct CsrfTokenResponse {
    pub token: String,
    /// Header the token must be sent back in.
    pub header: &'static str,
}

/// Issue a CSRF token for the double-submit check
#[openapi(tag = "Security")]
#[get("/")]
pub async fn get_csrf_token(_rate_limit: RateLimit, cookies: &CookieJar<'_>) -> Json<CsrfTokenResponse> {
    Json(CsrfTokenResponse {
        token: issue_token(cookies),
        header: CSRF_HEADER,
    })
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![get_csrf_token]
}
