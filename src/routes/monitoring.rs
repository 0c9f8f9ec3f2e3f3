use crate::auth::CurrentUser;
use crate::cache::CacheStats;
use crate::middleware::rate_limit::{RateLimit, RateLimiter, RateLimiterStats};
use crate::service::schengen::StatusCache;
use rocket::serde::Serialize;
use rocket::serde::json::Json;
use rocket::{State, get};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use std::sync::Arc;

#[derive(Serialize, Debug, JsonSchema)]
pub struct MonitoringResponse {
    pub status_cache: CacheStats,
    pub rate_limiter: RateLimiterStats,
}

/// Status cache and rate limiter counters
#[openapi(tag = "Monitoring")]
#[get("/cache")]
pub async fn cache_stats(
    cache: &State<Arc<StatusCache>>,
    limiter: &State<Arc<RateLimiter>>,
    _rate_limit: RateLimit,
    _current_user: CurrentUser,
) -> Json<MonitoringResponse> {
    Json(MonitoringResponse {
        status_cache: cache.stats().await,
        rate_limiter: limiter.stats().await,
    })
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![cache_stats]
}

#[cfg(test)]
mod tests {
    use crate::test_utils::test_client;
    use rocket::http::Status;

    #[rocket::async_test]
    async fn stats_require_a_session() {
        let client = test_client().await;
        assert_eq!(client.get("/api/monitoring/cache").dispatch().await.status(), Status::Unauthorized);
    }
}
