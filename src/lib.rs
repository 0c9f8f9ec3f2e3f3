mod auth;
mod cache;
mod config;
mod database;
mod db;
mod email;
mod error;
mod middleware;
mod models;
mod routes;
mod schengen;
mod service;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;

use crate::db::stage_db;
use crate::email::EmailParser;
use crate::middleware::{REQUEST_ID_HEADER, RequestTracing};
use crate::middleware::csrf::CSRF_HEADER;
use crate::middleware::rate_limit::RateLimiter;
use crate::routes as app_routes;
use crate::service::schengen::StatusCache;
use rocket::fairing::AdHoc;
use rocket::figment::providers::Serialized;
use rocket::{Build, Rocket, catchers, http::Method};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};
use rocket_okapi::{get_openapi_route, okapi::merge::marge_spec_list};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("ROCKET_SECRET_KEY is required for profile '{0}'. Generate one with: openssl rand -base64 32")]
    MissingSecretKey(String),
    #[error("Invalid CORS configuration: {0}")]
    Cors(String),
    #[error("Could not merge OpenAPI spec: {0}")]
    OpenApi(String),
}

fn init_tracing(log_level: &str, json_format: bool) {
    // RUST_LOG overrides the configured level, e.g. RUST_LOG=info,dino::schengen=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_line_number(true);

    // A subscriber may already be installed when several rockets are built in one process.
    let _ = if json_format { subscriber.json().try_init() } else { subscriber.try_init() };
}

/// Session cookies are private, so release profiles need a fixed key.
fn ensure_rocket_secret_key() -> Result<(), StartupError> {
    let profile = std::env::var("ROCKET_PROFILE").unwrap_or_else(|_| "debug".to_string());

    if profile != "debug" && std::env::var("ROCKET_SECRET_KEY").is_err() {
        return Err(StartupError::MissingSecretKey(profile));
    }
    Ok(())
}

fn build_cors(cors_config: &config::CorsConfig) -> Result<CorsOptions, StartupError> {
    let is_wildcard = cors_config.allowed_origins.len() == 1 && cors_config.allowed_origins[0] == "*";

    if is_wildcard && cors_config.allow_credentials {
        return Err(StartupError::Cors(
            "wildcard origins (*) cannot be combined with credentials; set specific origins or disable credentials".to_string(),
        ));
    }

    let allowed_origins = if cors_config.allowed_origins.is_empty() {
        AllowedOrigins::some_exact::<&str>(&[])
    } else if is_wildcard {
        AllowedOrigins::all()
    } else {
        AllowedOrigins::some_exact(&cors_config.allowed_origins.iter().map(String::as_str).collect::<Vec<_>>())
    };

    Ok(CorsOptions {
        allowed_origins,
        allowed_methods: vec![
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Delete,
            Method::Patch,
            Method::Options,
            Method::Head,
        ]
        .into_iter()
        .map(From::from)
        .collect(),
        allowed_headers: rocket_cors::AllowedHeaders::some(&["Content-Type", "Accept", CSRF_HEADER]),
        expose_headers: ["Retry-After", REQUEST_ID_HEADER].iter().map(ToString::to_string).collect(),
        allow_credentials: cors_config.allow_credentials,
        ..Default::default()
    })
}

fn get_swagger_config(openapi_url: &str) -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: openapi_url.to_string(),
        ..Default::default()
    }
}

fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return config::DEFAULT_API_BASE_PATH.to_string();
    }

    let mut normalized = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };

    while normalized.ends_with('/') && normalized.len() > 1 {
        normalized.pop();
    }

    normalized
}

fn join_base_path(base_path: &str, path: &str) -> String {
    let base = base_path.trim_end_matches('/');
    let suffix = path.trim_start_matches('/');

    if base.is_empty() {
        format!("/{}", suffix)
    } else {
        format!("{}/{}", base, suffix)
    }
}

fn collect_base_paths(api_config: &config::ApiConfig) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    let mut push_unique = |path: String| {
        if !normalized.contains(&path) {
            normalized.push(path);
        }
    };

    push_unique(normalize_base_path(&api_config.base_path));

    for extra in &api_config.additional_base_paths {
        let normalized_extra = normalize_base_path(extra);
        if !normalized_extra.is_empty() {
            push_unique(normalized_extra);
        }
    }

    normalized
}

struct RouteSpec {
    path: &'static str,
    routes: Vec<rocket::Route>,
    openapi: rocket_okapi::okapi::openapi3::OpenApi,
}

fn collect_route_specs() -> Vec<RouteSpec> {
    let specs = [
        ("/health", app_routes::health::routes()),
        ("/csrf", app_routes::csrf::routes()),
        ("/users", app_routes::user::routes()),
        ("/trips", app_routes::trip::routes()),
        ("/schengen", app_routes::schengen::routes()),
        ("/visas", app_routes::visa::routes()),
        ("/email", app_routes::email::routes()),
        ("/notifications", app_routes::notification::routes()),
        ("/monitoring", app_routes::monitoring::routes()),
    ];

    specs
        .into_iter()
        .map(|(path, (routes, openapi))| RouteSpec { path, routes, openapi })
        .collect()
}

fn mount_api_routes(mut rocket: Rocket<Build>, base_path: &str, enable_swagger: bool) -> Result<Rocket<Build>, StartupError> {
    let route_specs = collect_route_specs();

    if enable_swagger {
        let mut openapi_list = Vec::new();
        for spec in route_specs {
            rocket = rocket.mount(format!("{}{}", base_path, spec.path), spec.routes);
            openapi_list.push((spec.path, spec.openapi));
        }

        let openapi_docs = marge_spec_list(&openapi_list).map_err(|err| StartupError::OpenApi(err.to_string()))?;

        let settings = rocket_okapi::settings::OpenApiSettings::default();
        rocket = rocket.mount(base_path, vec![get_openapi_route(openapi_docs, &settings)]);

        let docs_path = join_base_path(base_path, "docs");
        let openapi_url = join_base_path(base_path, "openapi.json");
        rocket = rocket.mount(docs_path, make_swagger_ui(&get_swagger_config(&openapi_url)));
    } else {
        for spec in route_specs {
            rocket = rocket.mount(format!("{}{}", base_path, spec.path), spec.routes);
        }
    }

    Ok(rocket)
}

fn stage_rate_limiter(rate_limit_config: config::RateLimitConfig) -> AdHoc {
    AdHoc::on_ignite("Rate Limiter", move |rocket| {
        let limiter = Arc::new(RateLimiter::new(rate_limit_config.clone()));
        limiter.clone().spawn_cleanup_task();

        Box::pin(async move { rocket.manage(limiter) })
    })
}

/// Schengen status cache, with its expiry sweep running from ignition.
fn stage_status_cache(cache_config: config::CacheConfig) -> AdHoc {
    AdHoc::on_ignite("Status Cache", move |rocket| {
        let cache = Arc::new(StatusCache::new(
            Duration::from_secs(cache_config.ttl_seconds),
            Duration::from_secs(cache_config.cleanup_interval_seconds),
        ));
        cache.clone().spawn_cleanup_task();

        Box::pin(async move { rocket.manage(cache) })
    })
}

fn register_catchers(rocket: Rocket<Build>, base_path: &str) -> Rocket<Build> {
    rocket.register(
        base_path,
        catchers![
            app_routes::error::bad_request,
            app_routes::error::unauthorized,
            app_routes::error::forbidden,
            app_routes::error::not_found,
            app_routes::error::conflict,
            app_routes::error::unprocessable_entity,
            app_routes::error::too_many_requests,
            app_routes::error::internal_error,
        ],
    )
}

pub fn build_rocket(config: Config) -> Result<Rocket<Build>, StartupError> {
    init_tracing(&config.logging.level, config.logging.json_format);
    ensure_rocket_secret_key()?;

    let cors = build_cors(&config.cors)?.to_cors().map_err(|err| StartupError::Cors(err.to_string()))?;
    let base_paths = collect_base_paths(&config.api);
    let parser = EmailParser::new(config.email_parser.confidence_threshold, config.email_parser.strict_mode);

    let figment = rocket::Config::figment()
        .merge(Serialized::default("address", &config.server.address))
        .merge(Serialized::default("port", config.server.port));

    let mut rocket = rocket::custom(figment)
        .manage(config.clone())
        .manage(config.csrf.clone())
        .manage(parser)
        .attach(stage_rate_limiter(config.rate_limit.clone()))
        .attach(stage_status_cache(config.cache.clone()))
        .attach(cors)
        .attach(RequestTracing)
        .attach(stage_db(config.database.clone()));

    let enable_swagger = config.api.enable_swagger;
    for base_path in &base_paths {
        rocket = mount_api_routes(rocket, base_path, enable_swagger)?;
        rocket = register_catchers(rocket, base_path);
    }

    Ok(rocket)
}
