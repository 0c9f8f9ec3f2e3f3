use crate::auth::CurrentUser;
use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::middleware::rate_limit::RateLimit;
use crate::models::schengen::{FutureTripRequest, SafeDatesRequest, SafeDatesResponse, SchengenCountriesResponse, SchengenStatusResponse};
use crate::schengen::{FutureTripValidation, PlannedTrip, SCHENGEN_COUNTRIES, SUPPORTED_YEARS, compliance_level, is_supported_date};
use crate::service::schengen::{SchengenService, StatusCache};
use chrono::NaiveDate;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_okapi::openapi;
use sqlx::PgPool;
use std::sync::Arc;
use validator::Validate;

fn parse_reference_date(raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    let Some(value) = raw else {
        return Ok(None);
    };
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| AppError::BadRequest("reference_date must be YYYY-MM-DD".to_string()))?;
    if !is_supported_date(date) {
        return Err(AppError::BadRequest(format!(
            "reference_date must fall between the years {} and {}",
            SUPPORTED_YEARS.start(),
            SUPPORTED_YEARS.end()
        )));
    }
    Ok(Some(date))
}

/// 90/180-day status as of `reference_date`, today in the user's timezone by default
#[openapi(tag = "Schengen")]
#[get("/status?<reference_date>")]
pub async fn get_status(
    pool: &State<PgPool>,
    cache: &State<Arc<StatusCache>>,
    _rate_limit: RateLimit,
    current_user: CurrentUser,
    reference_date: Option<&str>,
) -> Result<Json<SchengenStatusResponse>, AppError> {
    let reference_date = parse_reference_date(reference_date)?.unwrap_or_else(|| current_user.today());

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let status = SchengenService::new(&repo, cache).status(&current_user.id, reference_date).await?;
    let level = compliance_level(&status);

    Ok(Json(SchengenStatusResponse { status, level }))
}

/// Check a planned trip against the stored history
#[openapi(tag = "Schengen")]
#[post("/validate", data = "<payload>")]
pub async fn validate_trip(
    pool: &State<PgPool>,
    cache: &State<Arc<StatusCache>>,
    _rate_limit: RateLimit,
    current_user: CurrentUser,
    payload: Json<FutureTripRequest>,
) -> Result<Json<FutureTripValidation>, AppError> {
    payload.validate()?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let trip = PlannedTrip::from(&*payload);
    let validation = SchengenService::new(&repo, cache).validate_trip(&current_user.id, &trip, current_user.today()).await?;

    Ok(Json(validation))
}

/// Earliest start date for a compliant trip of the given length
#[openapi(tag = "Schengen")]
#[post("/safe-dates", data = "<payload>")]
pub async fn safe_dates(
    pool: &State<PgPool>,
    cache: &State<Arc<StatusCache>>,
    _rate_limit: RateLimit,
    current_user: CurrentUser,
    payload: Json<SafeDatesRequest>,
) -> Result<Json<SafeDatesResponse>, AppError> {
    payload.validate()?;

    let from_date = payload.from_date.unwrap_or_else(|| current_user.today());
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let window = SchengenService::new(&repo, cache)
        .safe_dates(&current_user.id, payload.duration_days, from_date)
        .await?;

    Ok(Json(SafeDatesResponse {
        duration_days: payload.duration_days,
        from_date,
        window,
    }))
}

/// Countries counted towards the 90/180-day rule
#[openapi(tag = "Schengen")]
#[get("/countries")]
pub async fn list_countries(_rate_limit: RateLimit) -> Json<SchengenCountriesResponse> {
    Json(SchengenCountriesResponse {
        countries: SCHENGEN_COUNTRIES.to_vec(),
    })
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![get_status, validate_trip, safe_dates, list_countries]
}
