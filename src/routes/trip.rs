use crate::auth::CurrentUser;
use crate::database::audit::AuditRecord;
use crate::database::postgres_repository::PostgresRepository;
use crate::database::trip::TripRepository;
use crate::error::app_error::AppError;
use crate::middleware::ClientIp;
use crate::middleware::csrf::CsrfProtected;
use crate::middleware::rate_limit::RateLimit;
use crate::models::audit::audit_events;
use crate::models::pagination::{PaginatedResponse, PaginationParams};
use crate::models::trip::{TripRequest, TripResponse};
use crate::service::schengen::{StatusCache, invalidate_user_status};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, delete, get, post, put};
use rocket_okapi::openapi;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Record a country visit
#[openapi(tag = "Trips")]
#[post("/", data = "<payload>")]
pub async fn create_trip(
    pool: &State<PgPool>,
    cache: &State<Arc<StatusCache>>,
    _rate_limit: RateLimit,
    _csrf: CsrfProtected,
    current_user: CurrentUser,
    client_ip: ClientIp,
    payload: Json<TripRequest>,
) -> Result<(Status, Json<TripResponse>), AppError> {
    payload.validate()?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let trip = repo.create_trip(&payload, &current_user.id).await?;
    invalidate_user_status(cache, &current_user.id).await;

    repo.audit(AuditRecord {
        user_id: Some(&current_user.id),
        event_type: audit_events::TRIP_CREATED,
        success: true,
        ip_address: client_ip.0,
        metadata: Some(serde_json::json!({ "trip_id": trip.id, "country": trip.country })),
        ..Default::default()
    })
    .await;

    Ok((Status::Created, Json(TripResponse::new(&trip, current_user.today()))))
}

/// List trips, newest first
#[openapi(tag = "Trips")]
#[get("/?<page>&<limit>")]
pub async fn list_trips(
    pool: &State<PgPool>,
    _rate_limit: RateLimit,
    current_user: CurrentUser,
    page: Option<i64>,
    limit: Option<i64>,
) -> Result<Json<PaginatedResponse<TripResponse>>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let params = PaginationParams::new(page, limit);
    let (trips, total) = repo.list_trips(&params, &current_user.id).await?;

    let today = current_user.today();
    let data = trips.iter().map(|trip| TripResponse::new(trip, today)).collect();
    Ok(Json(PaginatedResponse::from_query(data, &params, total)))
}

/// Get a trip by id
#[openapi(tag = "Trips")]
#[get("/<id>")]
pub async fn get_trip(pool: &State<PgPool>, _rate_limit: RateLimit, current_user: CurrentUser, id: &str) -> Result<Json<TripResponse>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let uuid = Uuid::parse_str(id)?;
    match repo.get_trip(&uuid, &current_user.id).await? {
        Some(trip) => Ok(Json(TripResponse::new(&trip, current_user.today()))),
        None => Err(AppError::NotFound("Trip not found".to_string())),
    }
}

/// Replace a trip
#[openapi(tag = "Trips")]
#[put("/<id>", data = "<payload>")]
pub async fn put_trip(
    pool: &State<PgPool>,
    cache: &State<Arc<StatusCache>>,
    _rate_limit: RateLimit,
    _csrf: CsrfProtected,
    current_user: CurrentUser,
    client_ip: ClientIp,
    id: &str,
    payload: Json<TripRequest>,
) -> Result<Json<TripResponse>, AppError> {
    payload.validate()?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let uuid = Uuid::parse_str(id)?;
    let trip = repo
        .update_trip(&uuid, &payload, &current_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;
    invalidate_user_status(cache, &current_user.id).await;

    repo.audit(AuditRecord {
        user_id: Some(&current_user.id),
        event_type: audit_events::TRIP_UPDATED,
        success: true,
        ip_address: client_ip.0,
        metadata: Some(serde_json::json!({ "trip_id": trip.id })),
        ..Default::default()
    })
    .await;

    Ok(Json(TripResponse::new(&trip, current_user.today())))
}

/// Delete a trip
#[openapi(tag = "Trips")]
#[delete("/<id>")]
pub async fn delete_trip(
    pool: &State<PgPool>,
    cache: &State<Arc<StatusCache>>,
    _rate_limit: RateLimit,
    _csrf: CsrfProtected,
    current_user: CurrentUser,
    client_ip: ClientIp,
    id: &str,
) -> Result<Status, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let uuid = Uuid::parse_str(id)?;
    if !repo.delete_trip(&uuid, &current_user.id).await? {
        return Err(AppError::NotFound("Trip not found".to_string()));
    }
    invalidate_user_status(cache, &current_user.id).await;

    repo.audit(AuditRecord {
        user_id: Some(&current_user.id),
        event_type: audit_events::TRIP_DELETED,
        success: true,
        ip_address: client_ip.0,
        metadata: Some(serde_json::json!({ "trip_id": uuid })),
        ..Default::default()
    })
    .await;

    Ok(Status::NoContent)
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![create_trip, list_trips, get_trip, put_trip, delete_trip]
}
