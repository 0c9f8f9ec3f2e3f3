use crate::auth::CurrentUser;
use crate::database::audit::AuditRecord;
use crate::database::postgres_repository::PostgresRepository;
use crate::database::visa::VisaRepository;
use crate::error::app_error::AppError;
use crate::middleware::ClientIp;
use crate::middleware::csrf::CsrfProtected;
use crate::middleware::rate_limit::RateLimit;
use crate::models::audit::audit_events;
use crate::models::visa::{UserVisa, VisaEntry, VisaEntryRequest, VisaEntryResponse, VisaRequest, VisaResponse, VisaStaySummary};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, delete, get, post, put};
use rocket_okapi::openapi;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

async fn owned_visa(repo: &PostgresRepository, id: &str, user_id: &Uuid) -> Result<UserVisa, AppError> {
    let uuid = Uuid::parse_str(id)?;
    repo.get_visa(&uuid, user_id).await?.ok_or_else(|| AppError::NotFound("Visa not found".to_string()))
}

/// Rejects entries outside the visa's validity, a second use of a
/// single-entry visa, and stays overlapping a recorded one.
fn check_entry_allowed(visa: &UserVisa, entries: &[VisaEntry], request: &VisaEntryRequest) -> Result<(), AppError> {
    if request.entry_date < visa.issue_date || request.entry_date > visa.expiry_date {
        return Err(AppError::BadRequest(format!(
            "Entry date must be between {} and {}",
            visa.issue_date, visa.expiry_date
        )));
    }
    if !visa.is_multiple_entry && !entries.is_empty() {
        return Err(AppError::Conflict("Single-entry visa has already been used".to_string()));
    }

    let new_end = request.exit_date.unwrap_or(chrono::NaiveDate::MAX);
    let overlaps = entries.iter().any(|entry| {
        let end = entry.exit_date.unwrap_or(chrono::NaiveDate::MAX);
        entry.entry_date <= new_end && request.entry_date <= end
    });
    if overlaps {
        return Err(AppError::Conflict("Stay overlaps a recorded entry".to_string()));
    }

    Ok(())
}

/// Register a visa
#[openapi(tag = "Visas")]
#[post("/", data = "<payload>")]
pub async fn create_visa(
    pool: &State<PgPool>,
    _rate_limit: RateLimit,
    _csrf: CsrfProtected,
    current_user: CurrentUser,
    client_ip: ClientIp,
    payload: Json<VisaRequest>,
) -> Result<(Status, Json<VisaResponse>), AppError> {
    payload.validate()?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let visa = repo.create_visa(&payload, &current_user.id).await?;
    repo.audit(AuditRecord {
        user_id: Some(&current_user.id),
        event_type: audit_events::VISA_CREATED,
        success: true,
        ip_address: client_ip.0,
        metadata: Some(serde_json::json!({ "visa_id": visa.id, "country": visa.country })),
        ..Default::default()
    })
    .await;

    Ok((Status::Created, Json(VisaResponse::from(&visa))))
}

/// List visas by expiry date
#[openapi(tag = "Visas")]
#[get("/")]
pub async fn list_visas(pool: &State<PgPool>, _rate_limit: RateLimit, current_user: CurrentUser) -> Result<Json<Vec<VisaResponse>>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let visas = repo.list_visas(&current_user.id).await?;
    Ok(Json(visas.iter().map(VisaResponse::from).collect()))
}

/// Get a visa by id
#[openapi(tag = "Visas")]
#[get("/<id>")]
pub async fn get_visa(pool: &State<PgPool>, _rate_limit: RateLimit, current_user: CurrentUser, id: &str) -> Result<Json<VisaResponse>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let visa = owned_visa(&repo, id, &current_user.id).await?;
    Ok(Json(VisaResponse::from(&visa)))
}

/// Replace a visa
#[openapi(tag = "Visas")]
#[put("/<id>", data = "<payload>")]
pub async fn put_visa(
    pool: &State<PgPool>,
    _rate_limit: RateLimit,
    _csrf: CsrfProtected,
    current_user: CurrentUser,
    client_ip: ClientIp,
    id: &str,
    payload: Json<VisaRequest>,
) -> Result<Json<VisaResponse>, AppError> {
    payload.validate()?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let uuid = Uuid::parse_str(id)?;
    let visa = repo
        .update_visa(&uuid, &payload, &current_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Visa not found".to_string()))?;
    repo.audit(AuditRecord {
        user_id: Some(&current_user.id),
        event_type: audit_events::VISA_UPDATED,
        success: true,
        ip_address: client_ip.0,
        metadata: Some(serde_json::json!({ "visa_id": visa.id })),
        ..Default::default()
    })
    .await;

    Ok(Json(VisaResponse::from(&visa)))
}

/// Delete a visa with its entries
#[openapi(tag = "Visas")]
#[delete("/<id>")]
pub async fn delete_visa(
    pool: &State<PgPool>,
    _rate_limit: RateLimit,
    _csrf: CsrfProtected,
    current_user: CurrentUser,
    client_ip: ClientIp,
    id: &str,
) -> Result<Status, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let uuid = Uuid::parse_str(id)?;
    if !repo.delete_visa(&uuid, &current_user.id).await? {
        return Err(AppError::NotFound("Visa not found".to_string()));
    }
    repo.audit(AuditRecord {
        user_id: Some(&current_user.id),
        event_type: audit_events::VISA_DELETED,
        success: true,
        ip_address: client_ip.0,
        metadata: Some(serde_json::json!({ "visa_id": uuid })),
        ..Default::default()
    })
    .await;

    Ok(Status::NoContent)
}

/// Record a stay on a visa
#[openapi(tag = "Visas")]
#[post("/<id>/entries", data = "<payload>")]
pub async fn create_entry(
    pool: &State<PgPool>,
    _rate_limit: RateLimit,
    _csrf: CsrfProtected,
    current_user: CurrentUser,
    client_ip: ClientIp,
    id: &str,
    payload: Json<VisaEntryRequest>,
) -> Result<(Status, Json<VisaEntryResponse>), AppError> {
    payload.validate()?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let visa = owned_visa(&repo, id, &current_user.id).await?;
    let entries = repo.list_visa_entries(&visa.id).await?;
    check_entry_allowed(&visa, &entries, &payload)?;

    let entry = repo.create_visa_entry(&visa.id, &payload).await?;
    repo.audit(AuditRecord {
        user_id: Some(&current_user.id),
        event_type: audit_events::VISA_ENTRY_RECORDED,
        success: true,
        ip_address: client_ip.0,
        metadata: Some(serde_json::json!({ "visa_id": visa.id, "entry_id": entry.id })),
        ..Default::default()
    })
    .await;

    Ok((Status::Created, Json(VisaEntryResponse::from(&entry))))
}

/// Stays recorded on a visa
#[openapi(tag = "Visas")]
#[get("/<id>/entries")]
pub async fn list_entries(pool: &State<PgPool>, _rate_limit: RateLimit, current_user: CurrentUser, id: &str) -> Result<Json<Vec<VisaEntryResponse>>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let visa = owned_visa(&repo, id, &current_user.id).await?;
    let entries = repo.list_visa_entries(&visa.id).await?;
    Ok(Json(entries.iter().map(VisaEntryResponse::from).collect()))
}

/// Remove a recorded stay
#[openapi(tag = "Visas")]
#[delete("/<id>/entries/<entry_id>")]
pub async fn delete_entry(
    pool: &State<PgPool>,
    _rate_limit: RateLimit,
    _csrf: CsrfProtected,
    current_user: CurrentUser,
    client_ip: ClientIp,
    id: &str,
    entry_id: &str,
) -> Result<Status, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let visa = owned_visa(&repo, id, &current_user.id).await?;
    let entry_uuid = Uuid::parse_str(entry_id)?;
    if !repo.delete_visa_entry(&visa.id, &entry_uuid).await? {
        return Err(AppError::NotFound("Visa entry not found".to_string()));
    }
    repo.audit(AuditRecord {
        user_id: Some(&current_user.id),
        event_type: audit_events::VISA_ENTRY_DELETED,
        success: true,
        ip_address: client_ip.0,
        metadata: Some(serde_json::json!({ "visa_id": visa.id, "entry_id": entry_uuid })),
        ..Default::default()
    })
    .await;

    Ok(Status::NoContent)
}

/// Days used and left on a visa
#[openapi(tag = "Visas")]
#[get("/<id>/stay")]
pub async fn get_stay_summary(pool: &State<PgPool>, _rate_limit: RateLimit, current_user: CurrentUser, id: &str) -> Result<Json<VisaStaySummary>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let visa = owned_visa(&repo, id, &current_user.id).await?;
    let entries = repo.list_visa_entries(&visa.id).await?;
    Ok(Json(visa.stay_summary(&entries, current_user.today())))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![
        create_visa,
        list_visas,
        get_visa,
        put_visa,
        delete_visa,
        create_entry,
        list_entries,
        delete_entry,
        get_stay_summary
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::visa::sample_visa;
    use chrono::{NaiveDate, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn recorded(visa: &UserVisa, entry_date: NaiveDate, exit_date: Option<NaiveDate>) -> VisaEntry {
        VisaEntry {
            id: Uuid::new_v4(),
            user_visa_id: visa.id,
            entry_date,
            exit_date,
            created_at: Utc::now(),
        }
    }

    fn request(entry_date: NaiveDate, exit_date: Option<NaiveDate>) -> VisaEntryRequest {
        VisaEntryRequest { entry_date, exit_date }
    }

    #[test]
    fn entries_must_fall_within_validity() {
        let visa = sample_visa("Thailand", date(2024, 1, 1), date(2024, 12, 31));
        assert!(check_entry_allowed(&visa, &[], &request(date(2024, 3, 1), Some(date(2024, 3, 20)))).is_ok());
        assert!(matches!(
            check_entry_allowed(&visa, &[], &request(date(2025, 1, 2), None)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn overlapping_and_repeat_single_entries_conflict() {
        let mut visa = sample_visa("Vietnam", date(2024, 1, 1), date(2024, 12, 31));
        let entries = vec![recorded(&visa, date(2024, 2, 1), Some(date(2024, 2, 10)))];

        assert!(matches!(
            check_entry_allowed(&visa, &entries, &request(date(2024, 2, 10), Some(date(2024, 2, 15)))),
            Err(AppError::Conflict(_))
        ));
        assert!(check_entry_allowed(&visa, &entries, &request(date(2024, 2, 11), None)).is_ok());

        let ongoing = vec![recorded(&visa, date(2024, 5, 1), None)];
        assert!(check_entry_allowed(&visa, &ongoing, &request(date(2024, 6, 1), None)).is_err());

        visa.is_multiple_entry = false;
        assert!(matches!(
            check_entry_allowed(&visa, &entries, &request(date(2024, 6, 1), None)),
            Err(AppError::Conflict(_))
        ));
    }
}
