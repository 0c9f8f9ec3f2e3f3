use crate::auth::CurrentUser;
use crate::database::audit::AuditRecord;
use crate::database::postgres_repository::PostgresRepository;
use crate::email::{EmailInput, EmailParser};
use crate::error::app_error::AppError;
use crate::middleware::ClientIp;
use crate::middleware::csrf::CsrfProtected;
use crate::middleware::rate_limit::RateLimit;
use crate::models::audit::audit_events;
use crate::models::email::{ImportEmailRequest, ImportEmailResponse, ParseEmailRequest, ParseEmailResponse};
use crate::models::trip::TripResponse;
use crate::service::email_import::EmailImportService;
use crate::service::schengen::{StatusCache, invalidate_user_status};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, post};
use rocket_okapi::openapi;
use sqlx::PgPool;
use std::sync::Arc;
use validator::Validate;

/// Extract travel details from a booking confirmation without storing anything
#[openapi(tag = "Email")]
#[post("/parse", data = "<payload>")]
pub async fn parse_email(
    parser: &State<EmailParser>,
    _rate_limit: RateLimit,
    _current_user: CurrentUser,
    payload: Json<ParseEmailRequest>,
) -> Result<Json<ParseEmailResponse>, AppError> {
    payload.validate()?;

    let result = parser.parse(&EmailInput::from(&*payload));
    Ok(Json(ParseEmailResponse::from(result)))
}

/// Parse a booking confirmation and record the trip it describes
#[openapi(tag = "Email")]
#[post("/import", data = "<payload>")]
pub async fn import_email(
    pool: &State<PgPool>,
    cache: &State<Arc<StatusCache>>,
    parser: &State<EmailParser>,
    _rate_limit: RateLimit,
    _csrf: CsrfProtected,
    current_user: CurrentUser,
    client_ip: ClientIp,
    payload: Json<ImportEmailRequest>,
) -> Result<(Status, Json<ImportEmailResponse>), AppError> {
    payload.validate()?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let service = EmailImportService::new(&repo, *parser.inner());
    let (trip, parsed) = service.import(&payload, &current_user.id).await?;
    invalidate_user_status(cache, &current_user.id).await;

    repo.audit(AuditRecord {
        user_id: Some(&current_user.id),
        event_type: audit_events::TRIP_IMPORTED,
        success: true,
        ip_address: client_ip.0,
        metadata: Some(serde_json::json!({ "trip_id": trip.id, "provider": parsed.provider.to_string() })),
        ..Default::default()
    })
    .await;

    Ok((
        Status::Created,
        Json(ImportEmailResponse {
            trip: TripResponse::new(&trip, current_user.today()),
            parsed,
        }),
    ))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![parse_email, import_email]
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{sign_up, test_client};
    use rocket::http::{ContentType, Status};
    use serde_json::Value;

    fn booking_email() -> Value {
        serde_json::json!({
            "sender": "Booking.com <noreply@booking.com>",
            "subject": "Your booking is confirmed at Hotel Amsterdam Centre",
            "body": "Confirmation number: 4021337890\nHotel: Hotel Amsterdam Centre\nAddress: Damrak 1, 1012 LG Amsterdam, Netherlands\nCheck-in: Fri, 5 Apr 2024 (from 15:00)\nCheck-out: Mon, 8 Apr 2024 (until 11:00)"
        })
    }

    #[rocket::async_test]
    async fn parsing_requires_a_session() {
        let client = test_client().await;
        let response = client
            .post("/api/email/parse")
            .header(ContentType::JSON)
            .body(booking_email().to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    #[ignore = "requires database"]
    async fn import_records_the_parsed_trip() {
        let client = test_client().await;
        sign_up(&client).await;

        let response = client
            .post("/api/email/parse")
            .header(ContentType::JSON)
            .body(booking_email().to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let parsed: Value = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(parsed["success"], true);
        assert_eq!(parsed["trip_suggestion"]["country"], "Netherlands");

        let import = serde_json::json!({ "email": booking_email(), "passport_country": "South Korea" });
        let response = client
            .post("/api/email/import")
            .header(ContentType::JSON)
            .body(import.to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let imported: Value = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(imported["trip"]["country"], "Netherlands");
        assert_eq!(imported["trip"]["max_days"], 90);
    }
}
