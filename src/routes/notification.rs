use crate::auth::CurrentUser;
use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::middleware::rate_limit::RateLimit;
use crate::models::notification::NotificationsResponse;
use crate::service::notification::NotificationService;
use rocket::serde::json::Json;
use rocket::{State, get};
use rocket_okapi::openapi;
use sqlx::PgPool;

/// Compliance and visa notices for today in the user's timezone
#[openapi(tag = "Notifications")]
#[get("/")]
pub async fn list_notifications(pool: &State<PgPool>, _rate_limit: RateLimit, current_user: CurrentUser) -> Result<Json<NotificationsResponse>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let today = current_user.today();
    let notifications = NotificationService::new(&repo).notifications(&current_user.id, today).await?;

    Ok(Json(NotificationsResponse {
        generated_for: today,
        notifications,
    }))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![list_notifications]
}
