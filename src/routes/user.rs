use crate::auth::{CurrentUser, SESSION_COOKIE};
use crate::config::Config;
use crate::database::audit::AuditRecord;
use crate::database::postgres_repository::PostgresRepository;
use crate::database::user::{dummy_verify, verify_password};
use crate::error::app_error::AppError;
use crate::middleware::csrf::CsrfProtected;
use crate::middleware::rate_limit::{AuthRateLimit, RateLimit};
use crate::middleware::{ClientIp, UserAgent};
use crate::models::audit::audit_events;
use crate::models::user::{LoginRequest, User, UserRequest, UserResponse};
use chrono::{Duration, Utc};
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_okapi::openapi;
use sqlx::PgPool;
use validator::Validate;

pub(crate) fn build_session_cookie(value: String, ttl_seconds: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(rocket::time::Duration::seconds(ttl_seconds))
        .build()
}

async fn start_session(repo: &PostgresRepository, cookies: &CookieJar<'_>, config: &Config, user: &User, user_agent: Option<&str>) -> Result<(), AppError> {
    let ttl_seconds = config.session.ttl_seconds.max(60);
    let session = repo.create_session(&user.id, Utc::now() + Duration::seconds(ttl_seconds), user_agent).await?;
    cookies.add_private(build_session_cookie(session.cookie_value(), ttl_seconds));
    Ok(())
}

/// Register a new account and sign it in
#[openapi(tag = "Users")]
#[post("/", data = "<payload>")]
pub async fn register(
    pool: &State<PgPool>,
    config: &State<Config>,
    _rate_limit: AuthRateLimit,
    cookies: &CookieJar<'_>,
    client_ip: ClientIp,
    user_agent: UserAgent,
    payload: Json<UserRequest>,
) -> Result<(Status, Json<UserResponse>), AppError> {
    payload.validate()?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let email = payload.email.trim().to_lowercase();
    let timezone = payload.timezone.as_deref().unwrap_or(&config.app.default_timezone);
    let user = repo.create_user(payload.name.trim(), &email, &payload.password, timezone).await?;

    start_session(&repo, cookies, config, &user, user_agent.0.as_deref()).await?;
    repo.audit(AuditRecord {
        user_id: Some(&user.id),
        event_type: audit_events::USER_REGISTERED,
        success: true,
        ip_address: client_ip.0,
        user_agent: user_agent.0,
        ..Default::default()
    })
    .await;

    Ok((Status::Created, Json(UserResponse::from(&user))))
}

/// Sign in with email and password
#[openapi(tag = "Users")]
#[post("/login", data = "<payload>")]
pub async fn login(
    pool: &State<PgPool>,
    config: &State<Config>,
    _rate_limit: AuthRateLimit,
    cookies: &CookieJar<'_>,
    client_ip: ClientIp,
    user_agent: UserAgent,
    payload: Json<LoginRequest>,
) -> Result<Json<UserResponse>, AppError> {
    payload.validate()?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let user = repo.get_user_by_email(payload.email.trim()).await?;
    let verified = match &user {
        Some(user) => verify_password(user, &payload.password),
        None => {
            dummy_verify(&payload.password);
            Err(AppError::InvalidCredentials)
        }
    };

    let user = match (user, verified) {
        (Some(user), Ok(())) => user,
        (user, result) => {
            repo.audit(AuditRecord {
                user_id: user.as_ref().map(|user| &user.id),
                event_type: audit_events::LOGIN_FAILED,
                success: false,
                ip_address: client_ip.0,
                user_agent: user_agent.0,
                metadata: Some(serde_json::json!({ "email": payload.email.trim() })),
            })
            .await;
            return Err(match result {
                Err(err @ AppError::PasswordHash { .. }) => err,
                _ => AppError::InvalidCredentials,
            });
        }
    };

    start_session(&repo, cookies, config, &user, user_agent.0.as_deref()).await?;
    repo.audit(AuditRecord {
        user_id: Some(&user.id),
        event_type: audit_events::LOGIN_SUCCESS,
        success: true,
        ip_address: client_ip.0,
        user_agent: user_agent.0,
        ..Default::default()
    })
    .await;

    Ok(Json(UserResponse::from(&user)))
}

/// End the current session
#[openapi(tag = "Users")]
#[post("/logout")]
pub async fn logout(
    pool: &State<PgPool>,
    _rate_limit: RateLimit,
    _csrf: CsrfProtected,
    current_user: CurrentUser,
    cookies: &CookieJar<'_>,
    client_ip: ClientIp,
) -> Result<Status, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    if let Some(cookie) = cookies.get_private(SESSION_COOKIE)
        && let Some((session_id, _)) = crate::auth::parse_session_cookie_value(cookie.value())
    {
        repo.delete_session(&session_id, &current_user.id).await?;
    }
    cookies.remove_private(Cookie::build(SESSION_COOKIE).path("/").build());

    repo.audit(AuditRecord {
        user_id: Some(&current_user.id),
        event_type: audit_events::LOGOUT,
        success: true,
        ip_address: client_ip.0,
        ..Default::default()
    })
    .await;

    Ok(Status::NoContent)
}

/// The signed-in user
#[openapi(tag = "Users")]
#[get("/me")]
pub async fn me(pool: &State<PgPool>, _rate_limit: RateLimit, current_user: CurrentUser) -> Result<Json<UserResponse>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let user = repo.get_user_by_id(&current_user.id).await?.ok_or(AppError::UserNotFound)?;
    Ok(Json(UserResponse::from(&user)))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![register, login, logout, me]
}

#[cfg(test)]
mod tests {
    use super::build_session_cookie;
    use crate::test_utils::test_client;
    use rocket::http::{ContentType, Status};
    use serde_json::Value;
    use uuid::Uuid;

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = build_session_cookie("a:b".to_string(), 3600);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(rocket::time::Duration::hours(1)));
    }

    #[rocket::async_test]
    async fn me_requires_a_session() {
        let client = test_client().await;
        let response = client.get("/api/users/me").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn invalid_registration_is_rejected_with_field_errors() {
        let client = test_client().await;
        let response = client
            .post("/api/users")
            .header(ContentType::JSON)
            .body(r#"{"name":"","email":"not-an-email","password":"short"}"#)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let body: Value = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["message"], "Validation failed");
        assert!(body["fields"]["email"].is_array());
        assert!(body["fields"]["password"].is_array());
    }

    #[rocket::async_test]
    #[ignore = "requires database"]
    async fn register_login_logout() {
        let client = test_client().await;
        let email = format!("nomad.{}@example.com", Uuid::new_v4());
        let payload = serde_json::json!({ "name": "Nomad", "email": email, "password": "wandering1", "timezone": "Europe/Lisbon" });

        let response = client.post("/api/users").header(ContentType::JSON).body(payload.to_string()).dispatch().await;
        assert_eq!(response.status(), Status::Created);

        let response = client.get("/api/users/me").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let me: Value = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(me["timezone"], "Europe/Lisbon");

        let login = serde_json::json!({ "email": email, "password": "wrong-password1" });
        let response = client.post("/api/users/login").header(ContentType::JSON).body(login.to_string()).dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
    }
}
