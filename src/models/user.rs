use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Serialize, Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub timezone: String,
}

#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct UserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,
    /// IANA timezone name, e.g. `Europe/Lisbon`. Defaults to the server setting.
    #[validate(custom(function = "validate_timezone"))]
    pub timezone: Option<String>,
}

#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 8 {
        return Err(ValidationError::new("password_too_short").with_message("Password must be at least 8 characters".into()));
    }
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit_or_symbol = password.chars().any(|c| !c.is_alphabetic());
    if !(has_letter && has_digit_or_symbol) {
        return Err(ValidationError::new("password_too_weak").with_message("Password must mix letters with digits or symbols".into()));
    }
    Ok(())
}

pub(crate) fn validate_timezone(tz: &str) -> Result<(), ValidationError> {
    if tz.parse::<chrono_tz::Tz>().is_ok() {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_timezone"))
    }
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            timezone: user.timezone.clone(),
        }
    }
}
