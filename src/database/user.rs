use crate::database::postgres_repository::{PostgresRepository, is_unique_violation};
use crate::error::app_error::AppError;
use crate::models::user::User;
use argon2::Argon2;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use std::sync::LazyLock;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, password_hash, timezone, created_at";

/// Hash verified against when the email is unknown, so failed logins take
/// the same time whether or not the account exists.
static DUMMY_HASH: LazyLock<Option<String>> = LazyLock::new(|| {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(b"dino-dummy-password", &salt)
        .ok()
        .map(|hash| hash.to_string())
});

impl PostgresRepository {
    pub async fn create_user(&self, name: &str, email: &str, password: &str, timezone: &str) -> Result<User, AppError> {
        let password_hash = hash_password(password)?;
        let query = format!(
            r#"
            INSERT INTO users (name, email, password_hash, timezone)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(name)
            .bind(email)
            .bind(&password_hash)
            .bind(timezone)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::UserAlreadyExists(email.to_string())
                } else {
                    AppError::from(e)
                }
            })?;

        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        let user = sqlx::query_as::<_, User>(&query).bind(email).fetch_optional(&self.pool).await?;

        Ok(user)
    }

    pub async fn get_user_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&query).bind(id).fetch_optional(&self.pool).await?;

        Ok(user)
    }
}

pub(crate) fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::password_hash("Failed to hash password", e))?;

    Ok(hash.to_string())
}

pub(crate) fn verify_password(user: &User, password: &str) -> Result<(), AppError> {
    let password_hash = PasswordHash::new(&user.password_hash).map_err(|e| AppError::password_hash("Failed to parse stored password hash", e))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &password_hash)
        .map_err(|_| AppError::InvalidCredentials)
}

pub(crate) fn dummy_verify(password: &str) {
    if let Some(stored) = DUMMY_HASH.as_deref()
        && let Ok(hash) = PasswordHash::new(stored)
    {
        let _ = Argon2::default().verify_password(password.as_bytes(), &hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user_with_hash(password_hash: String) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Nomad".to_string(),
            email: "nomad@example.com".to_string(),
            password_hash,
            timezone: "Europe/Lisbon".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn hashed_password_verifies() {
        let user = user_with_hash(hash_password("correct horse 1").unwrap());
        assert!(verify_password(&user, "correct horse 1").is_ok());
        assert!(matches!(verify_password(&user, "wrong horse 1"), Err(AppError::InvalidCredentials)));
    }

    #[test]
    fn hashes_are_salted() {
        assert_ne!(hash_password("same-password1").unwrap(), hash_password("same-password1").unwrap());
    }

    #[test]
    fn corrupt_stored_hash_is_an_internal_error() {
        let user = user_with_hash("not-a-phc-string".to_string());
        assert!(matches!(verify_password(&user, "whatever1"), Err(AppError::PasswordHash { .. })));
    }
}
