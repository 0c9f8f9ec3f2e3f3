use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::session::{Session, SessionLookup, SessionUser};
use chrono::{DateTime, Utc};
use uuid::Uuid;

const SESSION_COLUMNS: &str = "id, user_id, created_at, expires_at, user_agent";

#[derive(sqlx::FromRow)]
struct SessionUserRow {
    #[sqlx(flatten)]
    user: SessionUser,
    live: bool,
}

impl PostgresRepository {
    /// Opens a session. The user's expired sessions are swept in the same
    /// statement.
    pub async fn create_session(&self, user_id: &Uuid, expires_at: DateTime<Utc>, user_agent: Option<&str>) -> Result<Session, AppError> {
        let query = format!(
            r#"
            WITH swept AS (
                DELETE FROM user_session WHERE user_id = $1 AND expires_at <= now()
            )
            INSERT INTO user_session (user_id, expires_at, user_agent)
            VALUES ($1, $2, $3)
            RETURNING {SESSION_COLUMNS}
            "#
        );

        let session = sqlx::query_as::<_, Session>(&query)
            .bind(user_id)
            .bind(expires_at)
            .bind(user_agent)
            .fetch_one(&self.pool)
            .await?;

        Ok(session)
    }

    /// Resolves a session cookie. An expired session is deleted on sight.
    pub async fn lookup_session(&self, session_id: &Uuid, user_id: &Uuid) -> Result<SessionLookup, AppError> {
        let row = sqlx::query_as::<_, SessionUserRow>(
            r#"
            SELECT u.id, u.email, u.timezone, s.expires_at > now() AS live
            FROM user_session s
            JOIN users u ON u.id = s.user_id
            WHERE s.id = $1 AND s.user_id = $2
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(SessionUserRow { user, live: true }) => Ok(SessionLookup::Active(user)),
            Some(_) => {
                self.delete_session(session_id, user_id).await?;
                Ok(SessionLookup::Expired)
            }
            None => Ok(SessionLookup::Missing),
        }
    }

    /// Returns whether a session was removed.
    pub async fn delete_session(&self, session_id: &Uuid, user_id: &Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM user_session WHERE id = $1 AND user_id = $2")
            .bind(session_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sign_up, test_client};
    use chrono::Duration;
    use sqlx::PgPool;

    #[rocket::async_test]
    #[ignore = "requires database"]
    async fn expired_sessions_are_reported_once_then_gone() {
        let client = test_client().await;
        let user_id = sign_up(&client).await;
        let repo = PostgresRepository {
            pool: client.rocket().state::<PgPool>().unwrap().clone(),
        };

        let live = repo.create_session(&user_id, Utc::now() + Duration::hours(1), Some("tests")).await.unwrap();
        assert_eq!(live.user_agent.as_deref(), Some("tests"));
        assert!(matches!(repo.lookup_session(&live.id, &user_id).await.unwrap(), SessionLookup::Active(user) if user.id == user_id));
        assert!(matches!(repo.lookup_session(&live.id, &Uuid::new_v4()).await.unwrap(), SessionLookup::Missing));

        let stale = repo.create_session(&user_id, Utc::now() - Duration::minutes(1), None).await.unwrap();
        assert!(matches!(repo.lookup_session(&stale.id, &user_id).await.unwrap(), SessionLookup::Expired));
        assert!(matches!(repo.lookup_session(&stale.id, &user_id).await.unwrap(), SessionLookup::Missing));

        assert!(repo.delete_session(&live.id, &user_id).await.unwrap());
        assert!(!repo.delete_session(&live.id, &user_id).await.unwrap());
    }
}
