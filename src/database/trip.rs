use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::pagination::PaginationParams;
use crate::models::trip::{Trip, TripRequest};
use uuid::Uuid;

const TRIP_COLUMNS: &str = "id, user_id, country, entry_date, exit_date, visa_type, max_days, passport_country, notes, created_at, updated_at";

#[async_trait::async_trait]
pub trait TripRepository {
    async fn create_trip(&self, request: &TripRequest, user_id: &Uuid) -> Result<Trip, AppError>;
    async fn get_trip(&self, id: &Uuid, user_id: &Uuid) -> Result<Option<Trip>, AppError>;
    /// One page of trips, newest entry first, with the total count.
    async fn list_trips(&self, pagination: &PaginationParams, user_id: &Uuid) -> Result<(Vec<Trip>, i64), AppError>;
    /// Every trip of the user, oldest entry first.
    async fn list_all_trips(&self, user_id: &Uuid) -> Result<Vec<Trip>, AppError>;
    async fn update_trip(&self, id: &Uuid, request: &TripRequest, user_id: &Uuid) -> Result<Option<Trip>, AppError>;
    /// Returns whether a trip was deleted.
    async fn delete_trip(&self, id: &Uuid, user_id: &Uuid) -> Result<bool, AppError>;
}

#[async_trait::async_trait]
impl TripRepository for PostgresRepository {
    async fn create_trip(&self, request: &TripRequest, user_id: &Uuid) -> Result<Trip, AppError> {
        let query = format!(
            r#"
            INSERT INTO country_visit (user_id, country, entry_date, exit_date, visa_type, max_days, passport_country, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TRIP_COLUMNS}
            "#
        );

        let trip = sqlx::query_as::<_, Trip>(&query)
            .bind(user_id)
            .bind(&request.country)
            .bind(request.entry_date)
            .bind(request.exit_date)
            .bind(request.visa_type)
            .bind(request.max_days)
            .bind(&request.passport_country)
            .bind(&request.notes)
            .fetch_one(&self.pool)
            .await?;

        Ok(trip)
    }

    async fn get_trip(&self, id: &Uuid, user_id: &Uuid) -> Result<Option<Trip>, AppError> {
        let query = format!("SELECT {TRIP_COLUMNS} FROM country_visit WHERE id = $1 AND user_id = $2");
        let trip = sqlx::query_as::<_, Trip>(&query).bind(id).bind(user_id).fetch_optional(&self.pool).await?;

        Ok(trip)
    }

    async fn list_trips(&self, pagination: &PaginationParams, user_id: &Uuid) -> Result<(Vec<Trip>, i64), AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM country_visit WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        // NULL limit/offset leave the result unpaginated.
        let query = format!(
            r#"
            SELECT {TRIP_COLUMNS}
            FROM country_visit
            WHERE user_id = $1
            ORDER BY entry_date DESC, created_at DESC
            LIMIT $2 OFFSET $3
            "#
        );

        let trips = sqlx::query_as::<_, Trip>(&query)
            .bind(user_id)
            .bind(pagination.effective_limit())
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((trips, total))
    }

    async fn list_all_trips(&self, user_id: &Uuid) -> Result<Vec<Trip>, AppError> {
        let query = format!("SELECT {TRIP_COLUMNS} FROM country_visit WHERE user_id = $1 ORDER BY entry_date ASC");
        let trips = sqlx::query_as::<_, Trip>(&query).bind(user_id).fetch_all(&self.pool).await?;

        Ok(trips)
    }

    async fn update_trip(&self, id: &Uuid, request: &TripRequest, user_id: &Uuid) -> Result<Option<Trip>, AppError> {
        let query = format!(
            r#"
            UPDATE country_visit
            SET country = $3,
                entry_date = $4,
                exit_date = $5,
                visa_type = $6,
                max_days = $7,
                passport_country = $8,
                notes = $9,
                updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING {TRIP_COLUMNS}
            "#
        );

        let trip = sqlx::query_as::<_, Trip>(&query)
            .bind(id)
            .bind(user_id)
            .bind(&request.country)
            .bind(request.entry_date)
            .bind(request.exit_date)
            .bind(request.visa_type)
            .bind(request.max_days)
            .bind(&request.passport_country)
            .bind(&request.notes)
            .fetch_optional(&self.pool)
            .await?;

        Ok(trip)
    }

    async fn delete_trip(&self, id: &Uuid, user_id: &Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM country_visit WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
