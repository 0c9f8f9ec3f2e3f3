use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::visa::{UserVisa, VisaEntry, VisaEntryRequest, VisaRequest};
use uuid::Uuid;

const VISA_COLUMNS: &str = "id, user_id, country, visa_type, issue_date, expiry_date, max_stay_days, is_multiple_entry, notes, created_at";

#[async_trait::async_trait]
pub trait VisaRepository {
    async fn create_visa(&self, request: &VisaRequest, user_id: &Uuid) -> Result<UserVisa, AppError>;
    async fn get_visa(&self, id: &Uuid, user_id: &Uuid) -> Result<Option<UserVisa>, AppError>;
    async fn list_visas(&self, user_id: &Uuid) -> Result<Vec<UserVisa>, AppError>;
    async fn update_visa(&self, id: &Uuid, request: &VisaRequest, user_id: &Uuid) -> Result<Option<UserVisa>, AppError>;
    async fn delete_visa(&self, id: &Uuid, user_id: &Uuid) -> Result<bool, AppError>;

    /// Callers check visa ownership first; entries carry no user id.
    async fn create_visa_entry(&self, visa_id: &Uuid, request: &VisaEntryRequest) -> Result<VisaEntry, AppError>;
    async fn list_visa_entries(&self, visa_id: &Uuid) -> Result<Vec<VisaEntry>, AppError>;
    async fn delete_visa_entry(&self, visa_id: &Uuid, entry_id: &Uuid) -> Result<bool, AppError>;
}

#[async_trait::async_trait]
impl VisaRepository for PostgresRepository {
    async fn create_visa(&self, request: &VisaRequest, user_id: &Uuid) -> Result<UserVisa, AppError> {
        let query = format!(
            r#"
            INSERT INTO user_visa (user_id, country, visa_type, issue_date, expiry_date, max_stay_days, is_multiple_entry, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {VISA_COLUMNS}
            "#
        );

        let visa = sqlx::query_as::<_, UserVisa>(&query)
            .bind(user_id)
            .bind(&request.country)
            .bind(request.visa_type)
            .bind(request.issue_date)
            .bind(request.expiry_date)
            .bind(request.max_stay_days)
            .bind(request.is_multiple_entry)
            .bind(&request.notes)
            .fetch_one(&self.pool)
            .await?;

        Ok(visa)
    }

    async fn get_visa(&self, id: &Uuid, user_id: &Uuid) -> Result<Option<UserVisa>, AppError> {
        let query = format!("SELECT {VISA_COLUMNS} FROM user_visa WHERE id = $1 AND user_id = $2");
        let visa = sqlx::query_as::<_, UserVisa>(&query).bind(id).bind(user_id).fetch_optional(&self.pool).await?;

        Ok(visa)
    }

    async fn list_visas(&self, user_id: &Uuid) -> Result<Vec<UserVisa>, AppError> {
        let query = format!("SELECT {VISA_COLUMNS} FROM user_visa WHERE user_id = $1 ORDER BY expiry_date ASC, created_at ASC");
        let visas = sqlx::query_as::<_, UserVisa>(&query).bind(user_id).fetch_all(&self.pool).await?;

        Ok(visas)
    }

    async fn update_visa(&self, id: &Uuid, request: &VisaRequest, user_id: &Uuid) -> Result<Option<UserVisa>, AppError> {
        let query = format!(
            r#"
            UPDATE user_visa
            SET country = $3,
                visa_type = $4,
                issue_date = $5,
                expiry_date = $6,
                max_stay_days = $7,
                is_multiple_entry = $8,
                notes = $9
            WHERE id = $1 AND user_id = $2
            RETURNING {VISA_COLUMNS}
            "#
        );

        let visa = sqlx::query_as::<_, UserVisa>(&query)
            .bind(id)
            .bind(user_id)
            .bind(&request.country)
            .bind(request.visa_type)
            .bind(request.issue_date)
            .bind(request.expiry_date)
            .bind(request.max_stay_days)
            .bind(request.is_multiple_entry)
            .bind(&request.notes)
            .fetch_optional(&self.pool)
            .await?;

        Ok(visa)
    }

    async fn delete_visa(&self, id: &Uuid, user_id: &Uuid) -> Result<bool, AppError> {
        // visa_entry rows go with the visa (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM user_visa WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_visa_entry(&self, visa_id: &Uuid, request: &VisaEntryRequest) -> Result<VisaEntry, AppError> {
        let entry = sqlx::query_as::<_, VisaEntry>(
            r#"
            INSERT INTO visa_entry (user_visa_id, entry_date, exit_date)
            VALUES ($1, $2, $3)
            RETURNING id, user_visa_id, entry_date, exit_date, created_at
            "#,
        )
        .bind(visa_id)
        .bind(request.entry_date)
        .bind(request.exit_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn list_visa_entries(&self, visa_id: &Uuid) -> Result<Vec<VisaEntry>, AppError> {
        let entries = sqlx::query_as::<_, VisaEntry>(
            r#"
            SELECT id, user_visa_id, entry_date, exit_date, created_at
            FROM visa_entry
            WHERE user_visa_id = $1
            ORDER BY entry_date ASC
            "#,
        )
        .bind(visa_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn delete_visa_entry(&self, visa_id: &Uuid, entry_id: &Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM visa_entry WHERE id = $1 AND user_visa_id = $2")
            .bind(entry_id)
            .bind(visa_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
