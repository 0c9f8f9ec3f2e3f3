use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub user_agent: Option<String>,
}

impl Session {
    pub fn cookie_value(&self) -> String {
        format!("{}:{}", self.id, self.user_id)
    }
}

/// What the auth guard needs from a live session.
#[derive(Debug, sqlx::FromRow)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub timezone: String,
}

#[derive(Debug)]
pub enum SessionLookup {
    Active(SessionUser),
    /// Existed but had expired; it has been deleted.
    Expired,
    Missing,
}
