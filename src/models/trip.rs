use crate::models::check_supported_dates;
use crate::schengen::{StayUsage, Visit, stay_usage};
use chrono::{DateTime, NaiveDate, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, JsonSchema, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VisaType {
    #[default]
    Tourist,
    Business,
    DigitalNomad,
    Student,
    Work,
    Transit,
    Other,
}

/// A country visit owned by one user.
#[derive(Serialize, Debug, Clone, sqlx::FromRow)]
pub struct Trip {
    pub id: Uuid,
    pub user_id: Uuid,
    pub country: String,
    pub entry_date: NaiveDate,
    pub exit_date: Option<NaiveDate>,
    pub visa_type: VisaType,
    pub max_days: i32,
    pub passport_country: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// Days spent so far, counting both the entry and the exit day. Ongoing
    /// trips run through `today`.
    pub fn days_stayed(&self, today: NaiveDate) -> i64 {
        let end = self.exit_date.unwrap_or(today);
        if end < self.entry_date {
            return 0;
        }
        (end - self.entry_date).num_days() + 1
    }

    pub fn is_ongoing(&self) -> bool {
        self.exit_date.is_none()
    }
}

impl From<&Trip> for Visit {
    fn from(trip: &Trip) -> Self {
        Visit::new(trip.country.clone(), trip.entry_date, trip.exit_date)
    }
}

#[derive(Deserialize, Debug, Clone, Validate, JsonSchema)]
#[validate(schema(function = "validate_trip_dates"))]
pub struct TripRequest {
    #[validate(length(min = 2, max = 100))]
    pub country: String,
    pub entry_date: NaiveDate,
    pub exit_date: Option<NaiveDate>,
    #[serde(default)]
    pub visa_type: VisaType,
    #[validate(range(min = 0, max = 3650))]
    pub max_days: i32,
    #[validate(length(min = 2, max = 100))]
    pub passport_country: String,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

fn validate_trip_dates(request: &TripRequest) -> Result<(), ValidationError> {
    check_supported_dates(std::iter::once(request.entry_date).chain(request.exit_date))?;
    if let Some(exit_date) = request.exit_date
        && exit_date < request.entry_date
    {
        return Err(ValidationError::new("exit_date_before_entry_date").with_message("Exit date must not be before the entry date".into()));
    }
    Ok(())
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct TripResponse {
    pub id: Uuid,
    pub country: String,
    pub entry_date: NaiveDate,
    pub exit_date: Option<NaiveDate>,
    pub visa_type: VisaType,
    pub max_days: i32,
    pub passport_country: String,
    pub notes: Option<String>,
    pub is_schengen: bool,
    pub stay: StayUsage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TripResponse {
    pub fn new(trip: &Trip, today: NaiveDate) -> Self {
        Self {
            id: trip.id,
            country: trip.country.clone(),
            entry_date: trip.entry_date,
            exit_date: trip.exit_date,
            visa_type: trip.visa_type,
            max_days: trip.max_days,
            passport_country: trip.passport_country.clone(),
            notes: trip.notes.clone(),
            is_schengen: crate::schengen::is_schengen_country(&trip.country),
            stay: stay_usage(trip.days_stayed(today), i64::from(trip.max_days)),
            created_at: trip.created_at,
            updated_at: trip.updated_at,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_trip(country: &str, entry_date: NaiveDate, exit_date: Option<NaiveDate>) -> Trip {
    Trip {
        id: Uuid::new_v4(),
        user_id: Uuid::nil(),
        country: country.to_string(),
        entry_date,
        exit_date,
        visa_type: VisaType::Tourist,
        max_days: 90,
        passport_country: "South Korea".to_string(),
        notes: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
