use crate::models::check_supported_dates;
use crate::models::trip::VisaType;
use crate::schengen::{StayUsage, stay_usage};
use chrono::{DateTime, NaiveDate, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Serialize, Debug, Clone, sqlx::FromRow)]
pub struct UserVisa {
    pub id: Uuid,
    pub user_id: Uuid,
    pub country: String,
    pub visa_type: VisaType,
    pub issue_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub max_stay_days: i32,
    pub is_multiple_entry: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, sqlx::FromRow)]
pub struct VisaEntry {
    pub id: Uuid,
    pub user_visa_id: Uuid,
    pub entry_date: NaiveDate,
    pub exit_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl VisaEntry {
    /// Inclusive day count, ongoing entries run through `today`.
    pub fn days(&self, today: NaiveDate) -> i64 {
        let end = self.exit_date.unwrap_or(today);
        if end < self.entry_date { 0 } else { (end - self.entry_date).num_days() + 1 }
    }
}

impl UserVisa {
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiry_date - today).num_days()
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }

    pub fn stay_summary(&self, entries: &[VisaEntry], today: NaiveDate) -> VisaStaySummary {
        let days_used: i64 = entries.iter().map(|entry| entry.days(today)).sum();
        let max_days = i64::from(self.max_stay_days);
        let is_expired = self.is_expired(today);
        let inside = entries.iter().any(|entry| entry.exit_date.is_none());
        let can_enter = !is_expired && !inside && (self.is_multiple_entry || entries.is_empty()) && days_used < max_days;

        VisaStaySummary {
            visa_id: self.id,
            country: self.country.clone(),
            entry_count: entries.len(),
            days_used,
            remaining_days: (max_days - days_used).max(0),
            usage: stay_usage(days_used, max_days),
            days_until_expiry: self.days_until_expiry(today),
            is_expired,
            can_enter,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Validate, JsonSchema)]
#[validate(schema(function = "validate_visa_dates"))]
pub struct VisaRequest {
    #[validate(length(min = 2, max = 100))]
    pub country: String,
    #[serde(default)]
    pub visa_type: VisaType,
    pub issue_date: NaiveDate,
    pub expiry_date: NaiveDate,
    #[validate(range(min = 0, max = 3650))]
    pub max_stay_days: i32,
    #[serde(default)]
    pub is_multiple_entry: bool,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

fn validate_visa_dates(request: &VisaRequest) -> Result<(), ValidationError> {
    check_supported_dates([request.issue_date, request.expiry_date])?;
    if request.expiry_date < request.issue_date {
        return Err(ValidationError::new("expiry_date_before_issue_date").with_message("Expiry date must not be before the issue date".into()));
    }
    Ok(())
}

#[derive(Deserialize, Debug, Clone, Validate, JsonSchema)]
#[validate(schema(function = "validate_entry_dates"))]
pub struct VisaEntryRequest {
    pub entry_date: NaiveDate,
    pub exit_date: Option<NaiveDate>,
}

fn validate_entry_dates(request: &VisaEntryRequest) -> Result<(), ValidationError> {
    check_supported_dates(std::iter::once(request.entry_date).chain(request.exit_date))?;
    if let Some(exit_date) = request.exit_date
        && exit_date < request.entry_date
    {
        return Err(ValidationError::new("exit_date_before_entry_date").with_message("Exit date must not be before the entry date".into()));
    }
    Ok(())
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct VisaResponse {
    pub id: Uuid,
    pub country: String,
    pub visa_type: VisaType,
    pub issue_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub max_stay_days: i32,
    pub is_multiple_entry: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&UserVisa> for VisaResponse {
    fn from(visa: &UserVisa) -> Self {
        Self {
            id: visa.id,
            country: visa.country.clone(),
            visa_type: visa.visa_type,
            issue_date: visa.issue_date,
            expiry_date: visa.expiry_date,
            max_stay_days: visa.max_stay_days,
            is_multiple_entry: visa.is_multiple_entry,
            notes: visa.notes.clone(),
            created_at: visa.created_at,
        }
    }
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct VisaEntryResponse {
    pub id: Uuid,
    pub entry_date: NaiveDate,
    pub exit_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl From<&VisaEntry> for VisaEntryResponse {
    fn from(entry: &VisaEntry) -> Self {
        Self {
            id: entry.id,
            entry_date: entry.entry_date,
            exit_date: entry.exit_date,
            created_at: entry.created_at,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct VisaStaySummary {
    pub visa_id: Uuid,
    pub country: String,
    pub entry_count: usize,
    pub days_used: i64,
    pub remaining_days: i64,
    pub usage: StayUsage,
    /// Negative once the visa has expired.
    pub days_until_expiry: i64,
    pub is_expired: bool,
    /// Whether a new entry is possible today.
    pub can_enter: bool,
}

#[cfg(test)]
pub(crate) fn sample_visa(country: &str, issue_date: NaiveDate, expiry_date: NaiveDate) -> UserVisa {
    UserVisa {
        id: Uuid::new_v4(),
        user_id: Uuid::nil(),
        country: country.to_string(),
        visa_type: VisaType::DigitalNomad,
        issue_date,
        expiry_date,
        max_stay_days: 90,
        is_multiple_entry: true,
        notes: None,
        created_at: Utc::now(),
    }
}
