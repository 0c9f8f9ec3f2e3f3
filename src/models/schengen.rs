use crate::models::check_supported_dates;
use crate::schengen::{ComplianceLevel, MAX_STAY_DAYS, PlannedTrip, SafeTravelWindow, SchengenStatus};
use chrono::NaiveDate;
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use validator::{Validate, ValidationError};

#[derive(Deserialize, Debug, Validate, JsonSchema)]
#[validate(schema(function = "validate_planned_dates"))]
pub struct FutureTripRequest {
    #[validate(length(min = 2, max = 100))]
    pub country: String,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
}

fn validate_planned_dates(request: &FutureTripRequest) -> Result<(), ValidationError> {
    check_supported_dates([request.entry_date, request.exit_date])?;
    if request.exit_date < request.entry_date {
        return Err(ValidationError::new("exit_date_before_entry_date").with_message("Exit date must not be before the entry date".into()));
    }
    Ok(())
}

impl From<&FutureTripRequest> for PlannedTrip {
    fn from(request: &FutureTripRequest) -> Self {
        PlannedTrip {
            country: request.country.clone(),
            entry_date: request.entry_date,
            exit_date: request.exit_date,
        }
    }
}

#[derive(Deserialize, Debug, Validate, JsonSchema)]
#[validate(schema(function = "validate_search_start"))]
pub struct SafeDatesRequest {
    #[validate(range(min = 1, max = "MAX_STAY_DAYS"))]
    pub duration_days: i64,
    /// First day the trip may start; today when omitted.
    pub from_date: Option<NaiveDate>,
}

fn validate_search_start(request: &SafeDatesRequest) -> Result<(), ValidationError> {
    check_supported_dates(request.from_date)
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct SafeDatesResponse {
    pub duration_days: i64,
    pub from_date: NaiveDate,
    /// `None` when no start date within a year keeps the trip compliant.
    pub window: Option<SafeTravelWindow>,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct SchengenStatusResponse {
    #[serde(flatten)]
    pub status: SchengenStatus,
    pub level: ComplianceLevel,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct SchengenCountriesResponse {
    pub countries: Vec<&'static str>,
}
