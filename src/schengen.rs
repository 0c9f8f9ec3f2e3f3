//! Schengen 90/180-day rule: no more than 90 days of presence in the
//! Schengen area within any rolling 180-day window.
//!
//! Everything here is pure and synchronous; callers load visits from the
//! database and pass an explicit reference date.

mod calculator;
mod countries;
mod planner;
mod timeline;

pub use calculator::{ComplianceLevel, SchengenStatus, StayUsage, Violation, calculate_status, compliance_level, stay_usage};
pub use countries::{SCHENGEN_COUNTRIES, is_schengen_country};
pub use planner::{FutureTripValidation, PlannedTrip, SafeTravelWindow, get_safe_travel_dates, validate_future_trip};

use chrono::{Datelike, NaiveDate};
use std::ops::RangeInclusive;

/// Allowance of days inside the window.
pub const MAX_STAY_DAYS: i64 = 90;
/// Length of the rolling lookback window, reference day included.
pub const WINDOW_DAYS: i64 = 180;
/// How far ahead the safe-date search looks.
pub const SAFE_DATE_SEARCH_DAYS: i64 = 365;
/// Calendar years accepted from callers. Window arithmetic on anything
/// outside this range is never attempted.
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 1900..=2199;

pub fn is_supported_date(date: NaiveDate) -> bool {
    SUPPORTED_YEARS.contains(&date.year())
}

/// The part of a country visit the calculator needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub country: String,
    pub entry_date: NaiveDate,
    /// `None` while the stay is ongoing.
    pub exit_date: Option<NaiveDate>,
}

impl Visit {
    pub fn new(country: impl Into<String>, entry_date: NaiveDate, exit_date: Option<NaiveDate>) -> Self {
        Self {
            country: country.into(),
            entry_date,
            exit_date,
        }
    }
}
