pub mod audit;
pub mod email;
pub mod health;
pub mod notification;
pub mod pagination;
pub mod schengen;
pub mod session;
pub mod trip;
pub mod user;
pub mod visa;

use crate::schengen::{SUPPORTED_YEARS, is_supported_date};
use chrono::NaiveDate;
use validator::ValidationError;

/// Rejects request dates outside the years the calculator works with.
pub(crate) fn check_supported_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Result<(), ValidationError> {
    if dates.into_iter().all(is_supported_date) {
        return Ok(());
    }
    Err(ValidationError::new("date_out_of_range").with_message(
        format!(
            "Dates must fall between the years {} and {}",
            SUPPORTED_YEARS.start(),
            SUPPORTED_YEARS.end()
        )
        .into(),
    ))
}
