use crate::database::trip::TripRepository;
use crate::email::{EmailInput, EmailParser, ParsedTravelInfo};
use crate::error::app_error::AppError;
use crate::models::email::ImportEmailRequest;
use crate::models::trip::{Trip, TripRequest};
use crate::schengen::{MAX_STAY_DAYS, is_schengen_country};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

pub struct EmailImportService<'a, R> {
    repository: &'a R,
    parser: EmailParser,
}

impl<'a, R> EmailImportService<'a, R>
where
    R: TripRepository + Sync,
{
    pub fn new(repository: &'a R, parser: EmailParser) -> Self {
        EmailImportService { repository, parser }
    }

    /// Parses the email and stores the trip it describes.
    pub async fn import(&self, request: &ImportEmailRequest, user_id: &Uuid) -> Result<(Trip, ParsedTravelInfo), AppError> {
        let parsed = self.parser.parse(&EmailInput::from(&request.email)).map_err(|failure| AppError::BadRequest(failure.to_string()))?;
        let trip_request = trip_request_from(&parsed, request)?;
        trip_request.validate()?;

        let trip = self.repository.create_trip(&trip_request, user_id).await?;
        info!(%user_id, trip_id = %trip.id, provider = %parsed.provider, "imported trip from email");

        Ok((trip, parsed))
    }
}

fn trip_request_from(parsed: &ParsedTravelInfo, request: &ImportEmailRequest) -> Result<TripRequest, AppError> {
    let suggestion = parsed
        .trip_suggestion()
        .ok_or_else(|| AppError::BadRequest("The email does not name a destination country and travel date".to_string()))?;

    // Without an explicit limit, Schengen trips get the 90-day allowance and others are untracked.
    let max_days = request
        .max_days
        .unwrap_or(if is_schengen_country(&suggestion.country) { MAX_STAY_DAYS as i32 } else { 0 });

    let notes = match &parsed.confirmation_number {
        Some(confirmation) => format!("Imported from {} confirmation {confirmation}", parsed.provider),
        None => format!("Imported from {} email", parsed.provider),
    };

    Ok(TripRequest {
        country: suggestion.country,
        entry_date: suggestion.entry_date,
        exit_date: suggestion.exit_date,
        visa_type: request.visa_type,
        max_days,
        passport_country: request.passport_country.clone(),
        notes: Some(notes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::email::ParseEmailRequest;
    use crate::models::trip::VisaType;
    use crate::test_utils::MockRepository;
    use chrono::NaiveDate;

    fn import_request(sender: &str, subject: &str, body: &str) -> ImportEmailRequest {
        ImportEmailRequest {
            email: ParseEmailRequest {
                sender: sender.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            },
            visa_type: VisaType::Tourist,
            max_days: None,
            passport_country: "South Korea".to_string(),
        }
    }

    #[tokio::test]
    async fn booking_confirmation_becomes_a_trip() {
        let repository = MockRepository::default();
        let user_id = Uuid::new_v4();
        let request = import_request(
            "Booking.com <noreply@booking.com>",
            "Your booking is confirmed at Hotel Amsterdam Centre",
            "Confirmation number: 4021337890\n\
            Hotel: Hotel Amsterdam Centre\n\
            Address: Damrak 1, 1012 LG Amsterdam, Netherlands\n\
            Check-in: Fri, 5 Apr 2024 (from 15:00)\n\
            Check-out: Mon, 8 Apr 2024 (until 11:00)",
        );

        let (trip, parsed) = EmailImportService::new(&repository, EmailParser::new(0.6, false))
            .import(&request, &user_id)
            .await
            .unwrap();

        assert_eq!(trip.country, "Netherlands");
        assert_eq!(trip.entry_date, NaiveDate::from_ymd_opt(2024, 4, 5).unwrap());
        assert_eq!(trip.exit_date, NaiveDate::from_ymd_opt(2024, 4, 8));
        assert_eq!(trip.notes.as_deref(), Some("Imported from Booking.com confirmation 4021337890"));
        assert_eq!(trip.max_days, 90);
        assert_eq!(trip.user_id, user_id);
        assert_eq!(parsed.confirmation_number.as_deref(), Some("4021337890"));
        assert_eq!(repository.trips_of(&user_id).len(), 1);
    }

    #[tokio::test]
    async fn unparseable_email_is_a_bad_request() {
        let repository = MockRepository::default();
        let request = import_request("friend@example.com", "Lunch?", "See you at noon");

        let result = EmailImportService::new(&repository, EmailParser::new(0.6, false)).import(&request, &Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
