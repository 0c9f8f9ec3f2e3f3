use crate::email::airports::airport_country;
use crate::email::extract::{self, CHECK_IN_LABELS, CHECK_OUT_LABELS, DEPARTURE_LABELS, RETURN_LABELS};
use crate::email::provider::{DetectedBy, Provider, ProviderKind, detect_provider};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const WEIGHT_SENDER_DOMAIN: f64 = 0.30;
const WEIGHT_SUBJECT_KEYWORD: f64 = 0.15;
const WEIGHT_CONFIRMATION: f64 = 0.25;
const WEIGHT_FLIGHT_NUMBER: f64 = 0.15;
const WEIGHT_AIRPORTS: f64 = 0.15;
const WEIGHT_DEPARTURE_DATE: f64 = 0.15;
const WEIGHT_HOTEL_NAME: f64 = 0.10;
const WEIGHT_STAY_DATE: f64 = 0.15;
const WEIGHT_LOCATION: f64 = 0.05;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct EmailInput {
    pub sender: String,
    pub subject: String,
    pub body: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TravelCategory {
    Flight,
    Accommodation,
}

#[derive(Serialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct ParsedTravelInfo {
    pub provider: Provider,
    pub detected_by: DetectedBy,
    pub category: TravelCategory,
    pub confirmation_number: Option<String>,
    pub flight_number: Option<String>,
    pub departure_airport: Option<String>,
    pub arrival_airport: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub hotel_name: Option<String>,
    pub check_in_date: Option<NaiveDate>,
    pub check_out_date: Option<NaiveDate>,
    pub destination_country: Option<String>,
    /// Heuristic estimate in `[0, 1]` that the extracted data is correct.
    pub confidence: f64,
}

/// A trip the client can pre-fill from a parsed confirmation.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct TripSuggestion {
    pub country: String,
    pub entry_date: NaiveDate,
    pub exit_date: Option<NaiveDate>,
}

impl ParsedTravelInfo {
    pub fn trip_suggestion(&self) -> Option<TripSuggestion> {
        let country = self.destination_country.clone()?;
        let (entry_date, exit_date) = match self.category {
            TravelCategory::Flight => (self.departure_date?, self.return_date),
            TravelCategory::Accommodation => (self.check_in_date?, self.check_out_date),
        };

        Some(TripSuggestion {
            country,
            entry_date,
            exit_date: exit_date.filter(|exit| *exit >= entry_date),
        })
    }

    fn missing_required_fields(&self) -> Vec<String> {
        let required = match self.category {
            TravelCategory::Flight => [
                ("confirmation_number", self.confirmation_number.is_some()),
                ("flight_number", self.flight_number.is_some()),
                ("departure_date", self.departure_date.is_some()),
            ],
            TravelCategory::Accommodation => [
                ("confirmation_number", self.confirmation_number.is_some()),
                ("check_in_date", self.check_in_date.is_some()),
                ("check_out_date", self.check_out_date.is_some()),
            ],
        };

        required.into_iter().filter(|(_, present)| !present).map(|(field, _)| field.to_string()).collect()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Error, JsonSchema)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ParseFailure {
    #[error("Sender and subject do not match a supported travel provider")]
    UnknownProvider,
    #[error("No travel details found in the {provider} email")]
    NoTravelData { provider: Provider },
    #[error("Confidence {score:.2} is below the threshold {threshold:.2}")]
    LowConfidence { score: f64, threshold: f64 },
    #[error("Missing required fields: {}", .fields.join(", "))]
    MissingRequiredFields { fields: Vec<String> },
}

#[derive(Debug, Clone, Copy)]
pub struct EmailParser {
    confidence_threshold: f64,
    strict_mode: bool,
}

impl EmailParser {
    pub fn new(confidence_threshold: f64, strict_mode: bool) -> Self {
        Self {
            confidence_threshold: confidence_threshold.clamp(0.0, 1.0),
            strict_mode,
        }
    }

    pub fn parse(&self, input: &EmailInput) -> Result<ParsedTravelInfo, ParseFailure> {
        let (profile, detected_by) = detect_provider(&input.sender, &input.subject).ok_or(ParseFailure::UnknownProvider)?;
        let text = extract::normalize_text(&format!("{}\n{}", input.subject, input.body));

        let mut score = match detected_by {
            DetectedBy::SenderDomain => WEIGHT_SENDER_DOMAIN,
            DetectedBy::SubjectKeyword => WEIGHT_SUBJECT_KEYWORD,
        };

        let confirmation_number = extract::confirmation_number(&text);
        if confirmation_number.is_some() {
            score += WEIGHT_CONFIRMATION;
        }

        let flight_number = match profile.kind {
            ProviderKind::Airline | ProviderKind::Agency => extract::flight_number(&text, profile.airline_codes),
            ProviderKind::Accommodation => None,
        };

        let category = match (profile.kind, &flight_number) {
            (ProviderKind::Airline, _) | (ProviderKind::Agency, Some(_)) => TravelCategory::Flight,
            _ => TravelCategory::Accommodation,
        };

        let mut parsed = ParsedTravelInfo {
            provider: profile.provider,
            detected_by,
            category,
            confirmation_number,
            flight_number,
            departure_airport: None,
            arrival_airport: None,
            departure_date: None,
            return_date: None,
            hotel_name: None,
            check_in_date: None,
            check_out_date: None,
            destination_country: None,
            confidence: 0.0,
        };

        let found_details = match category {
            TravelCategory::Flight => {
                score += Self::fill_flight(&mut parsed, &text);
                parsed.flight_number.is_some() || parsed.departure_date.is_some() || parsed.arrival_airport.is_some()
            }
            TravelCategory::Accommodation => {
                score += Self::fill_accommodation(&mut parsed, &text);
                parsed.hotel_name.is_some() || parsed.check_in_date.is_some()
            }
        };

        if !found_details && parsed.confirmation_number.is_none() {
            return Err(ParseFailure::NoTravelData { provider: parsed.provider });
        }

        parsed.confidence = (score.min(1.0) * 100.0).round() / 100.0;

        if self.strict_mode {
            let missing = parsed.missing_required_fields();
            if !missing.is_empty() {
                return Err(ParseFailure::MissingRequiredFields { fields: missing });
            }
        }

        if parsed.confidence < self.confidence_threshold {
            return Err(ParseFailure::LowConfidence {
                score: parsed.confidence,
                threshold: self.confidence_threshold,
            });
        }

        Ok(parsed)
    }

    fn fill_flight(parsed: &mut ParsedTravelInfo, text: &str) -> f64 {
        let mut score = 0.0;
        if parsed.flight_number.is_some() {
            score += WEIGHT_FLIGHT_NUMBER;
        }

        if let Some((from, to)) = extract::airport_codes(text) {
            parsed.destination_country = airport_country(&to).map(str::to_string);
            parsed.departure_airport = Some(from);
            parsed.arrival_airport = Some(to);
            score += WEIGHT_AIRPORTS;
        }

        let all_dates = extract::dates(text);
        parsed.departure_date = extract::date_after_label(text, DEPARTURE_LABELS).or_else(|| all_dates.first().copied());
        parsed.return_date = extract::date_after_label(text, RETURN_LABELS)
            .or_else(|| all_dates.iter().copied().filter(|date| Some(*date) > parsed.departure_date).last())
            .filter(|date| Some(*date) > parsed.departure_date);
        if parsed.departure_date.is_some() {
            score += WEIGHT_DEPARTURE_DATE;
        }

        score
    }

    fn fill_accommodation(parsed: &mut ParsedTravelInfo, text: &str) -> f64 {
        let mut score = 0.0;

        parsed.hotel_name = extract::hotel_name(text);
        if parsed.hotel_name.is_some() {
            score += WEIGHT_HOTEL_NAME;
        }

        let all_dates = extract::dates(text);
        parsed.check_in_date = extract::date_after_label(text, CHECK_IN_LABELS).or_else(|| all_dates.first().copied());
        parsed.check_out_date = extract::date_after_label(text, CHECK_OUT_LABELS)
            .filter(|date| Some(*date) > parsed.check_in_date)
            .or_else(|| all_dates.iter().copied().find(|date| Some(*date) > parsed.check_in_date));
        score += WEIGHT_STAY_DATE * [parsed.check_in_date, parsed.check_out_date].iter().flatten().count() as f64;

        parsed.destination_country = extract::country_mention(text).map(str::to_string);
        if parsed.destination_country.is_some() {
            score += WEIGHT_LOCATION;
        }

        score
    }
}
