//! Travel data extraction from booking confirmation emails.

mod airports;
mod extract;
mod parser;
mod provider;

pub use airports::{airport_country, known_countries};
pub use parser::{EmailInput, EmailParser, ParseFailure, ParsedTravelInfo, TravelCategory, TripSuggestion};
pub use provider::{DetectedBy, Provider, detect_provider};
