use crate::email::{EmailInput, ParseFailure, ParsedTravelInfo, TripSuggestion};
use crate::models::trip::{TripResponse, VisaType};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use validator::Validate;

const MAX_BODY_BYTES: u64 = 512 * 1024;

#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct ParseEmailRequest {
    #[validate(length(min = 3, max = 320))]
    pub sender: String,
    #[validate(length(max = 998))]
    pub subject: String,
    #[validate(length(min = 1, max = "MAX_BODY_BYTES"))]
    pub body: String,
}

impl From<&ParseEmailRequest> for EmailInput {
    fn from(request: &ParseEmailRequest) -> Self {
        EmailInput {
            sender: request.sender.clone(),
            subject: request.subject.clone(),
            body: request.body.clone(),
        }
    }
}

/// `success` tells "nothing usable in this email" (false, with `error`) apart
/// from a system error, which is a non-2xx response.
#[derive(Serialize, Debug, JsonSchema)]
pub struct ParseEmailResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ParsedTravelInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_suggestion: Option<TripSuggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ParseFailureBody>,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct ParseFailureBody {
    pub message: String,
    #[serde(flatten)]
    pub failure: ParseFailure,
}

impl From<Result<ParsedTravelInfo, ParseFailure>> for ParseEmailResponse {
    fn from(result: Result<ParsedTravelInfo, ParseFailure>) -> Self {
        match result {
            Ok(info) => Self {
                success: true,
                trip_suggestion: info.trip_suggestion(),
                data: Some(info),
                error: None,
            },
            Err(failure) => Self {
                success: false,
                data: None,
                trip_suggestion: None,
                error: Some(ParseFailureBody {
                    message: failure.to_string(),
                    failure,
                }),
            },
        }
    }
}

#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct ImportEmailRequest {
    #[validate(nested)]
    pub email: ParseEmailRequest,
    #[serde(default)]
    pub visa_type: VisaType,
    #[validate(range(min = 0, max = 3650))]
    pub max_days: Option<i32>,
    #[validate(length(min = 2, max = 100))]
    pub passport_country: String,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct ImportEmailResponse {
    pub trip: TripResponse,
    pub parsed: ParsedTravelInfo,
}
