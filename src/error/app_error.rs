use rocket::http::{ContentType, Status};
use rocket::response::Responder;
use rocket::{Request, Response};
use rocket_okapi::OpenApiError;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::response::OpenApiResponderInner;
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Cursor;
use thiserror::Error;
use tracing::{error, warn};
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error")]
    Db {
        message: String,
        #[source]
        source: sqlx::error::Error,
    },
    #[error("User not found")]
    UserNotFound,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Internal server error")]
    PasswordHash { message: String },
    #[error("User {0} already exists")]
    UserAlreadyExists(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal server error")]
    UuidError {
        message: String,
        #[source]
        source: uuid::Error,
    },
    #[error("Validation failed")]
    ValidationError(#[from] ValidationErrors),
}

/// JSON body of every error response.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct ErrorBody {
    pub message: String,
    /// Field path to validation messages. Nested fields are dotted
    /// (`email.sender`), list items indexed (`items[0].name`), and
    /// schema-level errors use `__all__`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Vec<String>>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }
}

pub(crate) fn field_errors(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    let mut fields = BTreeMap::new();
    collect_field_errors(errors, None, &mut fields);
    fields
}

fn collect_field_errors(errors: &ValidationErrors, prefix: Option<&str>, fields: &mut BTreeMap<String, Vec<String>>) {
    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{field}"),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(errors) => {
                fields.entry(path).or_default().extend(errors.iter().map(error_message));
            }
            ValidationErrorsKind::Struct(nested) => collect_field_errors(nested, Some(&path), fields),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_field_errors(nested, Some(&format!("{path}[{index}]")), fields);
                }
            }
        }
    }
}

fn error_message(error: &ValidationError) -> String {
    error.message.as_ref().map_or_else(|| error.code.to_string(), |message| message.to_string())
}

impl AppError {
    pub fn db(message: impl Into<String>, source: sqlx::error::Error) -> Self {
        Self::Db {
            message: message.into(),
            source,
        }
    }

    pub fn uuid(message: impl Into<String>, source: uuid::Error) -> Self {
        Self::UuidError {
            message: message.into(),
            source,
        }
    }

    pub fn password_hash(message: impl Into<String>, source: password_hash::Error) -> Self {
        Self::PasswordHash {
            message: format!("{}: {}", message.into(), source),
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            AppError::ValidationError(errors) => ErrorBody {
                message: self.to_string(),
                fields: field_errors(errors),
            },
            AppError::UuidError { message, .. } => ErrorBody::new(message.clone()),
            _ => ErrorBody::new(self.to_string()),
        }
    }
}

impl From<password_hash::Error> for AppError {
    fn from(e: password_hash::Error) -> Self {
        AppError::password_hash("Password hashing failed", e)
    }
}

impl From<uuid::Error> for AppError {
    fn from(e: uuid::Error) -> Self {
        AppError::uuid("Invalid UUID", e)
    }
}

impl From<&AppError> for Status {
    fn from(e: &AppError) -> Self {
        match e {
            AppError::UserNotFound => Status::NotFound,
            AppError::InvalidCredentials => Status::Unauthorized,
            AppError::PasswordHash { .. } => Status::InternalServerError,
            AppError::Db { .. } => Status::InternalServerError,
            AppError::Unauthorized => Status::Unauthorized,
            AppError::UserAlreadyExists(_) => Status::Conflict,
            AppError::BadRequest(_) => Status::BadRequest,
            AppError::NotFound(_) => Status::NotFound,
            AppError::Conflict(_) => Status::Conflict,
            AppError::UuidError { .. } => Status::BadRequest,
            AppError::ValidationError(_) => Status::BadRequest,
        }
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &Request<'_>) -> rocket::response::Result<'static> {
        let method = req.method();
        let uri = req.uri();

        let request_id = crate::middleware::RequestId::of(req).map_or("unknown", |id| id.0.as_str());

        let user_id = req
            .local_cache(|| None::<crate::auth::CurrentUser>)
            .as_ref()
            .map(|u| u.id.to_string())
            .unwrap_or_else(|| "anonymous".to_string());

        let status = Status::from(&self);
        if status.class().is_server_error() {
            error!(
                error = ?self,
                request_id = %request_id,
                user_id = %user_id,
                method = %method,
                uri = %uri,
                "request failed"
            );
        } else {
            warn!(
                error = %self,
                request_id = %request_id,
                user_id = %user_id,
                method = %method,
                uri = %uri,
                status = status.code,
                "request rejected"
            );
        }

        let body = serde_json::to_string(&self.body()).map_err(|_| Status::InternalServerError)?;

        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

impl OpenApiResponderInner for AppError {
    fn responses(_gen: &mut OpenApiGenerator) -> Result<Responses, OpenApiError> {
        use rocket_okapi::okapi::openapi3::{RefOr, Response as OpenApiResponse};
        let mut responses = Responses::default();
        for (code, description) in [
            ("400", "Bad Request"),
            ("401", "Unauthorized"),
            ("403", "Forbidden"),
            ("404", "Not Found"),
            ("409", "Conflict"),
            ("500", "Internal Server Error"),
        ] {
            responses.responses.insert(
                code.to_string(),
                RefOr::Object(OpenApiResponse {
                    description: description.to_string(),
                    ..Default::default()
                }),
            );
        }
        Ok(responses)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            _ => AppError::db("Database error", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Signup {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn validation_errors_become_field_messages() {
        let errors = Signup {
            name: String::new(),
            email: "not-an-email".to_string(),
        }
        .validate()
        .unwrap_err();

        let body = AppError::from(errors).body();
        assert_eq!(body.message, "Validation failed");
        assert_eq!(body.fields["name"], vec!["Name is required".to_string()]);
        assert_eq!(body.fields["email"], vec!["email".to_string()]);
    }

    #[test]
    fn nested_validation_errors_use_dotted_paths() {
        use crate::models::email::{ImportEmailRequest, ParseEmailRequest};
        use crate::models::trip::VisaType;

        let errors = ImportEmailRequest {
            email: ParseEmailRequest {
                sender: "x".to_string(),
                subject: String::new(),
                body: String::new(),
            },
            visa_type: VisaType::Tourist,
            max_days: None,
            passport_country: "K".to_string(),
        }
        .validate()
        .unwrap_err();

        let body = AppError::from(errors).body();
        assert_eq!(body.message, "Validation failed");
        assert_eq!(body.fields["email.sender"].len(), 1);
        assert_eq!(body.fields["email.body"].len(), 1);
        assert!(body.fields.contains_key("passport_country"));
        assert!(!body.fields.contains_key("email"));

        let json = serde_json::to_value(&body).unwrap();
        assert!(json["fields"]["email.sender"].is_array());
    }

    #[test]
    fn internal_errors_hide_details() {
        let error = AppError::db("Failed to insert trip", sqlx::Error::PoolTimedOut);
        assert_eq!(Status::from(&error), Status::InternalServerError);
        assert_eq!(error.body(), ErrorBody::new("Internal server error"));
    }

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(Status::from(&AppError::InvalidCredentials), Status::Unauthorized);
        assert_eq!(Status::from(&AppError::UserAlreadyExists("a@b.c".to_string())), Status::Conflict);
        assert_eq!(Status::from(&AppError::from(sqlx::Error::RowNotFound)), Status::NotFound);

        let uuid_error = AppError::from(uuid::Uuid::parse_str("nope").unwrap_err());
        assert_eq!(Status::from(&uuid_error), Status::BadRequest);
        assert_eq!(uuid_error.body().message, "Invalid UUID");
    }

    #[test]
    fn error_body_omits_empty_fields() {
        let json = serde_json::to_value(ErrorBody::new("Not found")).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "Not found" }));
    }
}
