use crate::error::app_error::ErrorBody;
use crate::middleware::csrf::CsrfError;
use crate::middleware::rate_limit::RateLimitRetryAfter;
use rocket::http::Header;
use rocket::serde::json::Json;
use rocket::{Request, Responder, catch};

fn body(message: &str) -> Json<ErrorBody> {
    Json(ErrorBody::new(message))
}

#[catch(400)]
pub fn bad_request(_: &Request) -> Json<ErrorBody> {
    body("Bad request")
}

#[catch(401)]
pub fn unauthorized(_: &Request) -> Json<ErrorBody> {
    body("Authentication required")
}

#[catch(403)]
pub fn forbidden(request: &Request) -> Json<ErrorBody> {
    match request.local_cache(|| None::<CsrfError>) {
        Some(error) => body(error.message()),
        None => body("Forbidden"),
    }
}

#[catch(404)]
pub fn not_found(_: &Request) -> Json<ErrorBody> {
    body("Not found")
}

#[catch(409)]
pub fn conflict(_: &Request) -> Json<ErrorBody> {
    body("Conflict")
}

/// Rocket answers 422 for JSON bodies that do not deserialise.
#[catch(422)]
pub fn unprocessable_entity(_: &Request) -> Json<ErrorBody> {
    body("Request body could not be parsed")
}

#[derive(Responder)]
#[response(status = 429)]
pub struct TooManyRequests {
    body: Json<ErrorBody>,
    retry_after: Header<'static>,
}

#[catch(429)]
pub fn too_many_requests(request: &Request) -> TooManyRequests {
    let retry_after = request.local_cache(|| None::<RateLimitRetryAfter>).as_ref().map_or(1, |retry| retry.0);

    TooManyRequests {
        body: body("Too many requests"),
        retry_after: Header::new("Retry-After", retry_after.to_string()),
    }
}

#[catch(500)]
pub fn internal_error(_: &Request) -> Json<ErrorBody> {
    body("Internal server error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use rocket::{catchers, get, routes};

    #[get("/boom")]
    fn boom() -> Status {
        Status::InternalServerError
    }

    #[rocket::async_test]
    async fn catchers_answer_with_json() {
        let rocket = rocket::build()
            .mount("/", routes![boom])
            .register("/", catchers![not_found, internal_error]);
        let client = Client::tracked(rocket).await.expect("valid rocket instance");

        let response = client.get("/missing").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        assert_eq!(response.content_type(), Some(ContentType::JSON));
        assert_eq!(response.into_string().await.as_deref(), Some(r#"{"message":"Not found"}"#));

        let response = client.get("/boom").dispatch().await;
        assert_eq!(response.status(), Status::InternalServerError);
        assert_eq!(response.into_string().await.as_deref(), Some(r#"{"message":"Internal server error"}"#));
    }
}
