use crate::database::trip::TripRepository;
use crate::database::visa::VisaRepository;
use crate::error::app_error::AppError;
use crate::models::pagination::PaginationParams;
use crate::models::trip::{Trip, TripRequest};
use crate::models::visa::{UserVisa, VisaEntry, VisaEntryRequest, VisaRequest};
use crate::{Config, build_rocket};
use chrono::Utc;
use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;
use std::sync::Mutex;
use uuid::Uuid;

/// In-memory stand-in for `PostgresRepository`.
#[derive(Default)]
pub struct MockRepository {
    trips: Mutex<Vec<Trip>>,
    visas: Mutex<Vec<UserVisa>>,
    entries: Mutex<Vec<VisaEntry>>,
}

impl MockRepository {
    pub fn add_trip(&self, trip: Trip) {
        self.trips.lock().unwrap().push(trip);
    }

    pub fn add_visa(&self, visa: UserVisa) {
        self.visas.lock().unwrap().push(visa);
    }

    pub fn trips_of(&self, user_id: &Uuid) -> Vec<Trip> {
        let mut trips: Vec<Trip> = self.trips.lock().unwrap().iter().filter(|trip| trip.user_id == *user_id).cloned().collect();
        trips.sort_by_key(|trip| trip.entry_date);
        trips
    }
}

fn trip_from_request(id: Uuid, user_id: Uuid, request: &TripRequest) -> Trip {
    let now = Utc::now();
    Trip {
        id,
        user_id,
        country: request.country.clone(),
        entry_date: request.entry_date,
        exit_date: request.exit_date,
        visa_type: request.visa_type,
        max_days: request.max_days,
        passport_country: request.passport_country.clone(),
        notes: request.notes.clone(),
        created_at: now,
        updated_at: now,
    }
}

fn visa_from_request(id: Uuid, user_id: Uuid, request: &VisaRequest) -> UserVisa {
    UserVisa {
        id,
        user_id,
        country: request.country.clone(),
        visa_type: request.visa_type,
        issue_date: request.issue_date,
        expiry_date: request.expiry_date,
        max_stay_days: request.max_stay_days,
        is_multiple_entry: request.is_multiple_entry,
        notes: request.notes.clone(),
        created_at: Utc::now(),
    }
}

#[async_trait::async_trait]
impl TripRepository for MockRepository {
    async fn create_trip(&self, request: &TripRequest, user_id: &Uuid) -> Result<Trip, AppError> {
        let trip = trip_from_request(Uuid::new_v4(), *user_id, request);
        self.add_trip(trip.clone());
        Ok(trip)
    }

    async fn get_trip(&self, id: &Uuid, user_id: &Uuid) -> Result<Option<Trip>, AppError> {
        Ok(self.trips_of(user_id).into_iter().find(|trip| trip.id == *id))
    }

    async fn list_trips(&self, pagination: &PaginationParams, user_id: &Uuid) -> Result<(Vec<Trip>, i64), AppError> {
        let mut trips = self.trips_of(user_id);
        trips.reverse();
        let total = trips.len() as i64;

        let offset = pagination.offset().unwrap_or(0) as usize;
        let limit = pagination.effective_limit().map_or(usize::MAX, |limit| limit as usize);
        Ok((trips.into_iter().skip(offset).take(limit).collect(), total))
    }

    async fn list_all_trips(&self, user_id: &Uuid) -> Result<Vec<Trip>, AppError> {
        Ok(self.trips_of(user_id))
    }

    async fn update_trip(&self, id: &Uuid, request: &TripRequest, user_id: &Uuid) -> Result<Option<Trip>, AppError> {
        let mut trips = self.trips.lock().unwrap();
        let Some(trip) = trips.iter_mut().find(|trip| trip.id == *id && trip.user_id == *user_id) else {
            return Ok(None);
        };
        *trip = Trip {
            created_at: trip.created_at,
            ..trip_from_request(*id, *user_id, request)
        };
        Ok(Some(trip.clone()))
    }

    async fn delete_trip(&self, id: &Uuid, user_id: &Uuid) -> Result<bool, AppError> {
        let mut trips = self.trips.lock().unwrap();
        let before = trips.len();
        trips.retain(|trip| !(trip.id == *id && trip.user_id == *user_id));
        Ok(trips.len() < before)
    }
}

#[async_trait::async_trait]
impl VisaRepository for MockRepository {
    async fn create_visa(&self, request: &VisaRequest, user_id: &Uuid) -> Result<UserVisa, AppError> {
        let visa = visa_from_request(Uuid::new_v4(), *user_id, request);
        self.add_visa(visa.clone());
        Ok(visa)
    }

    async fn get_visa(&self, id: &Uuid, user_id: &Uuid) -> Result<Option<UserVisa>, AppError> {
        Ok(self.visas.lock().unwrap().iter().find(|visa| visa.id == *id && visa.user_id == *user_id).cloned())
    }

    async fn list_visas(&self, user_id: &Uuid) -> Result<Vec<UserVisa>, AppError> {
        let mut visas: Vec<UserVisa> = self.visas.lock().unwrap().iter().filter(|visa| visa.user_id == *user_id).cloned().collect();
        visas.sort_by_key(|visa| visa.expiry_date);
        Ok(visas)
    }

    async fn update_visa(&self, id: &Uuid, request: &VisaRequest, user_id: &Uuid) -> Result<Option<UserVisa>, AppError> {
        let mut visas = self.visas.lock().unwrap();
        let Some(visa) = visas.iter_mut().find(|visa| visa.id == *id && visa.user_id == *user_id) else {
            return Ok(None);
        };
        *visa = UserVisa {
            created_at: visa.created_at,
            ..visa_from_request(*id, *user_id, request)
        };
        Ok(Some(visa.clone()))
    }

    async fn delete_visa(&self, id: &Uuid, user_id: &Uuid) -> Result<bool, AppError> {
        let mut visas = self.visas.lock().unwrap();
        let before = visas.len();
        visas.retain(|visa| !(visa.id == *id && visa.user_id == *user_id));
        let deleted = visas.len() < before;
        if deleted {
            self.entries.lock().unwrap().retain(|entry| entry.user_visa_id != *id);
        }
        Ok(deleted)
    }

    async fn create_visa_entry(&self, visa_id: &Uuid, request: &VisaEntryRequest) -> Result<VisaEntry, AppError> {
        let entry = VisaEntry {
            id: Uuid::new_v4(),
            user_visa_id: *visa_id,
            entry_date: request.entry_date,
            exit_date: request.exit_date,
            created_at: Utc::now(),
        };
        self.entries.lock().unwrap().push(entry.clone());
        Ok(entry)
    }

    async fn list_visa_entries(&self, visa_id: &Uuid) -> Result<Vec<VisaEntry>, AppError> {
        let mut entries: Vec<VisaEntry> = self.entries.lock().unwrap().iter().filter(|entry| entry.user_visa_id == *visa_id).cloned().collect();
        entries.sort_by_key(|entry| entry.entry_date);
        Ok(entries)
    }

    async fn delete_visa_entry(&self, visa_id: &Uuid, entry_id: &Uuid) -> Result<bool, AppError> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|entry| !(entry.id == *entry_id && entry.user_visa_id == *visa_id));
        Ok(entries.len() < before)
    }
}

/// Client over the full application with CSRF disabled. Migrations only run
/// when `DATABASE_URL` points at a real database.
pub async fn test_client() -> Client {
    let mut config = Config::default();
    match std::env::var("DATABASE_URL") {
        Ok(url) => config.database.url = url,
        Err(_) => config.database.run_migrations = false,
    }
    config.csrf.enabled = false;
    config.rate_limit.auth_limit = 1000;

    let rocket = build_rocket(config).expect("valid configuration");
    Client::tracked(rocket).await.expect("valid rocket instance")
}

/// Registers a fresh account; the tracked client keeps its session cookie.
pub async fn sign_up(client: &Client) -> Uuid {
    let payload = serde_json::json!({
        "name": "Test Nomad",
        "email": format!("nomad.{}@example.com", Uuid::new_v4()),
        "password": "wandering1",
    });
    let response = client.post("/api/users").header(ContentType::JSON).body(payload.to_string()).dispatch().await;
    assert_eq!(response.status(), Status::Created);

    let body: serde_json::Value = serde_json::from_str(&response.into_string().await.expect("response body")).expect("user json");
    body["id"].as_str().and_then(|id| Uuid::parse_str(id).ok()).expect("user id")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trip::{VisaType, sample_trip};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn trips_are_scoped_and_paginated() {
        let repository = MockRepository::default();
        let user_id = Uuid::new_v4();
        for day in 1..=5 {
            repository.add_trip(Trip {
                user_id,
                ..sample_trip("Portugal", date(2024, 1, day), Some(date(2024, 1, day)))
            });
        }
        repository.add_trip(sample_trip("Portugal", date(2024, 2, 1), None));

        let (page, total) = repository.list_trips(&PaginationParams::new(Some(2), Some(2)), &user_id).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.iter().map(|trip| trip.entry_date).collect::<Vec<_>>(), vec![date(2024, 1, 3), date(2024, 1, 2)]);
    }

    #[tokio::test]
    async fn updates_keep_creation_time() {
        let repository = MockRepository::default();
        let user_id = Uuid::new_v4();
        let request = TripRequest {
            country: "Spain".to_string(),
            entry_date: date(2024, 3, 1),
            exit_date: None,
            visa_type: VisaType::Tourist,
            max_days: 90,
            passport_country: "South Korea".to_string(),
            notes: None,
        };
        let created = repository.create_trip(&request, &user_id).await.unwrap();

        let update = TripRequest {
            exit_date: Some(date(2024, 3, 9)),
            ..request
        };
        let updated = repository.update_trip(&created.id, &update, &user_id).await.unwrap().unwrap();
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.exit_date, Some(date(2024, 3, 9)));
        assert!(repository.update_trip(&created.id, &update, &Uuid::new_v4()).await.unwrap().is_none());
    }
}
