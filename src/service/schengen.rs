use crate::cache::TtlCache;
use crate::database::trip::TripRepository;
use crate::error::app_error::AppError;
use crate::schengen::{FutureTripValidation, PlannedTrip, SafeTravelWindow, SchengenStatus, Visit, calculate_status, get_safe_travel_dates, validate_future_trip};
use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

/// Computed statuses keyed by user and reference date.
pub type StatusCache = TtlCache<(Uuid, NaiveDate), SchengenStatus>;

pub struct SchengenService<'a, R> {
    repository: &'a R,
    cache: &'a StatusCache,
}

impl<'a, R> SchengenService<'a, R>
where
    R: TripRepository + Sync,
{
    pub fn new(repository: &'a R, cache: &'a StatusCache) -> Self {
        SchengenService { repository, cache }
    }

    async fn visits(&self, user_id: &Uuid) -> Result<Vec<Visit>, AppError> {
        let trips = self.repository.list_all_trips(user_id).await?;
        Ok(trips.iter().map(Visit::from).collect())
    }

    pub async fn status(&self, user_id: &Uuid, reference_date: NaiveDate) -> Result<SchengenStatus, AppError> {
        let key = (*user_id, reference_date);
        if let Some(status) = self.cache.get(&key).await {
            debug!(%user_id, %reference_date, "schengen status served from cache");
            return Ok(status);
        }

        let status = calculate_status(&self.visits(user_id).await?, reference_date);
        self.cache.insert(key, status.clone()).await;

        Ok(status)
    }

    pub async fn validate_trip(&self, user_id: &Uuid, trip: &PlannedTrip, today: NaiveDate) -> Result<FutureTripValidation, AppError> {
        Ok(validate_future_trip(&self.visits(user_id).await?, trip, today))
    }

    pub async fn safe_dates(&self, user_id: &Uuid, duration_days: i64, from_date: NaiveDate) -> Result<Option<SafeTravelWindow>, AppError> {
        Ok(get_safe_travel_dates(&self.visits(user_id).await?, duration_days, from_date))
    }
}

/// Drops every cached status of the user. Call after any trip mutation.
pub async fn invalidate_user_status(cache: &StatusCache, user_id: &Uuid) {
    let removed = cache.invalidate_where(|(owner, _)| owner == user_id).await;
    if removed > 0 {
        debug!(%user_id, removed, "invalidated cached schengen statuses");
    }
}
