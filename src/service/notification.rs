use crate::database::trip::TripRepository;
use crate::database::visa::VisaRepository;
use crate::error::app_error::AppError;
use crate::models::notification::{Notification, NotificationKind, Severity};
use crate::models::trip::Trip;
use crate::models::visa::UserVisa;
use crate::schengen::{ComplianceLevel, Visit, calculate_status, compliance_level};
use chrono::NaiveDate;
use uuid::Uuid;

/// Visas expiring within this many days get a notice, and expired visas stay
/// listed for the same number of days after expiry.
pub const VISA_EXPIRY_NOTICE_DAYS: i64 = 30;
/// Days left on an ongoing stay at which a warning starts.
pub const STAY_LIMIT_NOTICE_DAYS: i64 = 7;

pub struct NotificationService<'a, R> {
    repository: &'a R,
}

impl<'a, R> NotificationService<'a, R>
where
    R: TripRepository + VisaRepository + Sync,
{
    pub fn new(repository: &'a R) -> Self {
        NotificationService { repository }
    }

    pub async fn notifications(&self, user_id: &Uuid, today: NaiveDate) -> Result<Vec<Notification>, AppError> {
        let trips = self.repository.list_all_trips(user_id).await?;
        let visas = self.repository.list_visas(user_id).await?;

        Ok(build_notifications(&trips, &visas, today))
    }
}

/// Most severe first.
pub fn build_notifications(trips: &[Trip], visas: &[UserVisa], today: NaiveDate) -> Vec<Notification> {
    let mut notifications = Vec::new();

    let visits: Vec<Visit> = trips.iter().map(Visit::from).collect();
    if let Some(notification) = schengen_notification(&visits, today) {
        notifications.push(notification);
    }
    notifications.extend(visas.iter().filter_map(|visa| visa_notification(visa, today)));
    notifications.extend(trips.iter().filter_map(|trip| stay_limit_notification(trip, today)));

    notifications.sort_by(|a, b| b.severity.cmp(&a.severity));
    notifications
}

fn schengen_notification(visits: &[Visit], today: NaiveDate) -> Option<Notification> {
    let status = calculate_status(visits, today);
    let level = compliance_level(&status);
    let remaining_days = status.remaining_days;

    let (severity, title, message) = match level {
        ComplianceLevel::Safe => return None,
        ComplianceLevel::Caution => (Severity::Info, "Schengen allowance running low", format!("{remaining_days} Schengen days left in the current 180-day window")),
        ComplianceLevel::Warning => (Severity::Warning, "Schengen allowance almost used", format!("Only {remaining_days} Schengen days left in the current 180-day window")),
        ComplianceLevel::Danger => (Severity::Critical, "Schengen limit imminent", format!("Only {remaining_days} Schengen days left, plan your exit")),
        ComplianceLevel::Violation => (
            Severity::Critical,
            "Schengen limit exceeded",
            format!("{} days used in the last 180 days, over the 90-day limit", status.used_days),
        ),
    };

    Some(Notification {
        severity,
        title: title.to_string(),
        message,
        kind: NotificationKind::SchengenCompliance { level, remaining_days },
    })
}

fn visa_notification(visa: &UserVisa, today: NaiveDate) -> Option<Notification> {
    let days_left = visa.days_until_expiry(today);

    if visa.is_expired(today) {
        if -days_left > VISA_EXPIRY_NOTICE_DAYS {
            return None;
        }
        return Some(Notification {
            severity: Severity::Warning,
            title: format!("{} visa expired", visa.country),
            message: format!("Your {} visa expired on {}", visa.country, visa.expiry_date),
            kind: NotificationKind::VisaExpired {
                visa_id: visa.id,
                country: visa.country.clone(),
                expiry_date: visa.expiry_date,
            },
        });
    }

    if days_left > VISA_EXPIRY_NOTICE_DAYS {
        return None;
    }

    let severity = if days_left <= 7 { Severity::Critical } else { Severity::Warning };
    let message = match days_left {
        0 => format!("Your {} visa expires today", visa.country),
        1 => format!("Your {} visa expires tomorrow", visa.country),
        _ => format!("Your {} visa expires in {days_left} days, on {}", visa.country, visa.expiry_date),
    };

    Some(Notification {
        severity,
        title: format!("{} visa expiring", visa.country),
        message,
        kind: NotificationKind::VisaExpiring {
            visa_id: visa.id,
            country: visa.country.clone(),
            expiry_date: visa.expiry_date,
            days_left,
        },
    })
}

fn stay_limit_notification(trip: &Trip, today: NaiveDate) -> Option<Notification> {
    // max_days 0 means no per-stay limit is tracked
    if !trip.is_ongoing() || trip.max_days <= 0 || trip.entry_date > today {
        return None;
    }

    let days_stayed = trip.days_stayed(today);
    let max_days = i64::from(trip.max_days);
    let left = max_days - days_stayed;

    let (severity, message) = if left < 0 {
        (Severity::Critical, format!("{days_stayed} days in {}, {} over the {max_days}-day limit", trip.country, -left))
    } else if left <= STAY_LIMIT_NOTICE_DAYS {
        (Severity::Warning, format!("{days_stayed} of {max_days} days used in {}", trip.country))
    } else {
        return None;
    };

    Some(Notification {
        severity,
        title: format!("Stay limit in {}", trip.country),
        message,
        kind: NotificationKind::OngoingStayLimit {
            trip_id: trip.id,
            country: trip.country.clone(),
            days_stayed,
            max_days,
        },
    })
}
