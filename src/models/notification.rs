use crate::schengen::ComplianceLevel;
use chrono::NaiveDate;
use rocket::serde::Serialize;
use schemars::JsonSchema;
use uuid::Uuid;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationKind {
    SchengenCompliance { level: ComplianceLevel, remaining_days: i64 },
    VisaExpiring { visa_id: Uuid, country: String, expiry_date: NaiveDate, days_left: i64 },
    VisaExpired { visa_id: Uuid, country: String, expiry_date: NaiveDate },
    OngoingStayLimit { trip_id: Uuid, country: String, days_stayed: i64, max_days: i64 },
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    #[serde(flatten)]
    pub kind: NotificationKind,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct NotificationsResponse {
    pub generated_for: NaiveDate,
    pub notifications: Vec<Notification>,
}
