use crate::schengen::countries::is_schengen_country;
use crate::schengen::timeline::{DayRange, PresenceTimeline};
use crate::schengen::{MAX_STAY_DAYS, SAFE_DATE_SEARCH_DAYS, Visit, calculate_status};
use chrono::{Duration, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Remaining allowance at or below which a planned trip gets a warning.
const LOW_ALLOWANCE_WARNING_DAYS: i64 = 10;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct PlannedTrip {
    pub country: String,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct FutureTripValidation {
    pub can_travel: bool,
    pub violates_rule: bool,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    /// Days used in the window ending on the trip's exit date.
    pub projected_used_days: i64,
    pub projected_remaining_days: i64,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub struct SafeTravelWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Day-by-day check of a trip against the rolling window.
struct TripCheck {
    /// First day on which the count goes over the allowance.
    first_violation: Option<NaiveDate>,
    /// Highest rolling count reached on any trip day.
    peak_days: i64,
}

fn check_trip(timeline: &PresenceTimeline, trip: DayRange) -> TripCheck {
    let with_trip = timeline.with_range(trip);
    let mut check = TripCheck {
        first_violation: None,
        peak_days: 0,
    };

    for day in trip.days() {
        let used = with_trip.days_in_window(day);
        check.peak_days = check.peak_days.max(used);
        if used > MAX_STAY_DAYS && check.first_violation.is_none() {
            check.first_violation = Some(day);
        }
    }

    check
}

fn fits(timeline: &PresenceTimeline, trip: DayRange) -> bool {
    let with_trip = timeline.with_range(trip);
    trip.days().all(|day| with_trip.days_in_window(day) <= MAX_STAY_DAYS)
}

/// Longest stay starting on `trip.start` (shorter than the trip itself) that
/// stays within the allowance.
fn longest_fitting_stay(timeline: &PresenceTimeline, trip: DayRange) -> Option<DayRange> {
    (1..trip.len())
        .rev()
        .filter_map(|length| {
            let end = trip.start.checked_add_signed(Duration::days(length - 1))?;
            DayRange::new(trip.start, end)
        })
        .find(|stay| fits(timeline, *stay))
}

/// Checks a hypothetical trip against existing visits as if it happened.
///
/// Ongoing visits are assumed to end on `today`. Destinations outside the
/// Schengen area can always be travelled to.
pub fn validate_future_trip(visits: &[Visit], trip: &PlannedTrip, today: NaiveDate) -> FutureTripValidation {
    if !is_schengen_country(&trip.country) {
        let status = calculate_status(visits, trip.exit_date.max(today));
        return FutureTripValidation {
            can_travel: true,
            violates_rule: false,
            warnings: Vec::new(),
            suggestions: vec![format!(
                "{} is outside the Schengen area, so the 90/180-day rule does not apply to this trip.",
                trip.country
            )],
            projected_used_days: status.used_days,
            projected_remaining_days: status.remaining_days,
        };
    }

    let Some(range) = DayRange::new(trip.entry_date, trip.exit_date) else {
        return FutureTripValidation {
            can_travel: false,
            violates_rule: false,
            warnings: vec!["The exit date is before the entry date.".to_string()],
            suggestions: Vec::new(),
            projected_used_days: 0,
            projected_remaining_days: MAX_STAY_DAYS,
        };
    };

    let timeline = PresenceTimeline::from_visits(visits, today);
    let check = check_trip(&timeline, range);
    let projected_used_days = timeline.with_range(range).days_in_window(trip.exit_date);

    let mut warnings = Vec::new();
    let mut suggestions = Vec::new();

    if let Some(day) = check.first_violation {
        warnings.push(format!(
            "This trip would exceed the {MAX_STAY_DAYS}-day limit from {day}, by up to {} day(s).",
            check.peak_days - MAX_STAY_DAYS
        ));

        match longest_fitting_stay(&timeline, range) {
            Some(stay) => suggestions.push(format!(
                "Shorten the trip to {} day(s) and leave by {}.",
                stay.len(),
                stay.end
            )),
            None => suggestions.push(format!("No days are available on {}; delay the trip.", trip.entry_date)),
        }

        match get_safe_travel_dates(visits, range.len(), trip.entry_date) {
            Some(window) => suggestions.push(format!(
                "The earliest {}-day trip that fits starts on {} and ends on {}.",
                range.len(),
                window.start_date,
                window.end_date
            )),
            None => suggestions.push(format!(
                "No {}-day trip fits within the next {SAFE_DATE_SEARCH_DAYS} days.",
                range.len()
            )),
        }
    } else if MAX_STAY_DAYS - check.peak_days <= LOW_ALLOWANCE_WARNING_DAYS {
        warnings.push(format!(
            "Only {} day(s) of allowance would be left at the busiest point of this trip.",
            MAX_STAY_DAYS - check.peak_days
        ));
    }

    let violates_rule = check.first_violation.is_some();
    FutureTripValidation {
        can_travel: !violates_rule,
        violates_rule,
        warnings,
        suggestions,
        projected_used_days,
        projected_remaining_days: (MAX_STAY_DAYS - projected_used_days).max(0),
    }
}

/// Finds the first trip of `duration_days` starting on or after `from_date`
/// that never takes the rolling count above 90 days.
///
/// Ongoing visits are assumed to end on `from_date`. Returns `None` when the
/// duration cannot fit at all or nothing fits within the search horizon. The
/// scan stops early at the end of the calendar.
pub fn get_safe_travel_dates(visits: &[Visit], duration_days: i64, from_date: NaiveDate) -> Option<SafeTravelWindow> {
    if duration_days <= 0 || duration_days > MAX_STAY_DAYS {
        return None;
    }

    let timeline = PresenceTimeline::from_visits(visits, from_date);

    (0..=SAFE_DATE_SEARCH_DAYS)
        .map_while(|offset| {
            let start = from_date.checked_add_signed(Duration::days(offset))?;
            let end = start.checked_add_signed(Duration::days(duration_days - 1))?;
            DayRange::new(start, end)
        })
        .find(|trip| fits(&timeline, *trip))
        .map(|trip| SafeTravelWindow {
            start_date: trip.start,
            end_date: trip.end,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn trip(country: &str, entry: NaiveDate, exit: NaiveDate) -> PlannedTrip {
        PlannedTrip {
            country: country.to_string(),
            entry_date: entry,
            exit_date: exit,
        }
    }

    #[test]
    fn short_trip_with_no_history_is_allowed() {
        let result = validate_future_trip(&[], &trip("France", date(2024, 7, 1), date(2024, 7, 14)), date(2024, 6, 1));
        assert!(result.can_travel);
        assert!(!result.violates_rule);
        assert!(result.warnings.is_empty());
        assert_eq!(result.projected_used_days, 14);
        assert_eq!(result.projected_remaining_days, 76);
    }

    #[test]
    fn trip_pushing_over_the_limit_is_rejected_with_suggestions() {
        let visits = vec![Visit::new("Germany", date(2024, 1, 1), Some(date(2024, 2, 29)))]; // 60 days
        let result = validate_future_trip(&visits, &trip("Spain", date(2024, 3, 10), date(2024, 4, 18)), date(2024, 3, 1)); // 40 days

        assert!(!result.can_travel);
        assert!(result.violates_rule);
        assert_eq!(result.projected_used_days, 100);
        assert_eq!(result.projected_remaining_days, 0);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.suggestions[0].contains("Shorten the trip to 30 day(s)"));
        assert_eq!(result.suggestions.len(), 2);
    }

    #[test]
    fn trip_close_to_the_limit_warns() {
        let visits = vec![Visit::new("Austria", date(2024, 1, 1), Some(date(2024, 2, 29)))]; // 60 days
        let result = validate_future_trip(&visits, &trip("Italy", date(2024, 3, 10), date(2024, 4, 3)), date(2024, 3, 1)); // 25 days

        assert!(result.can_travel);
        assert_eq!(result.projected_used_days, 85);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Only 5 day(s)"));
    }

    #[test]
    fn non_schengen_destination_always_allowed() {
        let visits = vec![Visit::new("France", date(2024, 1, 1), Some(date(2024, 4, 30)))];
        let result = validate_future_trip(&visits, &trip("Japan", date(2024, 5, 1), date(2024, 8, 1)), date(2024, 4, 30));
        assert!(result.can_travel);
        assert!(!result.violates_rule);
        assert!(result.suggestions[0].contains("outside the Schengen area"));
    }

    #[test]
    fn inverted_trip_dates_are_rejected() {
        let result = validate_future_trip(&[], &trip("France", date(2024, 7, 14), date(2024, 7, 1)), date(2024, 6, 1));
        assert!(!result.can_travel);
        assert!(!result.violates_rule);
    }

    #[test]
    fn ongoing_visit_is_counted_until_today() {
        let visits = vec![Visit::new("Portugal", date(2024, 1, 1), None)];
        // 2024-01-01..2024-03-20 is 80 days; a 15 day trip right after would reach 95.
        let result = validate_future_trip(&visits, &trip("Portugal", date(2024, 3, 21), date(2024, 4, 4)), date(2024, 3, 20));
        assert!(result.violates_rule);
    }

    #[test]
    fn safe_dates_without_history_start_immediately() {
        let window = get_safe_travel_dates(&[], 30, date(2024, 1, 1)).unwrap();
        assert_eq!(window.start_date, date(2024, 1, 1));
        assert_eq!(window.end_date, date(2024, 1, 30));
    }

    #[test]
    fn safe_dates_wait_for_days_to_free_up() {
        // Full allowance used from 2024-01-01 to 2024-03-30.
        let visits = vec![Visit::new("France", date(2024, 1, 1), Some(date(2024, 3, 30)))];
        let window = get_safe_travel_dates(&visits, 1, date(2024, 3, 31)).unwrap();
        // 2024-06-29 is the first day whose window no longer holds 2024-01-01.
        assert_eq!(window.start_date, date(2024, 6, 29));
    }

    #[test]
    fn safe_dates_reject_impossible_durations() {
        assert_eq!(get_safe_travel_dates(&[], 0, date(2024, 1, 1)), None);
        assert_eq!(get_safe_travel_dates(&[], 91, date(2024, 1, 1)), None);
        assert!(get_safe_travel_dates(&[], 90, date(2024, 1, 1)).is_some());
    }

    #[test]
    fn planning_at_the_calendar_end_stops_the_search() {
        assert_eq!(get_safe_travel_dates(&[], 30, NaiveDate::MAX - Duration::days(10)), None);

        let history_end = NaiveDate::MAX - Duration::days(20);
        let visits = vec![Visit::new("France", history_end - Duration::days(79), Some(history_end))];
        let planned = trip("France", history_end + Duration::days(1), NaiveDate::MAX);
        let result = validate_future_trip(&visits, &planned, history_end);

        assert!(result.violates_rule);
        assert!(result.suggestions[0].contains("Shorten the trip to 10 day(s)"));
        assert_eq!(result.suggestions[1], "No 20-day trip fits within the next 365 days.");
    }

    proptest! {
        #[test]
        fn prop_non_schengen_trip_can_always_travel(length in 0i64..200, history in 0i64..200) {
            let start = date(2024, 1, 1);
            let visits = vec![Visit::new("France", start, Some(start + Duration::days(history)))];
            let planned = trip("Vietnam", start + Duration::days(history + 1), start + Duration::days(history + 1 + length));
            let result = validate_future_trip(&visits, &planned, start);
            prop_assert!(result.can_travel);
            prop_assert!(!result.violates_rule);
        }

        #[test]
        fn prop_safe_window_is_accepted_by_validation(history in 0i64..120, duration in 1i64..=90) {
            let start = date(2024, 1, 1);
            let visits = vec![Visit::new("Spain", start, Some(start + Duration::days(history)))];
            let from = start + Duration::days(history + 1);
            if let Some(window) = get_safe_travel_dates(&visits, duration, from) {
                let planned = trip("Spain", window.start_date, window.end_date);
                let result = validate_future_trip(&visits, &planned, from);
                prop_assert!(result.can_travel);
                prop_assert_eq!((window.end_date - window.start_date).num_days() + 1, duration);
            }
        }
    }
}
