use crate::schengen::timeline::{PresenceTimeline, window_start};
use crate::schengen::{MAX_STAY_DAYS, Visit, WINDOW_DAYS};
use chrono::{Duration, NaiveDate};
use schemars::JsonSchema;
use serde::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct Violation {
    /// First day of the period spent over the allowance.
    pub date: NaiveDate,
    /// Largest excess reached during the period.
    pub days_over_limit: i64,
    pub description: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct SchengenStatus {
    pub reference_date: NaiveDate,
    pub window_start: NaiveDate,
    pub used_days: i64,
    pub remaining_days: i64,
    pub max_days: i64,
    pub window_days: i64,
    /// Day on which the oldest counted day leaves the window, `None` when
    /// nothing is counted or that day is past the end of the calendar.
    pub next_reset_date: Option<NaiveDate>,
    pub is_compliant: bool,
    pub violations: Vec<Violation>,
}

/// Computes the 90/180 status as of `reference_date`.
///
/// Only Schengen visits count, each day at most once, and open-ended stays
/// run through the reference date. Violations list every period inside the
/// current window during which the rolling count went above 90.
pub fn calculate_status(visits: &[Visit], reference_date: NaiveDate) -> SchengenStatus {
    let timeline = PresenceTimeline::from_visits(visits, reference_date);
    let window_start = window_start(reference_date);

    let used_days = timeline.days_in_window(reference_date);
    let next_reset_date = timeline
        .first_day_in_window(reference_date)
        .and_then(|oldest| oldest.checked_add_signed(Duration::days(WINDOW_DAYS)));

    SchengenStatus {
        reference_date,
        window_start,
        used_days,
        remaining_days: (MAX_STAY_DAYS - used_days).max(0),
        max_days: MAX_STAY_DAYS,
        window_days: WINDOW_DAYS,
        next_reset_date,
        is_compliant: used_days <= MAX_STAY_DAYS,
        violations: find_violations(&timeline, window_start, reference_date),
    }
}

fn find_violations(timeline: &PresenceTimeline, from: NaiveDate, to: NaiveDate) -> Vec<Violation> {
    // (first day, last day, peak excess) of each run of consecutive days over the limit
    let mut runs: Vec<(NaiveDate, NaiveDate, i64)> = Vec::new();

    for day in timeline.present_days(from, to) {
        let excess = timeline.days_in_window(day) - MAX_STAY_DAYS;
        if excess <= 0 {
            continue;
        }

        match runs.last_mut() {
            Some((_, last, peak)) if last.succ_opt() == Some(day) => {
                *last = day;
                *peak = (*peak).max(excess);
            }
            _ => runs.push((day, day, excess)),
        }
    }

    runs.into_iter()
        .map(|(start, end, peak)| Violation {
            date: start,
            days_over_limit: peak,
            description: if start == end {
                format!("Exceeded the {MAX_STAY_DAYS}-day limit by {peak} day(s) on {start}")
            } else {
                format!("Exceeded the {MAX_STAY_DAYS}-day limit between {start} and {end}, by up to {peak} day(s)")
            },
        })
        .collect()
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceLevel {
    Safe,
    Caution,
    Warning,
    Danger,
    Violation,
}

pub fn compliance_level(status: &SchengenStatus) -> ComplianceLevel {
    if !status.is_compliant {
        return ComplianceLevel::Violation;
    }

    match status.remaining_days {
        0..=5 => ComplianceLevel::Danger,
        6..=15 => ComplianceLevel::Warning,
        16..=30 => ComplianceLevel::Caution,
        _ => ComplianceLevel::Safe,
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct StayUsage {
    pub days_used: i64,
    pub max_days: i64,
    /// Display label in the form `12/90일`.
    pub label: String,
    /// Share of the allowance in use, 0 when there is no allowance.
    pub percentage: f64,
}

pub fn stay_usage(days_used: i64, max_days: i64) -> StayUsage {
    let percentage = if max_days > 0 {
        (days_used as f64 / max_days as f64 * 100.0).min(100.0)
    } else {
        0.0
    };

    StayUsage {
        days_used,
        max_days,
        label: format!("{days_used}/{max_days}일"),
        percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_visit_list_is_compliant() {
        let status = calculate_status(&[], date(2024, 6, 1));
        assert_eq!(status.used_days, 0);
        assert_eq!(status.remaining_days, 90);
        assert!(status.is_compliant);
        assert!(status.violations.is_empty());
        assert_eq!(status.next_reset_date, None);
    }

    #[test]
    fn fifteen_day_visit_uses_fifteen_days() {
        let visits = vec![Visit::new("France", date(2024, 1, 1), Some(date(2024, 1, 15)))];
        let status = calculate_status(&visits, date(2024, 6, 1));
        assert_eq!(status.used_days, 15);
        assert_eq!(status.remaining_days, 75);
        assert!(status.is_compliant);
        assert_eq!(status.next_reset_date, Some(date(2024, 6, 29)));
    }

    #[test]
    fn long_visit_is_a_violation() {
        let visits = vec![Visit::new("France", date(2024, 1, 1), Some(date(2024, 4, 1)))];
        let status = calculate_status(&visits, date(2024, 4, 1));
        assert_eq!(status.used_days, 92);
        assert_eq!(status.remaining_days, 0);
        assert!(!status.is_compliant);
        assert_eq!(status.violations.len(), 1);
        assert_eq!(status.violations[0].date, date(2024, 3, 31));
        assert_eq!(status.violations[0].days_over_limit, 2);
    }

    #[test]
    fn exactly_ninety_days_is_compliant() {
        let entry = date(2024, 2, 1);
        let visits = vec![Visit::new("Italy", entry, Some(entry + Duration::days(89)))];
        let status = calculate_status(&visits, entry + Duration::days(89));
        assert_eq!(status.used_days, 90);
        assert_eq!(status.remaining_days, 0);
        assert!(status.is_compliant);
        assert!(status.violations.is_empty());
    }

    #[test]
    fn ninety_one_days_is_a_violation() {
        let entry = date(2024, 2, 1);
        let exit = entry + Duration::days(90);
        let visits = vec![Visit::new("Italy", entry, Some(exit))];
        let status = calculate_status(&visits, exit);
        assert_eq!(status.used_days, 91);
        assert!(!status.is_compliant);
        assert_eq!(status.violations[0].date, exit);
        assert_eq!(status.violations[0].days_over_limit, 1);
    }

    #[test]
    fn ongoing_stay_counts_the_reference_day() {
        let visits = vec![Visit::new("Spain", date(2024, 5, 1), None)];
        let status = calculate_status(&visits, date(2024, 5, 10));
        assert_eq!(status.used_days, 10);
    }

    #[test]
    fn visit_straddling_window_start_is_clipped() {
        // Window for 2024-06-28 starts on 2024-01-01.
        let visits = vec![Visit::new("Germany", date(2023, 12, 22), Some(date(2024, 1, 10)))];
        let status = calculate_status(&visits, date(2024, 6, 28));
        assert_eq!(status.used_days, 10);
        assert_eq!(status.next_reset_date, Some(date(2024, 6, 29)));
    }

    #[test]
    fn future_part_of_a_visit_is_not_counted() {
        let visits = vec![Visit::new("Greece", date(2024, 6, 1), Some(date(2024, 6, 30)))];
        let status = calculate_status(&visits, date(2024, 6, 10));
        assert_eq!(status.used_days, 10);

        let upcoming = vec![Visit::new("Greece", date(2024, 7, 1), None)];
        assert_eq!(calculate_status(&upcoming, date(2024, 6, 10)).used_days, 0);
    }

    #[test]
    fn same_day_border_crossing_counts_once() {
        let visits = vec![
            Visit::new("France", date(2024, 3, 1), Some(date(2024, 3, 10))),
            Visit::new("Belgium", date(2024, 3, 10), Some(date(2024, 3, 12))),
        ];
        assert_eq!(calculate_status(&visits, date(2024, 3, 31)).used_days, 12);
    }

    #[test]
    fn non_schengen_visits_are_ignored() {
        let visits = vec![
            Visit::new("United Kingdom", date(2024, 1, 1), Some(date(2024, 5, 1))),
            Visit::new("france", date(2024, 1, 1), Some(date(2024, 5, 1))),
            Visit::new("Portugal", date(2024, 5, 2), Some(date(2024, 5, 3))),
        ];
        assert_eq!(calculate_status(&visits, date(2024, 5, 31)).used_days, 2);
    }

    #[test]
    fn reset_date_past_the_calendar_end_is_none() {
        let visits = vec![Visit::new("France", NaiveDate::MAX - Duration::days(10), None)];
        let status = calculate_status(&visits, NaiveDate::MAX);
        assert_eq!(status.used_days, 11);
        assert_eq!(status.next_reset_date, None);
        assert!(status.is_compliant);
    }

    #[test]
    fn compliance_levels_follow_remaining_days() {
        let mut status = calculate_status(&[], date(2024, 1, 1));
        assert_eq!(compliance_level(&status), ComplianceLevel::Safe);

        status.remaining_days = 30;
        assert_eq!(compliance_level(&status), ComplianceLevel::Caution);
        status.remaining_days = 15;
        assert_eq!(compliance_level(&status), ComplianceLevel::Warning);
        status.remaining_days = 5;
        assert_eq!(compliance_level(&status), ComplianceLevel::Danger);

        status.is_compliant = false;
        assert_eq!(compliance_level(&status), ComplianceLevel::Violation);
    }

    #[test]
    fn stay_usage_with_zero_allowance() {
        let usage = stay_usage(3, 0);
        assert_eq!(usage.label, "3/0일");
        assert_eq!(usage.percentage, 0.0);
    }

    #[test]
    fn stay_usage_is_capped_at_full() {
        assert_eq!(stay_usage(45, 90).percentage, 50.0);
        assert_eq!(stay_usage(120, 90).percentage, 100.0);
        assert_eq!(stay_usage(0, 30).label, "0/30일");
    }

    fn arb_visit() -> impl Strategy<Value = Visit> {
        let countries = prop::sample::select(vec!["France", "Germany", "Spain", "Japan", "United Kingdom", "Norway"]);
        (countries, 0i64..720, 0i64..120, any::<bool>()).prop_map(|(country, offset, length, ongoing)| {
            let entry = date(2023, 1, 1) + Duration::days(offset);
            Visit::new(country, entry, (!ongoing).then(|| entry + Duration::days(length)))
        })
    }

    proptest! {
        #[test]
        fn prop_used_plus_remaining_is_allowance(visits in prop::collection::vec(arb_visit(), 0..8), offset in 0i64..800) {
            let status = calculate_status(&visits, date(2023, 1, 1) + Duration::days(offset));
            if status.used_days <= MAX_STAY_DAYS {
                prop_assert_eq!(status.used_days + status.remaining_days, MAX_STAY_DAYS);
                prop_assert!(status.is_compliant);
            } else {
                prop_assert_eq!(status.remaining_days, 0);
                prop_assert!(!status.is_compliant);
                prop_assert!(!status.violations.is_empty());
            }
            prop_assert!(status.used_days <= WINDOW_DAYS);
        }

        #[test]
        fn prop_visits_outside_window_count_nothing(length in 0i64..300, gap in 1i64..400) {
            let entry = date(2022, 1, 1);
            let exit = entry + Duration::days(length);
            let reference = exit + Duration::days(WINDOW_DAYS - 1 + gap);
            let status = calculate_status(&[Visit::new("France", entry, Some(exit))], reference);
            prop_assert_eq!(status.used_days, 0);
            prop_assert_eq!(status.next_reset_date, None);
        }

        #[test]
        fn prop_non_schengen_never_counts(length in 0i64..300, offset in 0i64..400) {
            let entry = date(2024, 1, 1);
            let visits = vec![
                Visit::new("Thailand", entry, Some(entry + Duration::days(length))),
                Visit::new("Ireland", entry, None),
            ];
            let status = calculate_status(&visits, entry + Duration::days(offset));
            prop_assert_eq!(status.used_days, 0);
        }
    }
}
