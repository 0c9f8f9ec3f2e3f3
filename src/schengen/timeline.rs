use crate::schengen::countries::is_schengen_country;
use crate::schengen::{Visit, WINDOW_DAYS};
use chrono::{Duration, NaiveDate};

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DayRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DayRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn len(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn clip(&self, start: NaiveDate, end: NaiveDate) -> Option<Self> {
        Self::new(self.start.max(start), self.end.min(end))
    }

    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        std::iter::successors(Some(self.start), move |day| day.succ_opt().filter(|next| *next <= end))
    }
}

/// First day of the 180-day window that ends on `window_end`, clamped to
/// the earliest representable date.
pub(crate) fn window_start(window_end: NaiveDate) -> NaiveDate {
    window_end.checked_sub_signed(Duration::days(WINDOW_DAYS - 1)).unwrap_or(NaiveDate::MIN)
}

/// Days spent inside the Schengen area, kept as sorted, non-overlapping,
/// non-adjacent ranges so every calendar day is counted at most once.
#[derive(Debug, Clone, Default)]
pub(crate) struct PresenceTimeline {
    ranges: Vec<DayRange>,
}

impl PresenceTimeline {
    /// Builds the timeline from Schengen visits only. Open-ended visits are
    /// treated as ongoing through `ongoing_until`.
    pub fn from_visits(visits: &[Visit], ongoing_until: NaiveDate) -> Self {
        let ranges = visits
            .iter()
            .filter(|visit| is_schengen_country(&visit.country))
            .filter_map(|visit| DayRange::new(visit.entry_date, visit.exit_date.unwrap_or(ongoing_until)))
            .collect();

        Self::merged(ranges)
    }

    fn merged(mut ranges: Vec<DayRange>) -> Self {
        ranges.sort_by_key(|range| range.start);

        let mut merged: Vec<DayRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if last.end.succ_opt().is_none_or(|next| range.start <= next) => {
                    last.end = last.end.max(range.end);
                }
                _ => merged.push(range),
            }
        }

        Self { ranges: merged }
    }

    pub fn with_range(&self, range: DayRange) -> Self {
        let mut ranges = self.ranges.clone();
        ranges.push(range);
        Self::merged(ranges)
    }

    /// Number of present days in the 180-day window ending on `window_end`.
    pub fn days_in_window(&self, window_end: NaiveDate) -> i64 {
        let start = window_start(window_end);
        self.ranges
            .iter()
            .filter_map(|range| range.clip(start, window_end))
            .map(|range| range.len())
            .sum()
    }

    /// Oldest present day inside the window ending on `window_end`.
    pub fn first_day_in_window(&self, window_end: NaiveDate) -> Option<NaiveDate> {
        let start = window_start(window_end);
        self.ranges.iter().find_map(|range| range.clip(start, window_end)).map(|range| range.start)
    }

    /// Present days between `from` and `to`, inclusive, in ascending order.
    pub fn present_days(&self, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
        self.ranges
            .iter()
            .filter_map(|range| range.clip(from, to))
            .flat_map(|range| range.days())
            .collect()
    }
}
