use crate::email::airports::{is_known_airport, known_countries};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// How far after a label (in bytes) a value may appear.
const LABEL_LOOKAHEAD: usize = 120;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());

static CONFIRMATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:(?i:booking|confirmation|reservation|itinerary)(?i:\s+(?:number|no\.?|code|id|#))?|(?i:pnr)|예약\s?번호|확인\s?번호|예약\s?코드)(?:\s*\([^)\n]{1,12}\))?\s*[:：#]?\s*([A-Z0-9][A-Z0-9-]{4,14})\b",
    )
    .unwrap()
});

static FLIGHT_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([A-Z]{2}|[A-Z][0-9]|[0-9][A-Z])\s?([0-9]{2,4})\b").unwrap());

static AIRPORT_ROUTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([A-Z]{3})\s*(?:→|->|–|—|-|~|>|to)\s*([A-Z]{3})\b").unwrap());
static AIRPORT_IN_PARENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([A-Z]{3})\)").unwrap());

static DATE_KOREAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{4})\s*년\s*(\d{1,2})\s*월\s*(\d{1,2})\s*일").unwrap());
static DATE_NUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{4})\s?[-./]\s?(\d{1,2})\s?[-./]\s?(\d{1,2})\b").unwrap());
static DATE_DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?\s+(\d{4})\b").unwrap()
});
static DATE_MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b").unwrap()
});

static HOTEL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:(?i:hotel|property|accommodation|listing)(?i:\s+name)?|숙소명?|호텔명?)\s*[:：]\s*([^\n]+)").unwrap());
static ADDRESS_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:(?i:address|location)|주소|위치)\s*[:：]\s*([^\n]+)").unwrap());

pub const DEPARTURE_LABELS: &[&str] = &["Departure", "Depart", "Outbound", "출발", "가는 편", "가는편"];
pub const RETURN_LABELS: &[&str] = &["Return", "Inbound", "귀국", "오는 편", "오는편"];
pub const CHECK_IN_LABELS: &[&str] = &["Check-in", "Check in", "Arrival", "체크인"];
pub const CHECK_OUT_LABELS: &[&str] = &["Check-out", "Check out", "Departure", "체크아웃"];

/// Turns an HTML or plain-text body into plain lines.
pub fn normalize_text(raw: &str) -> String {
    let without_tags = HTML_TAG.replace_all(raw, "\n");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&rarr;", "→")
        .replace("&#8594;", "→");

    decoded
        .lines()
        .map(|line| WHITESPACE_RUN.replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn confirmation_number(text: &str) -> Option<String> {
    CONFIRMATION
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|code| code.as_str().trim_end_matches('-'))
        // Codes are alphanumeric identifiers; skip plain words that happen to follow a label.
        .find(|code| code.chars().any(|c| c.is_ascii_digit()) || code.len() == 6)
        .map(str::to_string)
}

/// First flight number whose designator is one of `airline_codes`, normalised
/// to `KE901`.
pub fn flight_number(text: &str, airline_codes: &[&str]) -> Option<String> {
    FLIGHT_NUMBER
        .captures_iter(text)
        .filter(|caps| airline_codes.contains(&&caps[1]))
        .map(|caps| format!("{}{}", &caps[1], &caps[2]))
        .next()
}

/// Departure and arrival airports, from a `ICN → CDG` route or the first two
/// known codes in parentheses.
pub fn airport_codes(text: &str) -> Option<(String, String)> {
    if let Some(caps) = AIRPORT_ROUTE
        .captures_iter(text)
        .find(|caps| is_known_airport(&caps[1]) && is_known_airport(&caps[2]))
    {
        return Some((caps[1].to_string(), caps[2].to_string()));
    }

    let codes: Vec<&str> = AIRPORT_IN_PARENS
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|code| code.as_str())
        .filter(|code| is_known_airport(code))
        .collect();

    match codes.as_slice() {
        [from, to, ..] if from != to => Some((from.to_string(), to.to_string())),
        _ => None,
    }
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.get(..3)?.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn ymd(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

/// Every valid date in `text` with its byte offset, in order of appearance.
pub fn dates_with_offsets(text: &str) -> Vec<(usize, NaiveDate)> {
    let mut found: Vec<(usize, NaiveDate)> = Vec::new();

    for caps in DATE_KOREAN.captures_iter(text).chain(DATE_NUMERIC.captures_iter(text)) {
        if let Some(date) = caps[2].parse().ok().and_then(|month| ymd(&caps[1], month, &caps[3])) {
            found.push((caps.get(0).map_or(0, |m| m.start()), date));
        }
    }

    for caps in DATE_DAY_MONTH.captures_iter(text) {
        if let Some(date) = month_number(&caps[2]).and_then(|month| ymd(&caps[3], month, &caps[1])) {
            found.push((caps.get(0).map_or(0, |m| m.start()), date));
        }
    }

    for caps in DATE_MONTH_DAY.captures_iter(text) {
        if let Some(date) = month_number(&caps[1]).and_then(|month| ymd(&caps[3], month, &caps[2])) {
            found.push((caps.get(0).map_or(0, |m| m.start()), date));
        }
    }

    found.sort_by_key(|(offset, _)| *offset);
    found
}

pub fn dates(text: &str) -> Vec<NaiveDate> {
    dates_with_offsets(text).into_iter().map(|(_, date)| date).collect()
}

/// First date that follows one of `labels` closely. Labels match
/// case-insensitively.
pub fn date_after_label(text: &str, labels: &[&str]) -> Option<NaiveDate> {
    let mut labels = labels.to_vec();
    labels.sort_by_key(|label| std::cmp::Reverse(label.len()));
    let alternation = labels.iter().map(|label| regex::escape(label)).collect::<Vec<_>>().join("|");
    let label_pattern = Regex::new(&format!("(?i)(?:{alternation})")).ok()?;

    let dates = dates_with_offsets(text);

    // Both sequences ascend, so the first label with a date in reach wins.
    label_pattern.find_iter(text).find_map(|label| {
        let next = dates.partition_point(|(offset, _)| *offset < label.end());
        dates
            .get(next)
            .filter(|(offset, _)| *offset - label.end() <= LABEL_LOOKAHEAD)
            .map(|(_, date)| *date)
    })
}

pub fn hotel_name(text: &str) -> Option<String> {
    HOTEL_NAME
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|name| name.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Country mentioned on the address line, or anywhere in the text as a fallback.
pub fn country_mention(text: &str) -> Option<&'static str> {
    let find_in = |haystack: &str| known_countries().find(|country| haystack.contains(country));

    ADDRESS_LINE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|line| find_in(line.as_str()))
        .or_else(|| find_in(text))
}
