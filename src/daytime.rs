//! Weekday canonicalization and time-token parsing shared by the
//! resolver, the band indexer and the mutation engine.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Config;
use crate::error::SchedulerError;

/// Canonical week, Monday first.
pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

const DAY_ALIASES: [(&str, Weekday); 18] = [
    ("mon", Weekday::Mon),
    ("monday", Weekday::Mon),
    ("tue", Weekday::Tue),
    ("tues", Weekday::Tue),
    ("tuesday", Weekday::Tue),
    ("wed", Weekday::Wed),
    ("weds", Weekday::Wed),
    ("wednesday", Weekday::Wed),
    ("thu", Weekday::Thu),
    ("thur", Weekday::Thu),
    ("thurs", Weekday::Thu),
    ("thursday", Weekday::Thu),
    ("fri", Weekday::Fri),
    ("friday", Weekday::Fri),
    ("sat", Weekday::Sat),
    ("saturday", Weekday::Sat),
    ("sun", Weekday::Sun),
    ("sunday", Weekday::Sun),
];

/// Lowercase English name ("monday").
pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Title-case name ("Monday") for user-facing messages.
pub fn day_title(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Abbreviations recognized for a given day (used by the fuzzy column
/// scan).
pub fn day_abbreviations(day: Weekday) -> Vec<&'static str> {
    DAY_ALIASES
        .iter()
        .filter(|(_, d)| *d == day)
        .map(|(a, _)| *a)
        .collect()
}

/// Canonicalize a user-supplied day token: exact name, known
/// abbreviation, or unambiguous prefix of a weekday name.
pub fn canon_day(input: &str) -> Option<Weekday> {
    let token: String = input
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect();
    if token.is_empty() {
        return None;
    }
    if let Some((_, d)) = DAY_ALIASES.iter().find(|(a, _)| *a == token) {
        return Some(*d);
    }
    if token.len() >= 2 {
        let hits: Vec<Weekday> = WEEK
            .iter()
            .copied()
            .filter(|d| day_name(*d).starts_with(&token))
            .collect();
        if hits.len() == 1 {
            return Some(hits[0]);
        }
    }
    None
}

/// Canonical day from a header cell whose text may be "Monday" or
/// "Monday, 9/8/25": only the head before the first comma counts, and it
/// must be a full weekday name.
pub fn day_from_header(cell: &str) -> Option<Weekday> {
    let cleaned: String = cell
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace() || *c == ',')
        .collect();
    let head = cleaned.split(',').next().unwrap_or("").trim();
    WEEK.iter().copied().find(|d| day_name(*d) == head)
}

static DAY_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*([A-Za-z]{3,9})(?:\s*,|\s+|$)").unwrap());

/// Looser day match: full-name header, or a leading 3–9 letter token
/// that is a weekday name or abbreviation.
pub fn day_loose(cell: &str) -> Option<Weekday> {
    if cell.trim().is_empty() {
        return None;
    }
    let flat = cell.replace('\n', " ");
    if let Some(d) = day_from_header(&flat) {
        return Some(d);
    }
    let caps = DAY_TOKEN_RE.captures(flat.trim())?;
    let token = caps.get(1)?.as_str().to_lowercase();
    DAY_ALIASES
        .iter()
        .find(|(a, _)| *a == token)
        .map(|(_, d)| *d)
}

static TRAILING_CLOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\d{2}:\d{2}:\d{2}$").unwrap());

const DATE_FORMATS: [&str; 5] = ["%m/%d/%Y", "%m/%d/%y", "%Y-%m-%d", "%B %d %Y", "%b %d %Y"];

/// Weekday derived from a date-like cell ("9/8/2025", "Sep 8 2025").
/// Cells that already read as a day name are left to [`day_loose`].
pub fn weekday_from_dateish(cell: &str) -> Option<Weekday> {
    let s = cell.trim().replace('\u{a0}', " ");
    if s.is_empty() || day_loose(&s).is_some() {
        return None;
    }
    let mut candidates = vec![s.clone()];
    if TRAILING_CLOCK_RE.is_match(&s) {
        candidates.push(TRAILING_CLOCK_RE.replace(&s, "").trim().to_string());
    }
    for cand in &candidates {
        let cleaned = cand.replace(',', " ");
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        for fmt in DATE_FORMATS {
            if let Ok(d) = NaiveDate::parse_from_str(&cleaned, fmt) {
                return Some(d.weekday());
            }
        }
        // "9/8" with no year: month/day in an arbitrary non-leap year is
        // useless for weekday inference, so only full dates count.
    }
    None
}

/// "9:00 AM" — a band label cell.
pub static TIME_CELL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*\d{1,2}:\d{2}\s*(?:AM|PM)\s*$").unwrap());

/// "7:00 AM – 11:00 AM" — a fixed-block label cell.
pub static RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(\d{1,2}:\d{2}\s*(?:AM|PM))\s*[-–—]\s*(\d{1,2}:\d{2}\s*(?:AM|PM))\s*$")
        .unwrap()
});

static SQUEEZED_MERIDIEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d)(AM|PM)$").unwrap());

/// Parse a 12-hour clock token ("9:00 AM", "12:30pm").
pub fn parse_time_cell(s: &str) -> Option<NaiveTime> {
    let mut t = s.trim().to_uppercase();
    t = SQUEEZED_MERIDIEM_RE.replace(&t, "$1 $2").into_owned();
    NaiveTime::parse_from_str(&t, "%I:%M %p").ok()
}

/// Format as the sheet does: 12-hour, no leading zero ("9:00 AM").
pub fn fmt_time(t: NaiveTime) -> String {
    let s = t.format("%I:%M %p").to_string();
    s.strip_prefix('0').unwrap_or(&s).to_string()
}

/// Same clock position in the other half of the day (AM/PM flip), used
/// to coerce a tick onto the sheet's ladder.
pub fn flip_half_day(t: NaiveTime) -> NaiveTime {
    let h = (t.hour() + 12) % 24;
    NaiveTime::from_hms_opt(h, t.minute(), 0).unwrap_or(t)
}

fn minutes_of(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

fn time_of(minutes: u32) -> NaiveTime {
    let m = minutes % (24 * 60);
    NaiveTime::from_hms_opt(m / 60, m % 60, 0).unwrap_or(NaiveTime::MIN)
}

/// A validated request window. `end_min` may exceed 24h for overnight
/// windows that roll past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start_min: u32,
    end_min: u32,
}

impl Window {
    pub fn start(&self) -> NaiveTime {
        time_of(self.start_min)
    }

    /// Clock position of the end (00:00 for a midnight end).
    pub fn end_clock(&self) -> NaiveTime {
        time_of(self.end_min)
    }

    pub fn minutes(&self) -> u32 {
        self.end_min - self.start_min
    }

    pub fn hours(&self) -> f64 {
        f64::from(self.minutes()) / 60.0
    }

    pub fn slots(&self) -> usize {
        (self.minutes() / 30) as usize
    }

    /// Start of every 30-minute tick in the window, in request order.
    pub fn ticks(&self) -> Vec<NaiveTime> {
        (self.start_min..self.end_min)
            .step_by(30)
            .map(time_of)
            .collect()
    }

    pub fn start_label(&self) -> String {
        fmt_time(self.start())
    }

    pub fn end_label(&self) -> String {
        fmt_time(self.end_clock())
    }

    pub fn label(&self) -> String {
        format!("{}–{}", self.start_label(), self.end_label())
    }
}

/// Validate a (start, end) pair into a [`Window`]:
/// 30-minute boundaries, guardrails on the operating day, and the
/// overnight convenience — an end clock-time of 00:00–05:59 that is not
/// after the start rolls past midnight instead of failing.
pub fn validate_window(
    start: NaiveTime,
    end: NaiveTime,
    cfg: &Config,
) -> Result<Window, SchedulerError> {
    if start.minute() % 30 != 0 || end.minute() % 30 != 0 || start.second() != 0 || end.second() != 0
    {
        return Err(SchedulerError::InvalidRequest(
            "Times must be on 30-minute boundaries (:00 or :30).".into(),
        ));
    }
    let start_min = minutes_of(start);
    let mut end_min = minutes_of(end);
    if end_min <= start_min {
        if end.hour() <= 5 {
            end_min += 24 * 60;
        } else {
            return Err(SchedulerError::InvalidRequest(
                "End time must be after start time.".into(),
            ));
        }
    }
    if start < cfg.day_start || start > cfg.day_end {
        return Err(SchedulerError::InvalidRequest(format!(
            "Shifts must start between {} and {}.",
            fmt_time(cfg.day_start),
            fmt_time(cfg.day_end),
        )));
    }
    Ok(Window { start_min, end_min })
}
