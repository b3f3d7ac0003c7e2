//! Date normalization for model-extracted date strings.
//!
//! Accepts numeric day-month-year and year-month-day dates, Russian (and
//! English) month names with or without a year, and ISO strings as a last
//! resort. Whatever matched, dates are re-serialized as `DD.MM.YYYY`.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime};
use regex::Regex;

/// Canonical display format for event dates.
pub const DISPLAY_FORMAT: &str = "%d.%m.%Y";

/// Russian month-name stems. Matching is substring-based and the first hit wins.
const MONTHS: &[(&str, u32)] = &[
    ("янв", 1),
    ("января", 1),
    ("январь", 1),
    ("фев", 2),
    ("февраля", 2),
    ("февраль", 2),
    ("мар", 3),
    ("марта", 3),
    ("март", 3),
    ("апр", 4),
    ("апреля", 4),
    ("апрель", 4),
    ("мая", 5),
    ("май", 5),
    ("июн", 6),
    ("июня", 6),
    ("июнь", 6),
    ("июл", 7),
    ("июля", 7),
    ("июль", 7),
    ("авг", 8),
    ("августа", 8),
    ("август", 8),
    ("сен", 9),
    ("сентября", 9),
    ("сентябрь", 9),
    ("окт", 10),
    ("октября", 10),
    ("октябрь", 10),
    ("ноя", 11),
    ("ноября", 11),
    ("ноябрь", 11),
    ("дек", 12),
    ("декабря", 12),
    ("декабрь", 12),
];

/// English month names. A word matches when it is a prefix of at least three letters.
const ENGLISH_MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Shortest English abbreviation accepted as a month.
const MIN_ENGLISH_PREFIX: usize = 3;

/// Format a date as `DD.MM.YYYY`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

/// Month number for a month word: first matching Russian stem, else an English prefix.
fn month_from_word(word: &str) -> Option<u32> {
    let word = word.to_lowercase();
    if let Some((_, month)) = MONTHS.iter().find(|(stem, _)| word.contains(stem)) {
        return Some(*month);
    }
    if word.len() < MIN_ENGLISH_PREFIX {
        return None;
    }
    ENGLISH_MONTHS
        .iter()
        .position(|name| name.starts_with(word.as_str()))
        .and_then(|index| u32::try_from(index + 1).ok())
}

/// Parser for heterogeneous date strings.
pub struct DateNormalizer {
    day_month_year: Regex,
    year_month_day: Regex,
    day_month_name_year: Regex,
    day_month_name: Regex,
}

impl DateNormalizer {
    /// Compile the date patterns.
    ///
    /// # Errors
    /// Returns an error if any regex pattern is invalid.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            day_month_year: Regex::new(r"([0-9]{1,2})[./-]([0-9]{1,2})[./-]([0-9]{4})")?,
            year_month_day: Regex::new(r"([0-9]{4})[./-]([0-9]{1,2})[./-]([0-9]{1,2})")?,
            day_month_name_year: Regex::new(
                r"([0-9]{1,2})\s+([а-яА-ЯёЁa-zA-Z]+)\.?,?\s+([0-9]{4})",
            )?,
            day_month_name: Regex::new(r"([0-9]{1,2})\s+([а-яА-ЯёЁa-zA-Z]+)")?,
        })
    }

    /// Resolve `text` to a calendar date.
    ///
    /// Dates without a year use `fallback_year`, or the current year when `None`.
    /// Unparseable input gives `None` and a warning; it is never an error.
    #[must_use]
    pub fn parse_date(&self, text: &str, fallback_year: Option<i32>) -> Option<NaiveDate> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let fallback_year = fallback_year.unwrap_or_else(|| Local::now().year());

        let parsed = self
            .numeric_date(text, false)
            .or_else(|| self.numeric_date(text, true))
            .or_else(|| self.named_with_year(text))
            .or_else(|| self.named(text, fallback_year))
            .or_else(|| parse_iso(text));

        if parsed.is_none() {
            tracing::warn!("Could not parse date string: '{text}'");
        }
        parsed
    }

    /// Resolve `text` and re-serialize it as `DD.MM.YYYY`.
    #[must_use]
    pub fn normalize(&self, text: &str, fallback_year: Option<i32>) -> Option<(NaiveDate, String)> {
        self.parse_date(text, fallback_year)
            .map(|date| (date, format_date(date)))
    }

    fn numeric_date(&self, text: &str, year_first: bool) -> Option<NaiveDate> {
        let pattern = if year_first {
            &self.year_month_day
        } else {
            &self.day_month_year
        };
        let caps = pattern.captures(text)?;
        let a: u32 = caps.get(1)?.as_str().parse().ok()?;
        let b: u32 = caps.get(2)?.as_str().parse().ok()?;
        let c: u32 = caps.get(3)?.as_str().parse().ok()?;
        let (year, month, day) = if year_first { (a, b, c) } else { (c, b, a) };
        NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
    }

    fn named_with_year(&self, text: &str) -> Option<NaiveDate> {
        let caps = self.day_month_name_year.captures(text)?;
        let day: u32 = caps.get(1)?.as_str().parse().ok()?;
        let month = month_from_word(caps.get(2)?.as_str())?;
        let year: i32 = caps.get(3)?.as_str().parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }

    fn named(&self, text: &str, year: i32) -> Option<NaiveDate> {
        let caps = self.day_month_name.captures(text)?;
        let day: u32 = caps.get(1)?.as_str().parse().ok()?;
        let month = month_from_word(caps.get(2)?.as_str())?;
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

/// Strict ISO-8601 forms: date, date-time, RFC 3339 and the basic `YYYYMMDD`.
fn parse_iso(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y%m%d"))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S"))
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}
