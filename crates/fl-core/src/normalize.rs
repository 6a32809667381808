//! Reading numbers, dates, units and flags out of CSV text.
//!
//! Every parser here returns `None` (or a default) instead of failing; a
//! record with an unreadable field simply contributes no value for it.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;

use crate::locale::{DateOrder, Locale};
use crate::tabular::simplify_header_name;
use crate::units::VolumeUnit;

/// Seconds added to a date that comes without a time of day.
pub const NOON_OFFSET_SECONDS: u32 = 12 * 60 * 60;

/// Converts raw field text into typed values using two locales.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    current: Locale,
    system: Locale,
}

impl Normalizer {
    /// Creates a normalizer for the given current locale. The system locale
    /// is always POSIX.
    #[must_use]
    pub const fn new(current: Locale) -> Self {
        Self {
            current,
            system: Locale::posix(),
        }
    }

    #[must_use]
    pub const fn with_system(current: Locale, system: Locale) -> Self {
        Self { current, system }
    }

    #[must_use]
    pub const fn current(&self) -> &Locale {
        &self.current
    }

    /// Parses a decimal number.
    ///
    /// Tries a strict scan in the current then the system locale, and then a
    /// scan that tolerates grouping separators in the same two locales.
    pub fn parse_number(&self, text: &str) -> Option<Decimal> {
        let text = text.trim();
        scan_decimal(text, self.current.decimal_separator)
            .or_else(|| scan_decimal(text, self.system.decimal_separator))
            .or_else(|| scan_grouped_decimal(text, &self.current))
            .or_else(|| scan_grouped_decimal(text, &self.system))
    }

    /// Parses a date with an optional time of day.
    ///
    /// Without a readable time the result lands on noon of that day so that
    /// time zone shifts never move it to a neighbouring date.
    pub fn parse_date(&self, date: &str, time: Option<&str>) -> Option<DateTime<Utc>> {
        let date = self.scan_date(date.trim())?;
        let time = time
            .and_then(|time| self.scan_time(time.trim()))
            .or_else(|| NaiveTime::from_num_seconds_from_midnight_opt(NOON_OFFSET_SECONDS, 0))?;
        Some(date.and_time(time).and_utc())
    }

    fn scan_date(&self, text: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .or_else(|| scan_short_date(text, self.current.date_order))
    }

    fn scan_time(&self, text: &str) -> Option<NaiveTime> {
        if let Ok(time) = NaiveTime::parse_from_str(text, "%H:%M") {
            return Some(time);
        }

        let formats: &[&str] = if self.current.twelve_hour_clock {
            &["%I:%M %p", "%I:%M%p", "%H:%M:%S"]
        } else {
            &["%H.%M", "%H:%M:%S"]
        };
        formats
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
    }

    /// Reads a volume unit column such as `L`, `G` or `Gal (UK)`.
    pub fn parse_volume_unit(&self, text: Option<&str>) -> VolumeUnit {
        let Some(text) = text else {
            return VolumeUnit::Liter;
        };

        let simplified = simplify_header_name(text);
        if simplified == "L" {
            return VolumeUnit::Liter;
        }
        if simplified == "G" {
            return VolumeUnit::default_gallon(self.current.region());
        }
        if simplified.contains("GAL") {
            if simplified.contains("US") {
                return VolumeUnit::GallonUs;
            }
            if simplified.contains("UK") {
                return VolumeUnit::GallonUk;
            }
            return VolumeUnit::default_gallon(self.current.region());
        }
        VolumeUnit::Liter
    }

    /// Reads a fill-up flag. A missing column means a full fill-up.
    pub fn parse_bool(&self, text: Option<&str>) -> bool {
        let Some(text) = text else {
            return true;
        };

        if let Some(number) = self.parse_number(text) {
            return !number.is_zero();
        }
        let upper = text.trim().to_uppercase();
        upper != "NO" && upper != "NEIN"
    }
}

/// Scans `[+-]digits[sep digits]` with nothing else around it.
fn scan_decimal(text: &str, decimal_separator: char) -> Option<Decimal> {
    let (negative, body) = split_sign(text);
    let (integer, fraction) = match body.split_once(decimal_separator) {
        Some((integer, fraction)) => (integer, fraction),
        None => (body, ""),
    };

    let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if integer.is_empty() && fraction.is_empty() {
        return None;
    }
    if !all_digits(integer) || !all_digits(fraction) {
        return None;
    }

    build_decimal(negative, integer, fraction)
}

/// Like [`scan_decimal`] but accepts grouping separators between
/// three-digit groups of the integer part.
fn scan_grouped_decimal(text: &str, locale: &Locale) -> Option<Decimal> {
    let (negative, body) = split_sign(text);
    let (integer, fraction) = match body.split_once(locale.decimal_separator) {
        Some((integer, fraction)) => (integer, fraction),
        None => (body, ""),
    };
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let is_grouping = |c: char| {
        c == locale.grouping_separator
            || (locale.grouping_separator.is_whitespace() && c.is_whitespace())
    };
    let mut groups = integer.split(is_grouping);
    let head = groups.next()?;
    if head.is_empty() || head.len() > 3 || !head.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut digits = head.to_string();
    for group in groups {
        if group.len() != 3 || !group.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.push_str(group);
    }

    build_decimal(negative, &digits, fraction)
}

fn split_sign(text: &str) -> (bool, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = text.strip_prefix('+') {
        (false, rest)
    } else {
        (false, text)
    }
}

fn build_decimal(negative: bool, integer: &str, fraction: &str) -> Option<Decimal> {
    let mut canonical = String::with_capacity(integer.len() + fraction.len() + 3);
    if negative {
        canonical.push('-');
    }
    canonical.push_str(if integer.is_empty() { "0" } else { integer });
    if !fraction.is_empty() {
        canonical.push('.');
        canonical.push_str(fraction);
    }
    canonical.parse().ok()
}

/// Reads a short numeric date like `16.07.13` or `7/16/2013`.
fn scan_short_date(text: &str, order: DateOrder) -> Option<NaiveDate> {
    let parts: Vec<&str> = text
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .collect();
    if parts.len() != 3 || text.chars().any(char::is_alphabetic) {
        return None;
    }

    let (year, month, day) = match order {
        DateOrder::DayMonthYear => (parts[2], parts[1], parts[0]),
        DateOrder::MonthDayYear => (parts[2], parts[0], parts[1]),
        DateOrder::YearMonthDay => (parts[0], parts[1], parts[2]),
    };

    let two_digit_year = year.len() <= 2;
    let mut year: i32 = year.parse().ok()?;
    if two_digit_year {
        year += if year < 70 { 2000 } else { 1900 };
    }
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}
