//! Number and date conventions of a locale.
//!
//! A [`Locale`] is an explicit value rather than ambient process state.
//! The importer is handed two of them: the user's current locale and the
//! fixed POSIX system locale.

use serde::{Deserialize, Serialize};

/// Order of the day, month and year components in a short date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    DayMonthYear,
    MonthDayYear,
    YearMonthDay,
}

/// Formatting conventions used when reading numbers, dates and times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locale {
    pub decimal_separator: char,
    pub grouping_separator: char,
    pub date_order: DateOrder,
    /// Whether short times are written with an AM/PM marker.
    pub twelve_hour_clock: bool,
    /// Upper-case region code, e.g. `DE` or `US`.
    pub region: Option<String>,
}

impl Default for Locale {
    fn default() -> Self {
        Self::posix()
    }
}

impl Locale {
    /// The POSIX ("C") locale used as the system locale.
    #[must_use]
    pub const fn posix() -> Self {
        Self {
            decimal_separator: '.',
            grouping_separator: ',',
            date_order: DateOrder::YearMonthDay,
            twelve_hour_clock: false,
            region: None,
        }
    }

    /// Builds a locale from a tag such as `de_DE.UTF-8`, `en-US` or `fr`.
    ///
    /// Unknown languages fall back to POSIX conventions but keep their region.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.split(['.', '@']).next().unwrap_or_default();
        if tag.is_empty() || tag == "C" || tag == "POSIX" {
            return Self::posix();
        }

        let mut parts = tag.split(['_', '-']);
        let language = parts.next().unwrap_or_default().to_ascii_lowercase();
        let region = parts
            .next()
            .filter(|region| !region.is_empty())
            .map(str::to_ascii_uppercase);

        let mut locale = match language.as_str() {
            "en" => match region.as_deref() {
                Some("US") => Self {
                    date_order: DateOrder::MonthDayYear,
                    twelve_hour_clock: true,
                    ..Self::posix()
                },
                _ => Self {
                    date_order: DateOrder::DayMonthYear,
                    ..Self::posix()
                },
            },
            "de" | "da" | "nl" | "it" | "es" | "pt" | "tr" | "id" => Self {
                decimal_separator: ',',
                grouping_separator: '.',
                date_order: DateOrder::DayMonthYear,
                twelve_hour_clock: false,
                region: None,
            },
            "fr" | "sv" | "fi" | "nb" | "no" | "cs" | "pl" | "ru" | "uk" => Self {
                decimal_separator: ',',
                grouping_separator: ' ',
                date_order: DateOrder::DayMonthYear,
                twelve_hour_clock: false,
                region: None,
            },
            _ => Self::posix(),
        };

        if language == "de" && region.as_deref() == Some("CH") {
            locale.decimal_separator = '.';
            locale.grouping_separator = '\'';
        }

        locale.region = region;
        locale
    }

    /// Reads the locale from `LC_ALL`, `LC_NUMERIC` or `LANG`, in that order.
    #[must_use]
    pub fn from_env() -> Self {
        ["LC_ALL", "LC_NUMERIC", "LANG"]
            .into_iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|value| !value.is_empty())
            .map_or_else(Self::posix, |tag| Self::from_tag(&tag))
    }

    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}
