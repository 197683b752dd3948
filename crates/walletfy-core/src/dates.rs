//! Date parsing, month keys and localized month labels

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Parse an ISO 8601 date or date-time into a calendar date
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and naive `YYYY-MM-DDTHH:MM:SS`
/// (with or without fractional seconds). Time zones are ignored: the calendar
/// date written in the string is the one used.
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local().date());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Canonical calendar month, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

/// Formats as zero-padded `YYYY-MM`
impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// `YYYY-MM` key for a date
pub fn month_key(date: NaiveDate) -> String {
    MonthKey::from_date(date).to_string()
}

/// Language used for display labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "es")]
    Spanish,
}

const MONTHS_EN: [&str; 12] = [
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

const MONTHS_ES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Spanish => "es",
        }
    }

    /// Lowercase month name, `month` is 1-based
    pub fn month_name(&self, month: u32) -> &'static str {
        let names = match self {
            Self::English => &MONTHS_EN,
            Self::Spanish => &MONTHS_ES,
        };
        names[(month.clamp(1, 12) - 1) as usize]
    }
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" => Ok(Self::English),
            "es" | "spanish" | "español" => Ok(Self::Spanish),
            _ => Err(format!("Unknown locale: {} (valid: en, es)", s)),
        }
    }
}

/// Human-readable month label, e.g. "March 2025"
pub fn month_label(key: MonthKey, locale: Locale) -> String {
    format!("{} {}", capitalize(locale.month_name(key.month)), key.year)
}

/// Uppercase the first character
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_date() {
        assert_eq!(
            parse_event_date("2025-01-05"),
            NaiveDate::from_ymd_opt(2025, 1, 5)
        );
        assert_eq!(
            parse_event_date(" 2025-01-05 "),
            NaiveDate::from_ymd_opt(2025, 1, 5)
        );
    }

    #[test]
    fn test_parse_datetimes() {
        assert_eq!(
            parse_event_date("2025-02-28T23:30:00Z"),
            NaiveDate::from_ymd_opt(2025, 2, 28)
        );
        assert_eq!(
            parse_event_date("2025-02-28T10:00:00-05:00"),
            NaiveDate::from_ymd_opt(2025, 2, 28)
        );
        assert_eq!(
            parse_event_date("2025-02-28T10:00:00.123"),
            NaiveDate::from_ymd_opt(2025, 2, 28)
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_event_date("").is_none());
        assert!(parse_event_date("yesterday").is_none());
        assert!(parse_event_date("2025-02-30").is_none());
    }

    #[test]
    fn test_month_key_format_and_order() {
        let jan = MonthKey { year: 2025, month: 1 };
        let dec = MonthKey { year: 2024, month: 12 };
        assert_eq!(jan.to_string(), "2025-01");
        assert!(dec < jan);
        assert_eq!(
            month_key(NaiveDate::from_ymd_opt(987, 3, 1).unwrap()),
            "0987-03"
        );
    }

    #[test]
    fn test_month_label() {
        let key = MonthKey { year: 2025, month: 3 };
        assert_eq!(month_label(key, Locale::English), "March 2025");
        assert_eq!(month_label(key, Locale::Spanish), "Marzo 2025");
    }

    #[test]
    fn test_locale_parse() {
        assert_eq!("es".parse::<Locale>().unwrap(), Locale::Spanish);
        assert_eq!("EN".parse::<Locale>().unwrap(), Locale::English);
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("marzo"), "Marzo");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("ñandú"), "Ñandú");
    }
}
