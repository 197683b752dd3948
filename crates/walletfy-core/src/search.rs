//! Period search over events
//!
//! Matches a free-text query such as "july 2025", "2024" or "marzo" against
//! each event's month name and year. Matching ignores case and accents.

use chrono::Datelike;

use crate::dates::Locale;
use crate::models::Event;

/// Events whose period matches `query`
///
/// A blank query returns every event. Events with an unparseable date never
/// match a non-blank query.
pub fn filter_by_period<'a>(events: &'a [Event], query: &str, locale: Locale) -> Vec<&'a Event> {
    let needle = fold(query.trim());
    if needle.is_empty() {
        return events.iter().collect();
    }

    events
        .iter()
        .filter(|event| {
            event.parsed_date().is_some_and(|date| {
                let month = fold(locale.month_name(date.month()));
                let year = date.year().to_string();
                let month_year = format!("{} {}", month, year);

                month.contains(&needle) || year.contains(&needle) || month_year.contains(&needle)
            })
        })
        .collect()
}

/// Lowercase and strip diacritics from Latin letters
fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        })
        .collect()
}
