//! CSV import of events
//!
//! Expected header (order free, case-insensitive):
//! `name,description,amount,date,kind[,attachment]`
//!
//! Amounts may carry a currency symbol and thousands separators. Dates are
//! ISO 8601, or one of a few common US/European forms which are normalized to
//! `YYYY-MM-DD`. Every row is validated like input to the event store.

use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use crate::dates::parse_event_date;
use crate::error::{Error, Result};
use crate::models::{EventKind, NewEvent};

/// Column positions resolved from the header row
struct Columns {
    name: usize,
    description: Option<usize>,
    amount: usize,
    date: usize,
    kind: usize,
    attachment: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |wanted: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(wanted))
        };
        let require = |wanted: &str| {
            find(wanted).ok_or_else(|| Error::Import(format!("Missing column: {}", wanted)))
        };

        Ok(Self {
            name: require("name")?,
            description: find("description"),
            amount: require("amount")?,
            date: require("date")?,
            kind: require("kind")?,
            attachment: find("attachment"),
        })
    }
}

/// Parse events from CSV data
///
/// Fails on the first invalid row, naming its line number.
pub fn parse_events_csv<R: Read>(reader: R) -> Result<Vec<NewEvent>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = Columns::from_headers(rdr.headers()?)?;
    let mut events = Vec::new();

    for (index, result) in rdr.records().enumerate() {
        let record = result?;
        // Header is line 1
        let line = index + 2;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let event = parse_row(&record, &columns)
            .map_err(|e| Error::Import(format!("line {}: {}", line, e)))?;
        events.push(event);
    }

    debug!("Parsed {} events from CSV", events.len());
    Ok(events)
}

fn parse_row(record: &StringRecord, columns: &Columns) -> Result<NewEvent> {
    let field = |i: usize| record.get(i).unwrap_or("");
    let optional = |i: Option<usize>| {
        i.map(field)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    };

    let event = NewEvent {
        name: field(columns.name).to_string(),
        description: optional(columns.description),
        amount: parse_amount(field(columns.amount))?,
        date: normalize_date(field(columns.date))?,
        kind: field(columns.kind).parse::<EventKind>().map_err(Error::Import)?,
        attachment: optional(columns.attachment),
    };
    event.validate()?;
    Ok(event)
}

/// Keep ISO dates as written; rewrite other known forms as `YYYY-MM-DD`
fn normalize_date(s: &str) -> Result<String> {
    if parse_event_date(s).is_some() {
        return Ok(s.to_string());
    }

    // %Y also accepts short years, so pick formats by the year field's width
    let year_digits = s.rsplit(['/', '-']).next().map_or(0, |y| y.trim().len());
    let formats: &[&str] = match year_digits {
        4 => &[
            "%m/%d/%Y", // 01/15/2024
            "%d/%m/%Y", // 15/01/2024 (European)
            "%m-%d-%Y", // 01-15-2024
        ],
        2 => &[
            "%m/%d/%y", // 01/15/24
        ],
        _ => &[],
    };

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
        .ok_or_else(|| Error::Import(format!("Unable to parse date: {}", s)))
}

/// Parse an amount string, handling currency symbols and commas
fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s.trim().replace(['$', '€', ',', ' '], "");

    cleaned
        .parse::<f64>()
        .map_err(|_| Error::Import(format!("Unable to parse amount: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,234.56").unwrap(), 1234.56);
        assert_eq!(parse_amount(" 600 ").unwrap(), 600.0);
        assert!(parse_amount("abc").is_err());
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("2025-01-05").unwrap(), "2025-01-05");
        assert_eq!(
            normalize_date("2025-01-05T10:00:00Z").unwrap(),
            "2025-01-05T10:00:00Z"
        );
        assert_eq!(normalize_date("01/15/2024").unwrap(), "2024-01-15");
        assert_eq!(normalize_date("25/12/2024").unwrap(), "2024-12-25");
        assert_eq!(normalize_date("01/15/24").unwrap(), "2024-01-15");
        assert_eq!(normalize_date("01-15-2024").unwrap(), "2024-01-15");
        assert!(normalize_date("01/15/202").is_err());
        assert!(normalize_date("soon").is_err());
    }

    #[test]
    fn test_parse_events_csv() {
        let csv = r#"name,description,amount,date,kind
Salary,Monthly pay,"1,500.00",2025-01-05,income
Rent,,600,01/10/2025,expense
Groceries,Market,85.5,2025-01-12,egreso"#;

        let events = parse_events_csv(csv.as_bytes()).unwrap();
        assert_eq!(events.len(), 3);

        assert_eq!(events[0].name, "Salary");
        assert_eq!(events[0].amount, 1500.0);
        assert_eq!(events[0].kind, EventKind::Income);
        assert_eq!(events[0].description.as_deref(), Some("Monthly pay"));

        assert!(events[1].description.is_none());
        assert_eq!(events[1].date, "2025-01-10");
        assert_eq!(events[2].kind, EventKind::Expense);
    }

    #[test]
    fn test_columns_in_any_order() {
        let csv = "Kind,Date,Amount,Name,Attachment\nexpense,2025-02-01,20,Gas,aGVsbG8=\n";
        let events = parse_events_csv(csv.as_bytes()).unwrap();
        assert_eq!(events[0].name, "Gas");
        assert_eq!(events[0].attachment.as_deref(), Some("aGVsbG8="));
    }

    #[test]
    fn test_missing_column() {
        let csv = "name,amount,date\nRent,600,2025-01-10\n";
        let err = parse_events_csv(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("kind"));
    }

    #[test]
    fn test_invalid_row_reports_line() {
        let csv = "name,amount,date,kind\nRent,600,2025-01-10,expense\nBad,-5,2025-01-11,expense\n";
        let err = parse_events_csv(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_blank_rows_skipped() {
        let csv = "name,amount,date,kind\n,,,\nRent,600,2025-01-10,expense\n";
        let events = parse_events_csv(csv.as_bytes()).unwrap();
        assert_eq!(events.len(), 1);
    }
}
