//! Reference date parsing.
//!
//! Dates are read year-month-day first. Relative forms are resolved
//! against a caller-supplied `today` so results are reproducible.

use chrono::{Days, Months, NaiveDate};

use crate::error::{Error, Result};

const FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Parse a reference date.
///
/// Accepted: `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY.MM.DD`, `YYYYMMDD`, `today`,
/// `yesterday` and `N day(s)|week(s)|month(s)|year(s) ago`.
pub fn parse_reference_date(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    let trimmed = input.trim();
    let lower = trimmed.to_ascii_lowercase();

    match lower.as_str() {
        "today" | "now" => return Ok(today),
        "yesterday" => return shift_back(input, today, 1, Unit::Day),
        _ => {}
    }

    for format in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }
    if let Some(date) = parse_compact(trimmed) {
        return Ok(date);
    }

    if let Some((amount, unit)) = parse_relative(&lower) {
        return shift_back(input, today, amount, unit);
    }

    Err(invalid(input, "expected YYYY-MM-DD, 'today' or 'N days/weeks/months/years ago'"))
}

/// `YYYYMMDD`, split by position.
fn parse_compact(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = s[0..4].parse().ok()?;
    let month = s[4..6].parse().ok()?;
    let day = s[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Unit {
    Day,
    Week,
    Month,
    Year,
}

/// `"3 months ago"` → `(3, Month)`.
fn parse_relative(lower: &str) -> Option<(u32, Unit)> {
    let mut words = lower.split_whitespace();
    let amount = words.next()?.parse::<u32>().ok()?;
    let unit = match words.next()? {
        "day" | "days" => Unit::Day,
        "week" | "weeks" => Unit::Week,
        "month" | "months" => Unit::Month,
        "year" | "years" => Unit::Year,
        _ => return None,
    };
    if words.next()? != "ago" || words.next().is_some() {
        return None;
    }
    Some((amount, unit))
}

fn shift_back(input: &str, today: NaiveDate, amount: u32, unit: Unit) -> Result<NaiveDate> {
    let shifted = match unit {
        Unit::Day => today.checked_sub_days(Days::new(u64::from(amount))),
        Unit::Week => today.checked_sub_days(Days::new(u64::from(amount) * 7)),
        Unit::Month => today.checked_sub_months(Months::new(amount)),
        Unit::Year => amount
            .checked_mul(12)
            .and_then(|months| today.checked_sub_months(Months::new(months))),
    };
    shifted.ok_or_else(|| invalid(input, "out of range"))
}

fn invalid(input: &str, reason: &str) -> Error {
    Error::Date {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn today() -> NaiveDate {
        d(2024, 3, 31)
    }

    #[test]
    fn absolute_formats() {
        for input in ["2023-01-15", "2023/01/15", "2023.01.15", "20230115", " 2023-01-15 "] {
            assert_eq!(parse_reference_date(input, today()).unwrap(), d(2023, 1, 15), "{input}");
        }
    }

    #[test]
    fn today_keyword() {
        assert_eq!(parse_reference_date("today", today()).unwrap(), today());
        assert_eq!(parse_reference_date("Today", today()).unwrap(), today());
        assert_eq!(parse_reference_date("yesterday", today()).unwrap(), d(2024, 3, 30));
    }

    #[test]
    fn relative_forms() {
        assert_eq!(parse_reference_date("10 days ago", today()).unwrap(), d(2024, 3, 21));
        assert_eq!(parse_reference_date("1 day ago", today()).unwrap(), d(2024, 3, 30));
        assert_eq!(parse_reference_date("2 weeks ago", today()).unwrap(), d(2024, 3, 17));
        assert_eq!(parse_reference_date("1 year ago", today()).unwrap(), d(2023, 3, 31));
    }

    #[test]
    fn month_end_clamps() {
        // 31 March minus one month lands on the last day of February.
        assert_eq!(parse_reference_date("1 month ago", today()).unwrap(), d(2024, 2, 29));
    }

    #[test]
    fn rejects_garbage() {
        for input in ["", "15-01-2023", "next week", "3 fortnights ago", "3 days", "2023-02-30"] {
            let err = parse_reference_date(input, today()).unwrap_err();
            assert!(matches!(err, Error::Date { .. }), "{input}");
        }
    }

    #[test]
    fn error_names_input() {
        let err = parse_reference_date("soon", today()).unwrap_err();
        assert!(err.to_string().contains("\"soon\""));
    }
}
