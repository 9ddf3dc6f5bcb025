//! Carry/borrow normalization and range checks
//!
//! Balancing carries overflow upward through the fields: microseconds into
//! seconds, seconds into minutes, minutes into hours, hours into days, and,
//! for the absolute dialect only, days into years using the 365/366 day
//! count of each year crossed. A day-of-year of zero borrows one year
//! downward the same way.
//!
//! Range policy: an absolute time that normalizes past year 9999 and a
//! duration that normalizes past 365 days are hard errors. A literal that is
//! merely unbalanced is a suggestion, not an error.

use crate::fields::{self, Parsed, TimeFields};
use crate::TimeDialect;

/// Outcome of [`balance`].
///
/// On success `tag` is the balanced literal (the input itself when it was
/// already balanced). On error `tag` is the input unchanged and `message`
/// says why. An unbalanced input comes back with `is_error` false, the
/// suggested literal in `tag`, and an explanatory `message`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceResult {
    pub tag: String,
    pub is_error: bool,
    pub message: Option<String>,
}

impl BalanceResult {
    fn ok(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), is_error: false, message: None }
    }

    fn advise(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self { tag: tag.into(), is_error: false, message: Some(message.into()) }
    }

    fn fail(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self { tag: tag.into(), is_error: true, message: Some(message.into()) }
    }
}

/// Is `text` a well-formed literal of `dialect`, fielded or simple?
pub fn is_valid(text: &str, dialect: TimeDialect) -> bool {
    fields::parse(text, dialect).is_some()
}

/// Is `text` a fielded literal with every field inside its natural range?
/// The simple numeric form is never balanced.
pub fn is_balanced(text: &str, dialect: TimeDialect) -> bool {
    match fields::parse(text, dialect) {
        Some(Parsed::Fields(f)) => check_balanced(&f, dialect),
        _ => false,
    }
}

/// Does `text` normalize past the dialect's maximum range?
pub fn is_max(text: &str, dialect: TimeDialect) -> bool {
    match fields::parse(text, dialect) {
        Some(Parsed::Fields(f)) => normalize(&f, dialect).is_err(),
        _ => false,
    }
}

/// Normalize `text`, carrying and borrowing fields into natural range
pub fn balance(text: &str, dialect: TimeDialect) -> BalanceResult {
    match fields::parse(text, dialect) {
        None => BalanceResult::fail(text, format!("invalid {dialect} time `{text}`")),
        Some(Parsed::Simple) => {
            BalanceResult::advise(text, "numeric-seconds form has no fields to balance")
        }
        Some(Parsed::Fields(f)) => {
            if check_balanced(&f, dialect) {
                return BalanceResult::ok(text);
            }
            match normalize(&f, dialect) {
                Ok(balanced) => {
                    let tag = fields::format(&balanced, dialect);
                    let message = format!("unbalanced {dialect} time, suggested `{tag}`");
                    BalanceResult::advise(tag, message)
                }
                Err(why) => BalanceResult::fail(text, why),
            }
        }
    }
}

// ── Internals ────────────────────────────────────────────────────────

fn check_balanced(f: &TimeFields, dialect: TimeDialect) -> bool {
    if f.second > 59 || f.minute > 59 || f.hour > 23 {
        return false;
    }
    match dialect {
        TimeDialect::Absolute => {
            let year = f.year.unwrap_or(0);
            let day = f.day.unwrap_or(0);
            day >= 1 && day <= days_in_year(year)
        }
        TimeDialect::Relative | TimeDialect::Epoch => f.day.unwrap_or(0) <= 365,
    }
}

fn normalize(f: &TimeFields, dialect: TimeDialect) -> Result<TimeFields, String> {
    // micros scanned as at most six digits, so carries start at seconds
    let total_seconds = f.second + f.minute * 60 + f.hour * 3600;
    let second = total_seconds % 60;
    let minute = (total_seconds / 60) % 60;
    let hour = (total_seconds / 3600) % 24;
    let carried_days = total_seconds / 86_400;

    match dialect {
        TimeDialect::Absolute => {
            let mut year = f.year.unwrap_or(0);
            let mut day = f.day.unwrap_or(1) + carried_days;
            while day > days_in_year(year) {
                day -= days_in_year(year);
                year += 1;
                if year > 9999 {
                    return Err("normalized year exceeds 9999".to_string());
                }
            }
            while day < 1 {
                year -= 1;
                if year < 0 {
                    return Err("normalized year is before year 0000".to_string());
                }
                day += days_in_year(year);
            }
            Ok(TimeFields {
                sign: None,
                year: Some(year),
                day: Some(day),
                hour,
                minute,
                second,
                micros: f.micros,
            })
        }
        TimeDialect::Relative | TimeDialect::Epoch => {
            let day = f.day.unwrap_or(0) + carried_days;
            if day > 365 {
                return Err("normalized duration exceeds 365 days".to_string());
            }
            Ok(TimeFields {
                sign: f.sign,
                year: None,
                day: Some(day),
                hour,
                minute,
                second,
                micros: f.micros,
            })
        }
    }
}

fn days_in_year(year: i64) -> i64 {
    if chrono::NaiveDate::from_yo_opt(year as i32, 366).is_some() {
        366
    } else {
        365
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_max_at_the_absolute_boundary() {
        assert!(is_max("9999-365T23:59:60.999", TimeDialect::Absolute));
        assert!(!is_max("9999-364T23:59:59.999", TimeDialect::Absolute));
    }

    #[test]
    fn test_is_balanced_boundaries() {
        assert!(is_balanced("2024-001T00:00:00", TimeDialect::Absolute));
        assert!(!is_balanced("2024-001T12:90:00", TimeDialect::Absolute));
    }

    #[test]
    fn test_balance_suggests_carried_literal() {
        let result = balance("2024-001T12:90:00", TimeDialect::Absolute);
        assert_eq!(result.tag, "2024-001T13:30:00");
        assert!(!result.is_error);
        assert!(result.message.is_some());
    }

    #[test]
    fn test_balance_returns_balanced_input_verbatim() {
        let result = balance("2024-001T00:00:00", TimeDialect::Absolute);
        assert_eq!(result.tag, "2024-001T00:00:00");
        assert!(!result.is_error);
        assert!(result.message.is_none());
    }

    #[test]
    fn test_balance_rejects_malformed_text() {
        let result = balance("2024-01T00:00", TimeDialect::Absolute);
        assert!(result.is_error);
        assert_eq!(result.tag, "2024-01T00:00");

        assert!(!is_valid("garbage", TimeDialect::Relative));
    }

    #[test]
    fn test_simple_form_is_neutral() {
        let result = balance("90.5", TimeDialect::Relative);
        assert_eq!(result.tag, "90.5");
        assert!(!result.is_error);
        assert!(result.message.is_some());
        assert!(!is_balanced("90.5", TimeDialect::Relative));
        assert!(!is_max("90.5", TimeDialect::Relative));
    }

    #[test]
    fn test_seconds_carry_across_the_day_boundary() {
        let result = balance("001T23:59:70", TimeDialect::Relative);
        assert_eq!(result.tag, "002T00:00:10");
        assert!(!result.is_error);
    }

    #[test]
    fn test_relative_overflow_is_a_hard_error() {
        let result = balance("365T24:00:00", TimeDialect::Relative);
        assert!(result.is_error);
        assert_eq!(result.tag, "365T24:00:00");
        assert!(is_max("365T24:00:00", TimeDialect::Relative));
        assert!(!is_max("365T23:59:59", TimeDialect::Relative));
    }

    #[test]
    fn test_leap_year_day_counts() {
        assert!(is_balanced("2024-366T00:00:00", TimeDialect::Absolute));
        assert!(!is_balanced("2023-366T00:00:00", TimeDialect::Absolute));
        let result = balance("2023-366T00:00:00", TimeDialect::Absolute);
        assert_eq!(result.tag, "2024-001T00:00:00");
    }

    #[test]
    fn test_absolute_day_zero_borrows_a_year() {
        let result = balance("2024-000T12:00:00", TimeDialect::Absolute);
        assert_eq!(result.tag, "2023-365T12:00:00");
        assert!(!result.is_error);
    }

    #[test]
    fn test_year_underflow_is_a_hard_error() {
        let result = balance("0000-000T00:00:00", TimeDialect::Absolute);
        assert!(result.is_error);
    }

    #[test]
    fn test_epoch_sign_survives_balancing() {
        let result = balance("-00:00:90", TimeDialect::Epoch);
        assert_eq!(result.tag, "-00:01:30");

        let plus = balance("+00:00:90", TimeDialect::Epoch);
        assert_eq!(plus.tag, "+00:01:30");
    }

    #[test]
    fn test_fraction_truncates_to_milliseconds_in_suggestions() {
        let result = balance("00:00:90.123456", TimeDialect::Relative);
        assert_eq!(result.tag, "00:01:30.123");
    }

    #[test]
    fn test_day_field_appears_once_carried() {
        let result = balance("48:00:00", TimeDialect::Relative);
        assert_eq!(result.tag, "002T00:00:00");
    }
}
