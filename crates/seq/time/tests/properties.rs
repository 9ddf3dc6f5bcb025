//! Property tests: balancing is idempotent and its suggestions are balanced.
//!
//! `balance` must be a fixed point after one application: feeding its own
//! output back in returns the same tag, whether the first result was an
//! already-balanced literal, a suggestion, a pass-through numeric form, or a
//! hard error.

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use seq_time::{balance, is_balanced, is_valid, TimeDialect};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Generate an absolute literal with fields that may be out of range.
fn arb_absolute() -> impl Strategy<Value = String> {
    (
        0i64..=9999,
        0i64..=999,
        0i64..=99,
        0i64..=99,
        0i64..=99,
        proptest::option::of("[0-9]{1,6}"),
    )
        .prop_map(|(year, day, hour, minute, second, frac)| {
            let mut text = format!("{year:04}-{day:03}T{hour:02}:{minute:02}:{second:02}");
            if let Some(frac) = frac {
                text.push('.');
                text.push_str(&frac);
            }
            text
        })
}

/// Generate a duration literal, optionally signed for the epoch dialect.
fn arb_duration(signed: bool) -> impl Strategy<Value = String> {
    (
        proptest::option::of(0i64..=500),
        0i64..=99,
        0i64..=99,
        0i64..=99,
        proptest::option::of("[0-9]{1,6}"),
        any::<bool>(),
    )
        .prop_map(move |(day, hour, minute, second, frac, negative)| {
            let mut text = String::new();
            if signed && negative {
                text.push('-');
            }
            if let Some(day) = day {
                text.push_str(&format!("{day:03}T"));
            }
            text.push_str(&format!("{hour:02}:{minute:02}:{second:02}"));
            if let Some(frac) = frac {
                text.push('.');
                text.push_str(&frac);
            }
            text
        })
}

/// Generate the simple numeric-seconds form.
fn arb_simple() -> impl Strategy<Value = String> {
    ("[0-9]{1,9}", proptest::option::of("[0-9]{1,3}")).prop_map(|(whole, frac)| match frac {
        Some(frac) => format!("{whole}.{frac}"),
        None => whole,
    })
}

fn check_fixed_point(text: &str, dialect: TimeDialect) -> Result<(), TestCaseError> {
    prop_assert!(is_valid(text, dialect));
    let first = balance(text, dialect);
    let second = balance(&first.tag, dialect);
    prop_assert_eq!(&second.tag, &first.tag);

    if first.is_error {
        // Hard errors leave the input untouched
        prop_assert_eq!(first.tag.as_str(), text);
    } else if first.message.is_some() && is_balanced(&first.tag, dialect) {
        // A suggestion must itself be accepted verbatim
        prop_assert!(!second.is_error);
        prop_assert!(second.message.is_none());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// Balancing an absolute literal twice changes nothing after the first pass.
    #[test]
    fn absolute_balance_is_idempotent(text in arb_absolute()) {
        check_fixed_point(&text, TimeDialect::Absolute)?;
    }

    /// Balancing a relative literal twice changes nothing after the first pass.
    #[test]
    fn relative_balance_is_idempotent(text in arb_duration(false)) {
        check_fixed_point(&text, TimeDialect::Relative)?;
    }

    /// Balancing an epoch literal twice changes nothing after the first pass.
    #[test]
    fn epoch_balance_is_idempotent(text in arb_duration(true)) {
        check_fixed_point(&text, TimeDialect::Epoch)?;
    }

    /// A non-error fielded result always yields a balanced tag.
    #[test]
    fn suggestions_are_balanced(text in arb_absolute()) {
        let result = balance(&text, TimeDialect::Absolute);
        if !result.is_error {
            prop_assert!(is_balanced(&result.tag, TimeDialect::Absolute));
        }
    }

    /// The numeric-seconds form round-trips untouched in every dialect.
    #[test]
    fn simple_form_passes_through(text in arb_simple()) {
        for dialect in [TimeDialect::Absolute, TimeDialect::Relative, TimeDialect::Epoch] {
            let result = balance(&text, dialect);
            prop_assert_eq!(result.tag.as_str(), text.as_str());
            prop_assert!(!result.is_error);
            prop_assert!(!is_balanced(&text, dialect));
        }
    }
}
