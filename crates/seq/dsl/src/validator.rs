//! Argument validation and defaulting against dictionary definitions
//!
//! One validate and one default behavior per argument kind. Validation
//! returns diagnostics, never faults; defaulting returns a literal that the
//! grammar accepts in that argument position.

use seq_time::TimeDialect;
use seq_types::{
    codes, Argument, DictEnum, Diagnostic, FswCommandArgument, NumericRange, Span,
};
use std::collections::HashMap;

type EnumMap = HashMap<String, DictEnum>;

/// Produce a grammar-correct default literal for an argument definition.
///
/// Numeric kinds use the declared default, then the range minimum, then
/// zero. Enums use the declared default, then the first symbol of their
/// enumeration. Booleans default to `FALSE`. Repeats emit the minimum
/// occurrence count of nested defaults inside one bracket pair.
pub fn default_value(def: &FswCommandArgument, enums: Option<&EnumMap>) -> String {
    match def {
        FswCommandArgument::Boolean { default_value, .. } => {
            default_value.clone().unwrap_or_else(|| "FALSE".to_string())
        }
        FswCommandArgument::Enum { enum_name, default_value, .. } => default_value
            .clone()
            .or_else(|| {
                enums
                    .and_then(|map| map.get(enum_name))
                    .and_then(|e| e.values.first())
                    .map(|v| v.symbol.clone())
            })
            .unwrap_or_default(),
        FswCommandArgument::Float { range, default_value, .. }
        | FswCommandArgument::Numeric { range, default_value, .. } => default_value
            .map(format_number)
            .or_else(|| range.map(|r| format_number(r.min)))
            .unwrap_or_else(|| "0".to_string()),
        FswCommandArgument::Integer { range, default_value, .. } => default_value
            .map(|v| v.to_string())
            .or_else(|| range.map(|r| format_number(r.min)))
            .unwrap_or_else(|| "0".to_string()),
        FswCommandArgument::Unsigned { range, default_value, .. } => default_value
            .map(|v| v.to_string())
            .or_else(|| range.map(|r| format_number(r.min.max(0.0))))
            .unwrap_or_else(|| "0".to_string()),
        FswCommandArgument::VarString { default_value, .. }
        | FswCommandArgument::FixedString { default_value, .. } => {
            format!("\"{}\"", default_value.clone().unwrap_or_default())
        }
        FswCommandArgument::Time { default_value, .. } => {
            default_value.clone().unwrap_or_else(|| "00:00:00".to_string())
        }
        FswCommandArgument::Fill { default_value, .. } => {
            format!("\"{}\"", default_value.clone().unwrap_or_default())
        }
        FswCommandArgument::Repeat { repeat, .. } => {
            let count = repeat.min.unwrap_or(1);
            let tuple: Vec<String> = repeat
                .arguments
                .iter()
                .map(|inner| default_value(inner, enums))
                .collect();
            let mut body = Vec::new();
            for _ in 0..count {
                body.extend(tuple.iter().cloned());
            }
            format!("[{}]", body.join(" "))
        }
    }
}

/// Validate a resolved argument against its definition.
///
/// Numeric kinds are range- and integrality-checked (hex literals are
/// decoded first), enums are membership-checked, booleans must be boolean
/// tokens, and repeats are checked for occurrence count and tuple width and
/// recursively per element.
pub fn validate_arg(
    arg: &Argument,
    def: &FswCommandArgument,
    enums: Option<&EnumMap>,
    span: Option<Span>,
) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    match def {
        FswCommandArgument::Boolean { name, .. } => match arg {
            Argument::Boolean { .. } => {}
            Argument::Symbol { value, .. } if value == "TRUE" || value == "FALSE" => {}
            other => out.push(type_mismatch(name, "a boolean", other, span)),
        },
        FswCommandArgument::Enum { name, enum_name, .. } => {
            let symbol = match arg {
                Argument::Symbol { value, .. } | Argument::String { value, .. } => value,
                other => {
                    out.push(type_mismatch(name, "an enum symbol", other, span));
                    return out;
                }
            };
            // An unknown enumeration name is a dictionary defect, not a
            // sequence defect; skip the membership check
            if let Some(e) = enums.and_then(|map| map.get(enum_name)) {
                if !e.contains_symbol(symbol) {
                    out.push(Diagnostic::error(
                        codes::ARG_ENUM,
                        format!("`{symbol}` is not a member of enumeration `{enum_name}`"),
                        span,
                    ));
                }
            }
        }
        FswCommandArgument::Float { name, range, .. }
        | FswCommandArgument::Numeric { name, range, .. } => {
            if let Some(value) = numeric_value(arg) {
                check_range(name, value, range, &mut out, span);
            } else if !matches!(arg, Argument::Symbol { .. }) {
                out.push(type_mismatch(name, "a number", arg, span));
            }
        }
        FswCommandArgument::Integer { name, range, .. } => {
            if let Some(value) = numeric_value(arg) {
                if value.fract() != 0.0 {
                    out.push(Diagnostic::error(
                        codes::ARG_TYPE,
                        format!("argument `{name}` expects an integer, got `{value}`"),
                        span,
                    ));
                }
                check_range(name, value, range, &mut out, span);
            } else if !matches!(arg, Argument::Symbol { .. }) {
                out.push(type_mismatch(name, "an integer", arg, span));
            }
        }
        FswCommandArgument::Unsigned { name, range, .. } => {
            if let Some(value) = numeric_value(arg) {
                if value.fract() != 0.0 || value < 0.0 {
                    out.push(Diagnostic::error(
                        codes::ARG_TYPE,
                        format!("argument `{name}` expects an unsigned integer, got `{value}`"),
                        span,
                    ));
                }
                check_range(name, value, range, &mut out, span);
            } else if !matches!(arg, Argument::Symbol { .. }) {
                out.push(type_mismatch(name, "an unsigned integer", arg, span));
            }
        }
        FswCommandArgument::VarString { name, .. }
        | FswCommandArgument::FixedString { name, .. }
        | FswCommandArgument::Fill { name, .. } => {
            if !matches!(arg, Argument::String { .. } | Argument::Symbol { .. }) {
                out.push(type_mismatch(name, "a string", arg, span));
            }
        }
        FswCommandArgument::Time { name, .. } => {
            let literal = match arg {
                Argument::String { value, .. } | Argument::Symbol { value, .. } => Some(value),
                Argument::Number { .. } => None, // numeric-seconds form
                other => {
                    out.push(type_mismatch(name, "a time literal", other, span));
                    None
                }
            };
            if let Some(literal) = literal {
                let valid = [TimeDialect::Absolute, TimeDialect::Relative, TimeDialect::Epoch]
                    .iter()
                    .any(|d| seq_time::is_valid(literal, *d));
                if !valid {
                    out.push(Diagnostic::error(
                        codes::ARG_TYPE,
                        format!("argument `{name}` expects a time literal, got `{literal}`"),
                        span,
                    ));
                }
            }
        }
        FswCommandArgument::Repeat { name, repeat } => {
            let tuples = match arg {
                Argument::Repeat { value, .. } => value,
                other => {
                    out.push(type_mismatch(name, "a repeat group", other, span));
                    return out;
                }
            };
            let count = tuples.len() as u32;
            let min = repeat.min.unwrap_or(0);
            let max = repeat.max.unwrap_or(u32::MAX);
            if count < min || count > max {
                out.push(Diagnostic::error(
                    codes::ARG_ARITY,
                    format!(
                        "repeat `{name}` occurs {count} times, expected between {min} and {}",
                        if repeat.max.is_some() { max.to_string() } else { "unbounded".to_string() }
                    ),
                    span,
                ));
            }
            for tuple in tuples {
                if tuple.len() != repeat.arity() {
                    out.push(Diagnostic::error(
                        codes::ARG_ARITY,
                        format!(
                            "repeat `{name}` tuple has {} values, expected {}",
                            tuple.len(),
                            repeat.arity()
                        ),
                        span,
                    ));
                    continue;
                }
                for (element, inner) in tuple.iter().zip(&repeat.arguments) {
                    out.extend(validate_arg(element, inner, enums, span));
                }
            }
        }
    }
    out
}

// ── Helpers ──────────────────────────────────────────────────────────

/// A numeric reading of an argument, decoding hex literals
fn numeric_value(arg: &Argument) -> Option<f64> {
    match arg {
        Argument::Number { value, .. } => Some(*value),
        Argument::Hex { value, .. } => {
            let digits = value.trim_start_matches("0x").trim_start_matches("0X");
            u64::from_str_radix(digits, 16).ok().map(|v| v as f64)
        }
        _ => None,
    }
}

fn check_range(
    name: &str,
    value: f64,
    range: &Option<NumericRange>,
    out: &mut Vec<Diagnostic>,
    span: Option<Span>,
) {
    if let Some(range) = range {
        if value < range.min || value > range.max {
            out.push(Diagnostic::error(
                codes::ARG_RANGE,
                format!(
                    "argument `{name}` value {value} is outside [{}, {}]",
                    format_number(range.min),
                    format_number(range.max)
                ),
                span,
            ));
        }
    }
}

fn type_mismatch(name: &str, expected: &str, got: &Argument, span: Option<Span>) -> Diagnostic {
    let kind = match got {
        Argument::Boolean { .. } => "a boolean",
        Argument::Number { .. } => "a number",
        Argument::Hex { .. } => "a hex literal",
        Argument::String { .. } => "a string",
        Argument::Symbol { .. } => "a symbol",
        Argument::Repeat { .. } => "a repeat group",
    };
    Diagnostic::error(
        codes::ARG_TYPE,
        format!("argument `{name}` expects {expected}, got {kind}"),
        span,
    )
}

/// Integral values print without a trailing `.0`
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
