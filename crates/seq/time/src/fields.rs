//! Strict scanning and formatting of time literals
//!
//! Field widths are fixed: 4-digit year, 3-digit day, 2-digit hour, minute,
//! and second, and a 1 to 6 digit sub-second fraction held as microseconds.
//! Field values may exceed their natural range (`12:90:00` scans fine);
//! range is the balance module's concern, not the scanner's.

use crate::TimeDialect;

/// The scanned fields of one fielded time literal.
///
/// `day` is 1-based for the absolute dialect and 0-based for durations.
/// `sign` is the explicit leading sign character, when the dialect allows
/// one and the literal carried it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TimeFields {
    pub sign: Option<char>,
    pub year: Option<i64>,
    pub day: Option<i64>,
    pub hour: i64,
    pub minute: i64,
    pub second: i64,
    pub micros: i64,
}

/// A successfully scanned literal: either full fields or the pass-through
/// numeric-seconds form
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Parsed {
    Fields(TimeFields),
    Simple,
}

/// Scan `text` against `dialect`, trying the fielded grammar first and the
/// simple numeric form second. `None` means the literal is malformed.
pub(crate) fn parse(text: &str, dialect: TimeDialect) -> Option<Parsed> {
    if let Some(fields) = parse_fields(text, dialect) {
        return Some(Parsed::Fields(fields));
    }
    if is_simple_form(text) {
        return Some(Parsed::Simple);
    }
    None
}

fn parse_fields(text: &str, dialect: TimeDialect) -> Option<TimeFields> {
    let mut cur = Cursor::new(text);
    match dialect {
        TimeDialect::Absolute => {
            let year = cur.digits(4)?;
            cur.expect('-')?;
            let day = cur.digits(3)?;
            cur.expect('T')?;
            let (hour, minute, second, micros) = cur.clock()?;
            cur.end()?;
            Some(TimeFields {
                sign: None,
                year: Some(year),
                day: Some(day),
                hour,
                minute,
                second,
                micros,
            })
        }
        TimeDialect::Relative | TimeDialect::Epoch => {
            let sign = if dialect == TimeDialect::Epoch { cur.sign() } else { None };
            let day = cur.day_prefix();
            let (hour, minute, second, micros) = cur.clock()?;
            cur.end()?;
            Some(TimeFields { sign, year: None, day, hour, minute, second, micros })
        }
    }
}

/// `[+|-]digits[.digits]` with nothing else
fn is_simple_form(text: &str) -> bool {
    let rest = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (whole, frac) = match rest.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (rest, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(whole) && frac.map_or(true, all_digits)
}

/// Render balanced fields back into dialect text. Sub-second precision is
/// truncated to whole milliseconds and omitted when zero; the day field is
/// omitted for durations when it is zero.
pub(crate) fn format(fields: &TimeFields, dialect: TimeDialect) -> String {
    let mut out = String::new();
    if let Some(sign) = fields.sign {
        out.push(sign);
    }
    if dialect == TimeDialect::Absolute {
        out.push_str(&format!(
            "{:04}-{:03}T",
            fields.year.unwrap_or(0),
            fields.day.unwrap_or(1)
        ));
    } else if let Some(day) = fields.day.filter(|d| *d > 0) {
        out.push_str(&format!("{day:03}T"));
    }
    out.push_str(&format!(
        "{:02}:{:02}:{:02}",
        fields.hour, fields.minute, fields.second
    ));
    let millis = fields.micros / 1_000;
    if millis > 0 {
        out.push_str(&format!(".{millis:03}"));
    }
    out
}

// ── Cursor ───────────────────────────────────────────────────────────

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(text: &str) -> Self {
        Self { chars: text.chars().collect(), pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Exactly `n` ASCII digits
    fn digits(&mut self, n: usize) -> Option<i64> {
        let mut value: i64 = 0;
        for offset in 0..n {
            let c = self.chars.get(self.pos + offset)?;
            let digit = c.to_digit(10)? as i64;
            value = value * 10 + digit;
        }
        self.pos += n;
        Some(value)
    }

    fn expect(&mut self, c: char) -> Option<()> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Some(())
        } else {
            None
        }
    }

    fn sign(&mut self) -> Option<char> {
        match self.peek() {
            Some(c @ ('+' | '-')) => {
                self.pos += 1;
                Some(c)
            }
            _ => None,
        }
    }

    /// Optional `DDDT` day prefix; leaves the cursor untouched when absent
    fn day_prefix(&mut self) -> Option<i64> {
        let mark = self.pos;
        if let Some(day) = self.digits(3) {
            if self.expect('T').is_some() {
                return Some(day);
            }
        }
        self.pos = mark;
        None
    }

    /// `hh:mm:ss` with an optional 1 to 6 digit fraction, as microseconds
    fn clock(&mut self) -> Option<(i64, i64, i64, i64)> {
        let hour = self.digits(2)?;
        self.expect(':')?;
        let minute = self.digits(2)?;
        self.expect(':')?;
        let second = self.digits(2)?;
        let micros = if self.expect('.').is_some() { self.fraction()? } else { 0 };
        Some((hour, minute, second, micros))
    }

    fn fraction(&mut self) -> Option<i64> {
        let mut count = 0;
        let mut value: i64 = 0;
        while let Some(digit) = self.peek().and_then(|c| c.to_digit(10)) {
            count += 1;
            if count > 6 {
                return None;
            }
            value = value * 10 + digit as i64;
            self.pos += 1;
        }
        if count == 0 {
            return None;
        }
        // Scale to microseconds: ".5" is 500000, ".123456" is 123456
        Some(value * 10i64.pow(6 - count))
    }

    fn end(&self) -> Option<()> {
        if self.pos == self.chars.len() {
            Some(())
        } else {
            None
        }
    }
}
