//! Time tag engine for sequence dialects
//!
//! Sequences express execution times in three textual dialects:
//!
//! - **Absolute**: `YYYY-DDDThh:mm:ss[.fff]`, a day-of-year timestamp
//! - **Relative**: `[DDDT]hh:mm:ss[.fff]`, a duration from the previous step
//! - **Epoch**: `[+|-][DDDT]hh:mm:ss[.fff]`, a signed offset from an epoch
//!
//! Each dialect also accepts a companion "simple" numeric-seconds form
//! (`[+|-]digits[.digits]`), which is passed through untouched.
//!
//! The engine answers four questions: is a literal well formed
//! ([`is_valid`]), are all of its fields inside their natural ranges
//! ([`is_balanced`]), what does it look like with carries and borrows
//! applied ([`balance`]), and does it overflow the dialect's maximum range
//! ([`is_max`]). Every entry point is pure and total: malformed input comes
//! back as a structured result, never a panic.

#![deny(unsafe_code)]

mod balance;
mod dialect;
mod fields;

pub use balance::{balance, is_balanced, is_max, is_valid, BalanceResult};
pub use dialect::TimeDialect;
