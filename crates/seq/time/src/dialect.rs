//! The three time-tag dialects

use serde::{Deserialize, Serialize};

/// Which grammar a time literal is held against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeDialect {
    /// Day-of-year timestamp, `YYYY-DDDThh:mm:ss[.fff]`
    Absolute,
    /// Unsigned duration, `[DDDT]hh:mm:ss[.fff]`
    Relative,
    /// Signed offset from an epoch, `[+|-][DDDT]hh:mm:ss[.fff]`
    Epoch,
}

impl std::fmt::Display for TimeDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TimeDialect::Absolute => "absolute",
            TimeDialect::Relative => "relative",
            TimeDialect::Epoch => "epoch",
        };
        write!(f, "{s}")
    }
}
